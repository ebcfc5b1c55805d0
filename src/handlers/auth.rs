//! Store extraction from the bearer token.
//!
//! Tokens look like `vercel_blob_rw_<store>_<secret>`; the store id is the
//! fourth `_`-separated segment. The token is not verified.

use crate::errors::AppError;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

/// Store id of the calling tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreId(pub String);

impl<S> FromRequestParts<S> for StoreId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::unauthorized("Authorization header is required"))?;

        value
            .to_str()
            .ok()
            .and_then(store_id_from_token)
            .map(StoreId)
            .ok_or_else(|| AppError::unauthorized("Malformed Authorization header"))
    }
}

fn store_id_from_token(value: &str) -> Option<String> {
    let token = value.trim().trim_start_matches("Bearer ").trim();
    let store = token.split('_').nth(3)?;
    (!store.is_empty()).then(|| store.to_string())
}
