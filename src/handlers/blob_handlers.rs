//! HTTP handlers for blob operations.
//! Streams request and response bodies and delegates storage concerns to
//! `ObjectStore`.

use crate::{
    errors::AppError,
    handlers::auth::StoreId,
    models::object::{CopyOptions, HeadBlobResult, ListResult, Object, PutBlobResult, PutOptions},
    services::{error::StoreError, object_store::ObjectStore},
};
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::io;
use tokio_util::io::ReaderStream;
use tracing::debug;

const DOCS_URL: &str = "https://vercel.com/docs/storage/vercel-blob";

const ADD_RANDOM_SUFFIX: &str = "x-add-random-suffix";
const CONTENT_TYPE_OVERRIDE: &str = "x-content-type";
const CACHE_CONTROL_MAX_AGE: &str = "x-cache-control-max-age";

#[derive(Debug, Deserialize)]
pub struct PutQuery {
    #[serde(rename = "fromUrl")]
    pub from_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiGetQuery {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub download: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteBody {
    pub urls: Vec<String>,
}

/// PUT `/api/{*pathname}`: upload, or copy when `?fromUrl=` is present.
pub async fn put_blob(
    State(store): State<ObjectStore>,
    StoreId(store_id): StoreId,
    Path(pathname): Path<String>,
    Query(q): Query<PutQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<PutBlobResult>, AppError> {
    let options = PutOptions {
        content_type: Some(requested_content_type(&headers)),
        add_random_suffix: header_str(&headers, ADD_RANDOM_SUFFIX) == Some("1"),
        cache_control_max_age: header_str(&headers, CACHE_CONTROL_MAX_AGE).map(str::to_string),
        pathname,
    };

    let object = match q.from_url.filter(|u| !u.is_empty()) {
        Some(from_url) => copy_blob(&store, &store_id, &from_url, options).await?,
        None => {
            let stream = body
                .into_data_stream()
                .map(|chunk| chunk.map_err(io::Error::other));
            store.put(&store_id, options, stream).await?
        }
    };

    Ok(Json(PutBlobResult::from(&object)))
}

async fn copy_blob(
    store: &ObjectStore,
    store_id: &str,
    from_url: &str,
    options: PutOptions,
) -> Result<Object, AppError> {
    let options = CopyOptions {
        destination_pathname: options.pathname,
        add_random_suffix: options.add_random_suffix,
        content_type: options.content_type,
        cache_control_max_age: options.cache_control_max_age,
    };

    store
        .copy(store_id, from_url, options)
        .await
        .map_err(|err| match err {
            StoreError::NotFound(_) | StoreError::BadInput(_) => {
                debug!("copy from {} failed: {}", from_url, err);
                AppError::not_found("From blob doesn't exist")
            }
            other => other.into(),
        })
}

/// GET `/api/`: head when `?url=` is given, list otherwise.
pub async fn get_blobs(
    State(store): State<ObjectStore>,
    StoreId(store_id): StoreId,
    Query(q): Query<ApiGetQuery>,
) -> Result<Response, AppError> {
    match q.url.filter(|u| !u.is_empty()) {
        Some(url) => {
            let object = store.get(&url).await?;
            Ok(Json(HeadBlobResult::from(&object)).into_response())
        }
        None => {
            let objects = store.list(&store_id).await?;
            Ok(Json(ListResult::from_objects(&objects)).into_response())
        }
    }
}

/// POST `/api/delete`: best-effort delete of `{"urls": [...]}`.
pub async fn delete_blobs(
    State(store): State<ObjectStore>,
    StoreId(_): StoreId,
    payload: Result<Json<DeleteBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = payload.map_err(|err| {
        debug!("rejected delete body: {}", err);
        AppError::bad_request("Wrong body")
    })?;

    for outcome in store.del(&body.urls).await {
        debug!("delete {}: {:?}", outcome.url, outcome.status);
    }

    Ok(Json(json!({})))
}

/// GET `/public/{*rest}`: stream blob content.
pub async fn download_blob(
    State(store): State<ObjectStore>,
    Path(rest): Path<String>,
    Query(q): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let url = format!("{}{}", store.address().public_root(), rest);
    let object = store.get(&url).await?;
    let file = store.content().get(&object.file_path).await?;
    let length = file
        .metadata()
        .await
        .map_err(StoreError::from)?
        .len();

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    set_blob_headers(
        response.headers_mut(),
        &object,
        length,
        q.download.as_deref() == Some("1"),
    );

    Ok(response)
}

/// GET `/`: point browsers at the product docs.
pub async fn root_redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, DOCS_URL)])
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// `x-content-type`, else the media type of `content-type`. Empty when
/// neither is usable, leaving the guess to the store.
fn requested_content_type(headers: &HeaderMap) -> String {
    header_str(headers, CONTENT_TYPE_OVERRIDE)
        .filter(|v| !v.trim().is_empty())
        .or_else(|| header_str(headers, header::CONTENT_TYPE.as_str()))
        .map(media_type)
        .unwrap_or_default()
}

fn media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn set_blob_headers(headers: &mut HeaderMap, object: &Object, length: u64, as_attachment: bool) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&object.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));

    if let Ok(value) = HeaderValue::from_str(&object.cache_control) {
        headers.insert(header::CACHE_CONTROL, value);
    }

    let last_modified = object
        .uploaded_at
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    if let Ok(value) = HeaderValue::from_str(&last_modified) {
        headers.insert(header::LAST_MODIFIED, value);
    }

    let disposition = content_disposition(&object.content_disposition, as_attachment);
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
}

fn content_disposition(stored: &str, as_attachment: bool) -> String {
    let disposition = if stored.is_empty() { "inline" } else { stored };
    if as_attachment {
        disposition.replacen("inline", "attachment", 1)
    } else {
        disposition.to_string()
    }
}
