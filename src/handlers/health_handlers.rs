//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the metadata index and disk I/O

use crate::services::object_store::ObjectStore;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Liveness probe. Never performs I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Runs `SELECT 1` against the metadata index.
/// 2. Writes, reads back and removes a probe file under the content root.
///
/// HTTP 200 when both checks pass, 503 otherwise.
pub async fn readyz(State(store): State<ObjectStore>) -> impl IntoResponse {
    let index_check = match store.index().ping().await {
        Ok(()) => (true, None::<String>),
        Err(e) => (false, Some(format!("error: {}", e))),
    };

    let probe = store
        .content()
        .root()
        .join(format!(".readyz-{}", Uuid::new_v4()));
    let disk_check = match fs::write(&probe, b"readyz").await {
        Ok(()) => {
            let read_back = fs::read(&probe).await;
            let removed = fs::remove_file(&probe).await;
            match (read_back, removed) {
                (Ok(bytes), Ok(())) if bytes == b"readyz" => (true, None),
                (Ok(bytes), Err(e)) if bytes == b"readyz" => {
                    (true, Some(format!("could not remove probe file: {}", e)))
                }
                (Ok(_), _) => (false, Some("probe file content mismatch".to_string())),
                (Err(e), _) => (false, Some(format!("could not read probe file: {}", e))),
            }
        }
        Err(e) => (false, Some(format!("could not write probe file: {}", e))),
    };

    let overall_ok = index_check.0 && disk_check.0;

    let mut checks = HashMap::new();
    checks.insert(
        "index",
        CheckStatus {
            ok: index_check.0,
            error: index_check.1,
        },
    );
    checks.insert(
        "disk",
        CheckStatus {
            ok: disk_check.0,
            error: disk_check.1,
        },
    );

    let status_text = if overall_ok { "ok" } else { "error" };
    let body = ReadyResponse {
        status: status_text.into(),
        checks,
    };
    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
