//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the backend and the staging dir

use crate::handlers::fs_handlers::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Never performs I/O.
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
/// 1. Lists the owner's buckets through the gateway.
/// 2. Performs a write/read/delete in the directory writers stage into.
///
/// HTTP 200 when all checks pass, HTTP 503 when any check fails.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let (ctx, _guard) = state.request_context();
    let backend_check = match state.gateway.probe(&ctx).await {
        Ok(_) => (true, None::<String>),
        Err(e) => (false, Some(format!("error: {}", e))),
    };

    let staging_dir = state
        .gateway
        .settings()
        .staging_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir);
    let tmp_path = staging_dir.join(format!(".readyz-{}", Uuid::new_v4()));
    let staging_check = match fs::write(&tmp_path, b"readyz").await {
        Ok(_) => {
            let read = fs::read(&tmp_path).await;
            let removed = fs::remove_file(&tmp_path).await;
            staging_outcome(read, removed)
        }
        Err(e) => (false, Some(format!("could not write tmp file: {}", e))),
    };

    let overall_ok = backend_check.0 && staging_check.0;

    let mut checks = HashMap::new();
    checks.insert(
        "backend",
        CheckStatus {
            ok: backend_check.0,
            error: backend_check.1,
        },
    );
    checks.insert(
        "staging",
        CheckStatus {
            ok: staging_check.0,
            error: staging_check.1,
        },
    );

    let body = ReadyResponse {
        status: if overall_ok { "ok" } else { "error" }.into(),
        checks,
    };
    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// Judge the staging round trip. A failed cleanup is reported but does not
/// fail the check.
fn staging_outcome(
    read: std::io::Result<Vec<u8>>,
    removed: std::io::Result<()>,
) -> (bool, Option<String>) {
    match (read, removed) {
        (Ok(bytes), _) if bytes != b"readyz" => (false, Some("file content mismatch".to_string())),
        (Err(e), _) => (false, Some(format!("could not read tmp file: {}", e))),
        (Ok(_), Err(e)) => (true, Some(format!("could not remove tmp file: {}", e))),
        (Ok(_), Ok(())) => (true, None),
    }
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
