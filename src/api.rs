//! # HTTP API Layer
//! Three surfaces: the authenticated scheduler trigger, the two public read
//! endpoints, and `/health`. Public responses carry the CDN caching contract
//! (one hour, ten minutes stale-while-revalidate). Store failures surface as
//! a stable JSON error envelope with HTTP 500.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Extension, Path},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::pipeline::{daily, RunStatus};
use crate::scoreboard;
use crate::sources::Sources;
use crate::store::Store;

const CACHE_CONTROL_VALUE: &str = "public, s-maxage=3600, stale-while-revalidate=600";

/// Shared handler state, injected via `Extension`.
pub struct ApiState {
    pub store: Store,
    pub sources: Sources,
    pub cron_secret: String,
}

/// Build the application router.
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/cron/daily", get(cron_daily))
        .route("/api/public/stress", get(get_scoreboard))
        .route("/api/public/stress/:code/history", get(get_history))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}

fn error_envelope(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn cached_json<T: serde::Serialize>(payload: &T) -> Response {
    (
        [(header::CACHE_CONTROL, CACHE_CONTROL_VALUE)],
        Json(payload),
    )
        .into_response()
}

/// Scheduler trigger. Authorization is a static bearer secret compared in
/// constant time; localhost callers are exempt for developer convenience.
async fn cron_daily(
    Extension(state): Extension<Arc<ApiState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Response {
    if !is_authorized(&headers, peer.map(|p| p.0), &state.cron_secret) {
        return error_envelope(StatusCode::UNAUTHORIZED, "unauthorized");
    }

    match daily::run_daily(&state.store, &state.sources, Utc::now()).await {
        Ok(outcome) => {
            let status = if outcome.skipped {
                StatusCode::OK
            } else {
                match outcome.status {
                    RunStatus::Success => StatusCode::OK,
                    RunStatus::Partial => StatusCode::MULTI_STATUS,
                    RunStatus::Error => StatusCode::INTERNAL_SERVER_ERROR,
                }
            };
            (status, Json(outcome)).into_response()
        }
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "daily run failed fatally");
            error_envelope(StatusCode::INTERNAL_SERVER_ERROR, "run failed")
        }
    }
}

async fn get_scoreboard(Extension(state): Extension<Arc<ApiState>>) -> Response {
    match scoreboard::current_scoreboard(&state.store).await {
        Ok(entries) => cached_json(&entries),
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "scoreboard read failed");
            error_envelope(StatusCode::INTERNAL_SERVER_ERROR, "store read failed")
        }
    }
}

async fn get_history(
    Extension(state): Extension<Arc<ApiState>>,
    Path(code): Path<String>,
) -> Response {
    let code = code.to_ascii_uppercase();
    let country = match state.store.find_country_by_iso2(&code).await {
        Ok(Some(c)) => c,
        Ok(None) => return error_envelope(StatusCode::NOT_FOUND, "unknown country code"),
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "country lookup failed");
            return error_envelope(StatusCode::INTERNAL_SERVER_ERROR, "store read failed");
        }
    };

    match scoreboard::country_history(&state.store, &country).await {
        Ok(points) => cached_json(&points),
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), iso2 = %code, "history read failed");
            error_envelope(StatusCode::INTERNAL_SERVER_ERROR, "store read failed")
        }
    }
}

fn is_authorized(headers: &HeaderMap, peer: Option<SocketAddr>, secret: &str) -> bool {
    if peer.map(|p| p.ip().is_loopback()).unwrap_or(false) {
        return true;
    }
    let Some(presented) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return false;
    };
    constant_time_eq(presented.as_bytes(), secret.as_bytes())
}

/// Length check first, then a full XOR fold so the comparison time does not
/// leak how long a matching prefix was.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
