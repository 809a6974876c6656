use std::time::{Duration, Instant, SystemTime};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::state::AppState;

const STORE_PING_TIMEOUT: Duration = Duration::from_secs(2);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/live", get(live))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
    backend: &'static str,
    latency_ms: Option<u64>,
    timestamp: String,
    start_time: String,
    uptime: u64,
}

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

enum StoreCheck {
    Connected { latency_ms: u64 },
    Timeout,
    Disconnected,
}

async fn root(State(state): State<AppState>) -> Response {
    let (store, latency_ms) = match store_check(&state).await {
        StoreCheck::Connected { latency_ms } => ("connected", Some(latency_ms)),
        StoreCheck::Timeout => ("timeout", None),
        StoreCheck::Disconnected => ("disconnected", None),
    };
    let ok = latency_ms.is_some();

    let response = HealthResponse {
        status: if ok { "ok" } else { "degraded" },
        store,
        backend: state.store_backend(),
        latency_ms,
        timestamp: now_iso(),
        start_time: system_time_iso(state.started_at_system()),
        uptime: state.uptime_seconds(),
    };

    let status_code = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    let response = LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    };
    Json(response).into_response()
}

async fn store_check(state: &AppState) -> StoreCheck {
    let start = Instant::now();
    match tokio::time::timeout(STORE_PING_TIMEOUT, state.manager().store().ping()).await {
        Ok(Ok(())) => StoreCheck::Connected {
            latency_ms: start.elapsed().as_millis() as u64,
        },
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "store health check failed");
            StoreCheck::Disconnected
        }
        Err(_) => StoreCheck::Timeout,
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn system_time_iso(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Millis, true)
}
