use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::lease::KeyStatus;
use crate::response::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(generate).delete(delete))
        .route("/available", get(acquire))
        .route("/:key", get(status))
        .route("/:key/unblock", patch(unblock))
        .route("/:key/keep_alive", post(keep_alive))
}

#[derive(Debug, Serialize)]
struct GeneratedResponse {
    message: &'static str,
    key: String,
}

#[derive(Debug, Serialize)]
struct KeyResponse {
    key: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    key: String,
    status: KeyStatus,
}

#[derive(Debug, Deserialize)]
pub(super) struct DeleteQuery {
    key: Option<String>,
}

async fn generate(State(state): State<AppState>) -> Result<Json<GeneratedResponse>, AppError> {
    let key = state.manager().generate().await?;
    tracing::debug!(key = %key, "key generated");
    Ok(Json(GeneratedResponse {
        message: "successfully generated new key",
        key,
    }))
}

async fn acquire(State(state): State<AppState>) -> Result<Json<KeyResponse>, AppError> {
    match state.manager().acquire().await? {
        Some(key) => Ok(Json(KeyResponse { key })),
        None => Err(AppError::not_found("No available keys")),
    }
}

async fn unblock(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if state.manager().release(&key).await? {
        Ok(Json(MessageResponse {
            message: "Key unblocked",
        }))
    } else {
        Err(AppError::not_found("Key not found"))
    }
}

async fn delete(
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    let key = query.key.unwrap_or_default();
    if state.manager().delete(&key).await? {
        Ok(Json(MessageResponse {
            message: "Key deleted",
        }))
    } else {
        Err(AppError::not_found("Key not found"))
    }
}

async fn keep_alive(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if state.manager().renew(&key).await? {
        Ok(Json(MessageResponse {
            message: "Key kept alive",
        }))
    } else {
        Err(AppError::not_found("Key not found"))
    }
}

async fn status(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    match state.manager().status(&key).await? {
        KeyStatus::Unknown => Err(AppError::not_found("Key not found")),
        status => Ok(Json(StatusResponse { key, status })),
    }
}
