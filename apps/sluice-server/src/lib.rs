//! HTTP binding for the control surface.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use sluice_api::{AddTokenRequest, ApiError, ControlApi, ErrorCode};

#[derive(Clone)]
struct AppState {
    api: Arc<dyn ControlApi>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

fn error_response(error: ApiError) -> Response {
    let status = match error.code() {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorBody {
        code: error.code().as_str().to_string(),
        message: error.to_string(),
    };
    (status, Json(body)).into_response()
}

async fn add_token(
    State(state): State<AppState>,
    Json(request): Json<AddTokenRequest>,
) -> Response {
    match state.api.add_token(request).await {
        Ok(response) => Json(response).into_response(),
        Err(error) => error_response(error),
    }
}

async fn marking(State(state): State<AppState>) -> Response {
    match state.api.marking().await {
        Ok(response) => Json(response).into_response(),
        Err(error) => error_response(error),
    }
}

async fn trigger(State(state): State<AppState>, Path(transition_id): Path<String>) -> Response {
    match state.api.trigger_manual(&transition_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub fn router(api: Arc<dyn ControlApi>) -> Router {
    Router::new()
        .route("/add_token", post(add_token))
        .route("/marking", get(marking))
        .route("/transitions/{transition_id}/trigger", post(trigger))
        .with_state(AppState { api })
}

/// Serve the control surface until `cancel` fires.
pub async fn serve(
    addr: SocketAddr,
    api: Arc<dyn ControlApi>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http control surface listening");
    axum::serve(listener, router(api))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}
