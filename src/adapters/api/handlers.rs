//! Control endpoint handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use super::AppState;
use crate::application::report::{HistoricalReport, StrategyStatus};
use crate::application::runner::{ControlError, InitError};
use crate::strategy::hedge_ratio::HedgeRatio;

/// Bars returned by `/api/historical` when no window is given
pub const DEFAULT_HISTORY_WINDOW: usize = 252;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Init(#[from] InitError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error("No data available")]
    NoData,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Init(InitError::AlreadyRunning) => StatusCode::CONFLICT,
            ApiError::Init(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Control(_) => StatusCode::BAD_REQUEST,
            ApiError::NoData => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = Json(json!({
            "status": "error",
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hedge_ratio: Option<HedgeRatio>,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
            hedge_ratio: None,
        }
    }
}

pub async fn initialize(State(state): State<AppState>) -> Result<Json<ActionResponse>, ApiError> {
    let fit = state.runner.initialize().await?;
    Ok(Json(ActionResponse {
        hedge_ratio: Some(fit),
        ..ActionResponse::success("Strategy initialized successfully")
    }))
}

pub async fn start(State(state): State<AppState>) -> Result<Json<ActionResponse>, ApiError> {
    state.runner.start().await?;
    Ok(Json(ActionResponse::success("Strategy started")))
}

pub async fn stop(State(state): State<AppState>) -> Json<ActionResponse> {
    state.runner.stop().await;
    info!("Stop requested via API");
    Json(ActionResponse::success("Strategy stopped"))
}

pub async fn status(State(state): State<AppState>) -> Json<StrategyStatus> {
    Json(state.runner.status().await)
}

#[derive(Debug, Deserialize)]
pub struct HistoricalQuery {
    pub window: Option<usize>,
}

pub async fn historical(
    State(state): State<AppState>,
    Query(query): Query<HistoricalQuery>,
) -> Result<Json<HistoricalReport>, ApiError> {
    let window = query.window.unwrap_or(DEFAULT_HISTORY_WINDOW);
    let report = state
        .runner
        .historical(window)
        .await
        .map_err(|_| ApiError::NoData)?;
    Ok(Json(report))
}

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "service": "spread-arb",
    }))
}
