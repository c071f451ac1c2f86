mod routes;

pub use routes::create_router;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use recap_core::{
    BotService, CalendarSource, ChatSource, CodeSource, RecapError, SummaryPipeline, TrackerSource,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared application state: every client handle is constructed once at
/// startup and injected here, so handlers never reach for globals and tests
/// can substitute fakes.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<dyn ChatSource>,
    pub code: Arc<dyn CodeSource>,
    pub tracker: Arc<dyn TrackerSource>,
    pub calendar: Arc<dyn CalendarSource>,
    pub pipeline: Arc<SummaryPipeline>,
    pub bot: Arc<BotService>,
    pub services: BTreeMap<&'static str, &'static str>,
    pub missing_required: Vec<&'static str>,
    pub start_time: std::time::Instant,
}

/// JSON response wrapper
#[derive(Serialize)]
pub struct JsonResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> JsonResponse<()> {
        JsonResponse {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Custom error type for HTTP handlers
pub struct AppError(RecapError);

impl AppError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            RecapError::Validation(_) => StatusCode::BAD_REQUEST,
            RecapError::Unconfigured { .. } => StatusCode::BAD_REQUEST,
            // Pass the platform's own 4xx/5xx through; anything else is a
            // bad gateway from our point of view.
            RecapError::SourceApi { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            RecapError::SourceUnavailable { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(JsonResponse::<()>::err(self.0.to_string())),
        )
            .into_response()
    }
}

impl From<RecapError> for AppError {
    fn from(err: RecapError) -> Self {
        Self(err)
    }
}

pub type AppResult<T> = Result<T, AppError>;
