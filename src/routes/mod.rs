pub mod calendar;
pub mod index;
pub mod robots;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(index::router())
        .merge(calendar::router())
        .merge(robots::router())
        .with_state(state)
}

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Convert anyhow errors to HTTP responses.
///
/// Only for failures of our own (e.g. template rendering); upstream trouble
/// is rendered as an error calendar instead.
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "Request failed");
        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
