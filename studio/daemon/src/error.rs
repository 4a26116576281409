//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use studio_core::StudioError;
use tracing::{error, warn};

/// A failed generation request
///
/// `summary` names the operation that failed; the underlying error becomes
/// the `details` field.
#[derive(Debug, thiserror::Error)]
#[error("{summary}: {source}")]
pub struct ApiError {
    summary: &'static str,
    #[source]
    source: StudioError,
}

impl ApiError {
    /// Wrap a pipeline error with the operation that failed
    pub fn new(summary: &'static str, source: StudioError) -> Self {
        Self { summary, source }
    }

    /// HTTP status for this error
    #[must_use]
    pub fn status(&self) -> StatusCode {
        if self.source.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.source, "{}", self.summary);
        } else {
            warn!(error = %self.source, "{}", self.summary);
        }

        let body = Json(json!({
            "error": self.summary,
            "details": self.source.to_string(),
        }));

        (status, body).into_response()
    }
}
