use crate::error::DriftError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub DriftError);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(DriftError::Validation(msg.into()))
    }
}

impl From<DriftError> for AppError {
    fn from(error: DriftError) -> Self {
        Self(error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DriftError::Validation(_) => StatusCode::BAD_REQUEST,
            DriftError::NotFound(_) => StatusCode::NOT_FOUND,
            DriftError::Config(_)
            | DriftError::PlanFailed { .. }
            | DriftError::CommandFailed(_)
            | DriftError::Timeout { .. }
            | DriftError::Io(_)
            | DriftError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        } else {
            tracing::warn!("request rejected: {}", self.0);
        }

        let body = match &self.0 {
            DriftError::PlanFailed { details, output } => json!({
                "success": false,
                "error": "Error running terraform plan",
                "details": details,
                "output": output,
            }),
            other => json!({ "success": false, "error": other.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}
