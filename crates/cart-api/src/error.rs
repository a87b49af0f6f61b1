//! # API Errors
//!
//! Every failing handler returns an [`ApiError`]. Turning it into a
//! response only records an [`ErrorReport`] on the response; the
//! [`render_errors`] layer then writes the JSON body, because only it can
//! see whether the app runs in production:
//!
//! ```json
//! { "success": false, "error": "Route not found: GET /nope", "stack": "..." }
//! ```
//!
//! `stack` is omitted in production.

use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::error::Error as _;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Route not found: {method} {path}")]
    NotFound { method: String, path: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An error carrying its own status; `None` means 500
    #[error("{message}")]
    Status {
        status: Option<u16>,
        message: String,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status: Some(status),
            message: message.into(),
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::BadRequest(_) => 400,
            Self::Status { status, .. } => status
                .filter(|code| StatusCode::from_u16(*code).is_ok())
                .unwrap_or(500),
            Self::Internal(_) => 500,
        }
    }

    /// The error followed by each of its causes, one per line
    fn chain(&self) -> String {
        let mut lines = vec![format!("{self:?}")];
        let mut source = self.source();
        while let Some(cause) = source {
            lines.push(format!("caused by: {cause}"));
            source = cause.source();
        }
        lines.join("\n")
    }
}

/// What went wrong, attached to the response for [`render_errors`]
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub message: String,
    pub stack: String,
}

impl From<&ApiError> for ErrorReport {
    fn from(err: &ApiError) -> Self {
        Self {
            status: StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: err.to_string(),
            stack: err.chain(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = ErrorReport::from(&self);

        if report.status.is_server_error() {
            error!(status = report.status.as_u16(), error = %report.message, "Request failed");
        } else {
            warn!(status = report.status.as_u16(), error = %report.message, "Request rejected");
        }

        let mut response = report.status.into_response();
        response.extensions_mut().insert(report);
        response
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// Response layer writing the JSON body for any [`ErrorReport`]
pub async fn render_errors(State(state): State<AppState>, mut response: Response) -> Response {
    let Some(report) = response.extensions_mut().remove::<ErrorReport>() else {
        return response;
    };

    let body = ErrorResponse {
        success: false,
        error: report.message,
        stack: state.expose_error_details().then_some(report.stack),
    };
    (report.status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let not_found = ApiError::NotFound {
            method: "GET".to_string(),
            path: "/x".to_string(),
        };
        assert_eq!(not_found.status_code(), 404);
        assert_eq!(ApiError::BadRequest("x".into()).status_code(), 400);
        assert_eq!(ApiError::with_status(418, "teapot").status_code(), 418);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status_code(),
            500
        );
    }

    #[test]
    fn test_status_defaults_to_500() {
        let missing = ApiError::Status {
            status: None,
            message: "no status".to_string(),
        };
        assert_eq!(missing.status_code(), 500);
        assert_eq!(ApiError::with_status(42, "bogus").status_code(), 500);
    }

    #[test]
    fn test_chain_lists_causes() {
        let err = ApiError::Internal(
            anyhow::anyhow!("disk full").context("write failed"),
        );
        let report = ErrorReport::from(&err);

        assert_eq!(report.message, "write failed");
        assert!(report.stack.contains("caused by: disk full"));
    }
}
