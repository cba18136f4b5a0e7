use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::AnalysisError;

/// Error returned by every handler, rendered as the JSON error envelope
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "InvalidRequest", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal", message)
    }
}

pub fn status_from_error(err: &AnalysisError) -> StatusCode {
    match err {
        AnalysisError::InvalidSymbol(_) => StatusCode::BAD_REQUEST,
        AnalysisError::NotAuthenticated => StatusCode::UNAUTHORIZED,
        AnalysisError::NoMarketData { .. } => StatusCode::NOT_FOUND,
        AnalysisError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        Self::new(status_from_error(&err), err.kind(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{} ({}): {}", self.status, self.kind, self.message);
        }

        let body = json!({
            "success": false,
            "error": {
                "kind": self.kind,
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}
