//! API error handling — consistent JSON error responses for the HTTP layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use hls_gateway_core::GatewayError;

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn request_timeout(message: impl Into<String>) -> Self {
        Self::new(StatusCode::REQUEST_TIMEOUT, "UPSTREAM_TIMEOUT", message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", message)
    }

    /// Forwards an upstream status code verbatim; falls back to 502 if the
    /// upstream somehow returned something outside the valid HTTP range.
    pub fn upstream_status(status: u16, message: impl Into<String>) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
        Self::new(status, "UPSTREAM_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorResponse {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidUrl { .. } => ApiError::bad_request(err.to_string()),
            GatewayError::Cancelled => ApiError::new(StatusCode::BAD_REQUEST, "CANCELLED", err.to_string()),
            GatewayError::Timeout { .. } => ApiError::request_timeout("request timeout"),
            GatewayError::UpstreamStatus { status, .. } => {
                ApiError::upstream_status(status, "upstream error")
            }
            GatewayError::Network(_) => ApiError::bad_gateway(err.to_string()),
            GatewayError::InvalidManifestEncoding(_) => ApiError::bad_gateway(err.to_string()),
            GatewayError::Extraction { .. } => ApiError::internal(err.to_string()),
            GatewayError::NoStreamsFound { .. } => ApiError::internal(err.to_string()),
            GatewayError::Internal(_) => {
                tracing::error!(error = %err, "internal error");
                ApiError::internal("an unexpected error occurred")
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_upstream_status_verbatim() {
        let not_found: ApiError = GatewayError::upstream_status(404, "https://x/y").into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);

        let forbidden: ApiError = GatewayError::upstream_status(403, "https://x/y").into();
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

        let server_error: ApiError = GatewayError::upstream_status(503, "https://x/y").into();
        assert_eq!(server_error.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn maps_timeout_to_request_timeout_408() {
        let err: ApiError = GatewayError::Timeout { attempts: 3 }.into();
        assert_eq!(err.status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(err.message, "request timeout");
    }

    #[test]
    fn maps_no_streams_found_to_extraction_failed_500() {
        let err: ApiError = GatewayError::NoStreamsFound { url: "https://x/y".into() }.into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn maps_internal_to_500_without_leaking_detail() {
        let err: ApiError = GatewayError::Internal("leaky detail".into()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "an unexpected error occurred");
    }
}
