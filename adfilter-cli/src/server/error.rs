//! JSON error responses for the proxy.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hls_adfilter::AdFilterError;
use serde::Serialize;

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

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "BAD_GATEWAY", message)
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

impl From<AdFilterError> for ApiError {
    fn from(err: AdFilterError) -> Self {
        if err.is_upstream() {
            return ApiError::bad_gateway(err.to_string());
        }
        match &err {
            AdFilterError::InvalidUrl { .. } => ApiError::bad_request(err.to_string()),
            AdFilterError::Network { .. }
            | AdFilterError::HttpStatus { .. }
            | AdFilterError::InvalidContent { .. }
            | AdFilterError::Playlist { .. } => ApiError::bad_gateway(err.to_string()),
            AdFilterError::Configuration { .. } => {
                tracing::error!("Proxy misconfigured: {}", err);
                ApiError::internal("Proxy is misconfigured")
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_errors_map_to_bad_gateway() {
        let err: ApiError =
            AdFilterError::http_status(StatusCode::NOT_FOUND, "https://cdn.example.com/a.m3u8").into();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);

        let err: ApiError = AdFilterError::invalid_url("nope", "relative URL without a base").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "BAD_REQUEST");
    }
}
