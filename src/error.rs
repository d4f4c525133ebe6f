use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Rejected startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("rate limit must allow at least one request per window")]
    ZeroRateLimit,

    #[error("rate limit window must be longer than zero")]
    ZeroRateWindow,

    #[error("health check interval must be longer than zero")]
    ZeroHealthInterval,

    #[error("at least one upstream is required")]
    NoUpstreams,

    #[error("unknown log format {0:?} (expected \"text\" or \"json\")")]
    UnknownLogFormat(String),
}

/// Errors returned to gateway clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Client is over its request budget for the current window.
    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("request body too large")]
    PayloadTooLarge,

    /// Request body could not be read, e.g. the client went away mid-upload.
    #[error("{0}")]
    BadRequest(String),

    /// Upstream could not be reached or returned an unreadable response.
    #[error("upstream error: {0}")]
    BadGateway(String),

    #[error("no healthy upstream available")]
    NoHealthyUpstream,

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    // machine-readable kind, e.g. "rate_limit_exceeded"
    pub error: &'static str,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::NoHealthyUpstream => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            ApiError::PayloadTooLarge => "payload_too_large",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::BadGateway(_) => "bad_gateway",
            ApiError::NoHealthyUpstream => "service_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let retry_after_seconds = match &self {
            ApiError::RateLimitExceeded { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let detail = match &self {
            ApiError::Internal(msg) => {
                // keep the real cause in the logs only
                tracing::error!(%msg, "internal gateway error");
                "internal server error".to_string()
            }
            ApiError::BadGateway(msg) => {
                tracing::warn!(%msg, "upstream request failed");
                "upstream request failed".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: self.code(),
            detail,
            retry_after_seconds,
        };

        let mut response = (self.status(), axum::Json(body)).into_response();
        if let Some(secs) = retry_after_seconds {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
