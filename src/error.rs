//! Application error type and the uniform `{error:{code,message,details?}}` envelope.

use actix_web::{
    HttpResponse, ResponseError,
    http::{StatusCode, header},
};
use serde::Serialize;
use serde_json::Value;

/// Error body carried inside the `error` envelope
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// An error returned by an API handler
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    #[error("{message}")]
    Unauthorized { code: &'static str, message: String },

    #[error("{message}")]
    Forbidden { code: &'static str, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("rate limit exceeded, retry after {retry_after}s")]
    RateLimited {
        code: &'static str,
        retry_after: u64,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn unauthenticated() -> Self {
        Self::Unauthorized {
            code: "UNAUTHENTICATED",
            message: "Authentication required".to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            code: "FORBIDDEN",
            message: message.into(),
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self::RateLimited {
            code: "RATE_LIMITED",
            retry_after,
        }
    }

    /// Stable machine-readable code for the envelope
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::BadRequest { code, .. }
            | ApiError::Unauthorized { code, .. }
            | ApiError::Forbidden { code, .. }
            | ApiError::RateLimited { code, .. } => *code,
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Configuration(_) => "CONFIGURATION_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Upstream(_) => "AI_UPSTREAM_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Build the envelope body. Server-side failures never expose their detail.
    pub fn body(&self) -> ErrorBody {
        let (message, details) = match self {
            ApiError::Validation { message, details } => (message.clone(), details.clone()),
            ApiError::RateLimited { code, retry_after } => (
                match *code {
                    "AI_DAILY_LIMIT_EXCEEDED" => "Daily AI request limit reached".to_string(),
                    _ => "Too many requests. Please try again later.".to_string(),
                },
                Some(serde_json::json!({ "retry_after": retry_after })),
            ),
            ApiError::Configuration(_) => ("Service is not configured".to_string(), None),
            ApiError::Database(_) => ("A database error occurred".to_string(), None),
            ApiError::Upstream(_) => ("The AI service is temporarily unavailable".to_string(), None),
            ApiError::Internal(_) => ("An unexpected error occurred".to_string(), None),
            other => (other.to_string(), None),
        };

        ErrorBody {
            code: self.code(),
            message,
            details,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Configuration(_)
            | ApiError::Database(_)
            | ApiError::Upstream(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        }

        let mut builder = HttpResponse::build(status);
        if let ApiError::RateLimited { retry_after, .. } = self {
            builder.insert_header((header::RETRY_AFTER, retry_after.to_string()));
        }
        builder.json(serde_json::json!({ "error": self.body() }))
    }
}

/// Convert JSON body extraction failures into validation envelopes
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    ApiError::Validation {
        message: "Invalid request body".to_string(),
        details: Some(serde_json::json!({ "reason": err.to_string() })),
    }
    .into()
}

/// Convert query string extraction failures into validation envelopes
pub fn query_error_handler(
    err: actix_web::error::QueryPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    ApiError::Validation {
        message: "Invalid query parameters".to_string(),
        details: Some(serde_json::json!({ "reason": err.to_string() })),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_rate_limited_response_has_retry_after() {
        let resp = ApiError::rate_limited(42).error_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers().get(header::RETRY_AFTER).unwrap(), "42");

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "RATE_LIMITED");
        assert_eq!(json["error"]["details"]["retry_after"], 42);
    }

    #[actix_web::test]
    async fn test_server_errors_hide_detail() {
        let resp = ApiError::Database("relation kb_entries does not exist".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "DATABASE_ERROR");
        assert!(!json["error"]["message"].as_str().unwrap().contains("kb_entries"));
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthenticated().status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden("no").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("Entry").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::not_found("Entry").to_string(), "Entry not found");
    }
}
