use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unique error codes for client identification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database errors (1xxx)
    DatabaseConnection = 1001,
    DatabaseQuery = 1002,

    // Document errors (2xxx)
    DocumentFetch = 2001,
    DocumentParse = 2002,
    DocumentEmpty = 2003,
    Chunking = 2004,

    // Rate limiting errors (4xxx)
    RateLimitExceeded = 4001,

    // External service errors (5xxx)
    EmbeddingServiceUnavailable = 5001,
    EmbeddingServiceTimeout = 5002,
    EmbeddingServiceError = 5003,
    ModelError = 5004,

    // Internal errors (9xxx)
    InternalError = 9001,
    ConfigurationError = 9002,
}

impl ErrorCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

/// Service error types with context
#[derive(Error, Debug)]
pub enum AppError {
    // Database errors
    #[error("Database connection error: {0}")]
    DatabaseConnectionError(String),

    #[error("Database query error: {0}")]
    DatabaseQueryError(#[from] sqlx::Error),

    // Document errors
    #[error("Document fetch failed: {0}")]
    DocumentFetchError(String),

    #[error("Failed to parse document: {0}")]
    DocumentParseError(String),

    #[error("No extractable text in document: {0}")]
    DocumentEmpty(String),

    #[error("Chunking failed: {0}")]
    ChunkingError(String),

    // Rate limiting
    #[error("Rate limit exceeded. Retry after {retry_after_secs} seconds")]
    RateLimitExceeded { retry_after_secs: u64 },

    // External service errors
    #[error("Embedding service unavailable: {0}")]
    EmbeddingServiceUnavailable(String),

    #[error("Embedding service timeout after {timeout_secs}s")]
    EmbeddingServiceTimeout { timeout_secs: u64 },

    #[error("Embedding service error: {0}")]
    EmbeddingError(String),

    #[error("Model error: {0}")]
    ModelError(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl AppError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::DatabaseConnectionError(_) => ErrorCode::DatabaseConnection,
            Self::DatabaseQueryError(_) => ErrorCode::DatabaseQuery,
            Self::DocumentFetchError(_) => ErrorCode::DocumentFetch,
            Self::DocumentParseError(_) => ErrorCode::DocumentParse,
            Self::DocumentEmpty(_) => ErrorCode::DocumentEmpty,
            Self::ChunkingError(_) => ErrorCode::Chunking,
            Self::RateLimitExceeded { .. } => ErrorCode::RateLimitExceeded,
            Self::EmbeddingServiceUnavailable(_) => ErrorCode::EmbeddingServiceUnavailable,
            Self::EmbeddingServiceTimeout { .. } => ErrorCode::EmbeddingServiceTimeout,
            Self::EmbeddingError(_) => ErrorCode::EmbeddingServiceError,
            Self::ModelError(_) => ErrorCode::ModelError,
            Self::InternalError(_) => ErrorCode::InternalError,
            Self::ConfigError(_) => ErrorCode::ConfigurationError,
            Self::InvalidConfiguration(_) => ErrorCode::ConfigurationError,
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseConnectionError(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::DatabaseQueryError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DocumentFetchError(_) => StatusCode::BAD_GATEWAY,
            Self::DocumentParseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DocumentEmpty(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ChunkingError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::EmbeddingServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::EmbeddingServiceTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::EmbeddingError(_) => StatusCode::BAD_GATEWAY,
            Self::ModelError(_) => StatusCode::BAD_GATEWAY,
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        // Log based on severity
        match &self {
            AppError::RateLimitExceeded { .. } => {
                tracing::info!(error_code = error_code.as_u16(), %message, "Rate limited");
            }
            AppError::DocumentFetchError(_)
            | AppError::EmbeddingServiceTimeout { .. }
            | AppError::EmbeddingServiceUnavailable(_) => {
                tracing::warn!(error_code = error_code.as_u16(), %message, "Upstream error");
            }
            _ => {
                tracing::error!(error_code = error_code.as_u16(), %message, error = ?self, "Server error");
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code.as_u16(),
                "status": status.as_u16(),
                "message": message,
                "details": if cfg!(debug_assertions) {
                    Some(format!("{:?}", self))
                } else {
                    None
                }
            }
        }));

        // Add Retry-After header for rate limiting
        let mut response = (status, body).into_response();
        if let AppError::RateLimitExceeded { retry_after_secs } = &self {
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}
