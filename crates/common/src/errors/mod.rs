//! Error types for folio services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidKind,
    InvalidFormat,
    EmptyContent,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidCredential,
    ExpiredToken,

    // Resource errors (4xxx)
    DocumentNotFound,
    EmbeddingNotFound,

    // Conflict errors (5xxx)
    DimensionMismatch,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    EmbeddingProviderError,
    SearchUnavailable,
    CacheError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidKind => 1002,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::EmptyContent => 1004,

            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidCredential => 2002,
            ErrorCode::ExpiredToken => 2003,

            ErrorCode::DocumentNotFound => 4001,
            ErrorCode::EmbeddingNotFound => 4002,

            ErrorCode::DimensionMismatch => 5001,

            ErrorCode::RateLimited => 6001,

            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            ErrorCode::EmbeddingProviderError => 8001,
            ErrorCode::SearchUnavailable => 8002,
            ErrorCode::CacheError => 8003,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Unsupported content kind: {kind}")]
    InvalidKind { kind: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Nothing to embed for {kind} {id}")]
    EmptyContent { kind: String, id: i64 },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Token expired")]
    ExpiredToken,

    // Resource errors
    #[error("Document not found: {kind} {id}")]
    DocumentNotFound { kind: String, id: i64 },

    #[error("No embedding stored for {kind} {id}")]
    EmbeddingNotFound { kind: String, id: i64 },

    // Conflict errors
    #[error(
        "Embedding has {actual} dimensions, expected {expected}; run POST /embeddings/sync to rebuild it"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    // Rate limiting
    #[error("Rate limit exceeded")]
    RateLimited,

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("Embedding provider error: {message}")]
    EmbeddingProvider { message: String },

    #[error("Search unavailable: {message}")]
    SearchUnavailable { message: String },

    #[error("Cache error: {message}")]
    CacheError { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidKind { .. } => ErrorCode::InvalidKind,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::EmptyContent { .. } => ErrorCode::EmptyContent,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidCredential => ErrorCode::InvalidCredential,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::EmbeddingNotFound { .. } => ErrorCode::EmbeddingNotFound,
            AppError::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            AppError::RateLimited => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::EmbeddingProvider { .. } => ErrorCode::EmbeddingProviderError,
            AppError::SearchUnavailable { .. } => ErrorCode::SearchUnavailable,
            AppError::CacheError { .. } => ErrorCode::CacheError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::InvalidKind { .. }
            | AppError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. } | AppError::InvalidCredential | AppError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }

            // 404 Not Found
            AppError::DocumentNotFound { .. } | AppError::EmbeddingNotFound { .. } => {
                StatusCode::NOT_FOUND
            }

            // 409 Conflict
            AppError::DimensionMismatch { .. } => StatusCode::CONFLICT,

            // 422 Unprocessable Entity
            AppError::EmptyContent { .. } => StatusCode::UNPROCESSABLE_ENTITY,

            // 429 Too Many Requests
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::EmbeddingProvider { .. }
            | AppError::SearchUnavailable { .. }
            | AppError::CacheError { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message safe to return to callers; server errors never leak internals
    pub fn public_message(&self) -> String {
        match self {
            AppError::SearchUnavailable { .. } => {
                "Search is temporarily unavailable".to_string()
            }
            _ if self.is_server_error() => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %self,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message: self.public_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::CacheError {
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation {
            message: rejection.body_text(),
            field: None,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|f| f.to_string());
        AppError::Validation {
            message: err.to_string(),
            field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::DocumentNotFound {
            kind: "posts".into(),
            id: 7,
        };
        assert_eq!(err.code(), ErrorCode::DocumentNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "limit out of range".into(),
            field: Some("limit".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_dimension_conflict_points_to_sync() {
        let err = AppError::DimensionMismatch {
            expected: 1536,
            actual: 384,
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.public_message().contains("/embeddings/sync"));
    }

    #[test]
    fn test_server_error_message_is_generic() {
        let err = AppError::Internal {
            message: "connection reset by peer at 10.0.0.3".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_search_unavailable_is_500() {
        let err = AppError::SearchUnavailable {
            message: "provider timed out".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.public_message().contains("timed out"));
    }
}
