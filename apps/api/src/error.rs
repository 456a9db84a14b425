//! # API Error Type
//!
//! Unified error type for the REST handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Cotiza                                 │
//! │                                                                         │
//! │  ValidationError ──► CoreError ──► DbError ──► ApiError ──► Response   │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler: Result<T, ApiError>                                    │  │
//! │  │         │                                                        │  │
//! │  │  Validation?        ─── 400 VALIDATION_ERROR                     │  │
//! │  │  Missing row?       ─── 404 NOT_FOUND                            │  │
//! │  │  No session?        ─── 401 UNAUTHORIZED                         │  │
//! │  │  Not admin?         ─── 403 FORBIDDEN                            │  │
//! │  │  Duplicate?         ─── 409 CONFLICT                             │  │
//! │  │  Status rule?       ─── 409 BUSINESS_RULE / INSUFFICIENT_STOCK   │  │
//! │  │  Database / PDF?    ─── 500 (logged with error!)                 │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "success": false, "error": "Cliente not found: 42",                 │
//! │    "code": "NOT_FOUND" }                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use cotiza_core::{CoreError, ValidationError};
use cotiza_db::DbError;

use crate::pdf::PdfError;
use crate::response::ApiResponse;

/// API error returned from handlers.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Missing, invalid or idle session (401)
    Unauthorized,

    /// Authenticated but not allowed (403)
    Forbidden,

    /// Unique constraint (409)
    Conflict,

    /// Document status forbids the operation (409)
    BusinessRule,

    /// Stock would go below zero (409)
    InsufficientStock,

    /// Database operation failed (500)
    DatabaseError,

    /// PDF rasterization failed (500)
    RenderError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::Conflict | ErrorCode::BusinessRule | ErrorCode::InsufficientStock => {
                StatusCode::CONFLICT
            }
            ErrorCode::DatabaseError | ErrorCode::RenderError | ErrorCode::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

/// Converts database errors to API errors.
///
/// Unlike the client-facing codes, database failures keep the underlying
/// message so the operator sees it in the UI.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' ya existe", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::validation("Referencia inválida")
            }
            DbError::Core(e) => ApiError::from(e),
            other => {
                tracing::error!("Database error: {}", other);
                ApiError::new(ErrorCode::DatabaseError, other.to_string())
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, message)
            }
            CoreError::QuoteNotConvertible { .. }
            | CoreError::QuoteAlreadyConverted { .. }
            | CoreError::DocumentLocked { .. }
            | CoreError::InvalidTransition { .. } => ApiError::new(ErrorCode::BusinessRule, message),
            CoreError::EmptyDocument | CoreError::TooManyItems { .. } | CoreError::Validation(_) => {
                ApiError::validation(message)
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<PdfError> for ApiError {
    fn from(err: PdfError) -> Self {
        tracing::error!("PDF rendering failed: {}", err);
        ApiError::new(ErrorCode::RenderError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Renders the envelope with `success: false`.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, ApiResponse::<()>::failure(self.code, self.message)).into_response()
    }
}

/// Handler result alias.
pub type ApiResult<T> = Result<T, ApiError>;
