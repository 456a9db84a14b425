//! # Error Types
//!
//! Domain-specific error types for cotiza-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cotiza-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cotiza-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  API errors (apps/api)                                                 │
//! │  └── ApiError         - What the frontend sees (JSON envelope)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Frontend     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A quote cannot be turned into a sales note in its current status.
    ///
    /// ## When This Occurs
    /// - The quote was annulled or rejected
    /// - The quote already produced a sales note
    #[error("Cotización {numero} está {estado}, no se puede generar nota de venta")]
    QuoteNotConvertible { numero: String, estado: String },

    /// The quote already produced a sales note that is still in force.
    #[error("Cotización {numero} ya tiene la nota de venta {nota}")]
    QuoteAlreadyConverted { numero: String, nota: String },

    /// The document can no longer be edited in its current status.
    #[error("{documento} está {estado} y no se puede modificar")]
    DocumentLocked { documento: String, estado: String },

    /// A status change that the document lifecycle does not allow.
    #[error("No se puede cambiar {documento} de {from} a {to}")]
    InvalidTransition {
        documento: String,
        from: String,
        to: String,
    },

    /// Stock adjustment would leave a product below zero.
    #[error("Stock insuficiente para {codigo}: disponible {available}, requerido {requested}")]
    InsufficientStock {
        codigo: String,
        available: f64,
        requested: f64,
    },

    /// The document has no line items.
    #[error("El documento debe tener al menos un ítem")]
    EmptyDocument,

    /// Too many line items on one document.
    #[error("El documento no puede tener más de {max} ítems")]
    TooManyItems { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Messages are shown inline next to form fields, so they are written for
/// end users (Spanish).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} es obligatorio")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} debe tener al menos {min} caracteres")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} debe tener como máximo {max} caracteres")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} debe estar entre {min} y {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} debe ser mayor que cero")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid RUT, invalid UUID).
    #[error("{field} tiene un formato inválido: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} debe ser uno de: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Password rejected by the password policy.
    #[error("Contraseña inválida: {reason}")]
    WeakPassword { reason: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::InvalidFormat`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
