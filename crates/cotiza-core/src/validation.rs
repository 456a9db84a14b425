//! # Validation Module
//!
//! Input validation utilities for Cotiza.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend forms                                               │
//! │  └── password_issues() drives the inline checklist                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: axum handler (Json<T> deserialization)                       │
//! │  └── THIS MODULE: RUT, email, password policy, ranges                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE (rut, email, codigo, numero)                               │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cotiza_core::validation::{normalize_rut, validate_password};
//!
//! assert_eq!(normalize_rut("12.345.678-5").unwrap(), "12345678-5");
//! assert!(validate_password("Hormigon2026").is_ok());
//! assert!(validate_password("Password1").is_err()); // common password
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Password Policy
// =============================================================================

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Passwords rejected regardless of the other rules (compared lowercase).
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "passw0rd",
    "12345678",
    "123456789",
    "1234567890",
    "qwerty123",
    "qwertyuiop",
    "abc12345",
    "abcd1234",
    "admin123",
    "administrador1",
    "contraseña1",
    "contrasena1",
    "welcome1",
    "letmein1",
    "iloveyou1",
    "chile2024",
    "chile2025",
    "chile2026",
    "cotiza123",
];

/// Returns every password rule the candidate fails, as user-facing messages.
///
/// An empty vector means the password is acceptable. The frontend shows
/// these next to the field while the user types.
pub fn password_issues(password: &str) -> Vec<String> {
    let mut issues = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LEN {
        issues.push(format!(
            "debe tener al menos {} caracteres",
            MIN_PASSWORD_LEN
        ));
    }
    if !password.chars().any(char::is_uppercase) {
        issues.push("debe incluir al menos una letra mayúscula".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        issues.push("debe incluir al menos un número".to_string());
    }
    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        issues.push("es una contraseña demasiado común".to_string());
    }

    issues
}

/// Validates a password against the policy.
///
/// ## Rules
/// - At least 8 characters
/// - At least one uppercase letter
/// - At least one digit
/// - Not in the common-password list (case-insensitive)
///
/// The error carries the first failing rule.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    match password_issues(password).into_iter().next() {
        None => Ok(()),
        Some(reason) => Err(ValidationError::WeakPassword { reason }),
    }
}

// =============================================================================
// RUT (Rol Único Tributario)
// =============================================================================

/// Computes the modulo-11 check digit for a RUT body.
///
/// Digits are weighted 2,3,4,5,6,7,2,3,... from the right; the check digit is
/// `11 - (sum mod 11)`, written `K` for 10 and `0` for 11.
///
/// ## Example
/// ```rust
/// use cotiza_core::validation::rut_check_digit;
///
/// assert_eq!(rut_check_digit(12_345_678), '5');
/// assert_eq!(rut_check_digit(10_000_013), 'K');
/// assert_eq!(rut_check_digit(10_000_004), '0');
/// ```
pub fn rut_check_digit(body: u32) -> char {
    let mut sum = 0u32;
    let mut weight = 2u32;
    let mut rest = body;

    loop {
        sum += (rest % 10) * weight;
        rest /= 10;
        weight = if weight == 7 { 2 } else { weight + 1 };
        if rest == 0 {
            break;
        }
    }

    match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        d => char::from_digit(d, 10).unwrap_or('0'),
    }
}

/// Splits and checks a RUT, accepting `12.345.678-5`, `12345678-5` or
/// `123456785`. Returns the numeric body and the (uppercase) check digit.
fn parse_rut(rut: &str) -> ValidationResult<(u32, char)> {
    let cleaned: String = rut
        .trim()
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | ' '))
        .collect::<String>()
        .to_uppercase();

    if cleaned.is_empty() {
        return Err(ValidationError::required("rut"));
    }
    if cleaned.len() < 2 || cleaned.len() > 10 {
        return Err(ValidationError::invalid("rut", "largo inválido"));
    }

    let (body, dv) = cleaned.split_at(cleaned.len() - 1);
    let dv = dv.chars().next().unwrap_or(' ');
    if !body.chars().all(|c| c.is_ascii_digit()) || !(dv.is_ascii_digit() || dv == 'K') {
        return Err(ValidationError::invalid("rut", "solo dígitos y K"));
    }
    let body: u32 = body
        .parse()
        .map_err(|_| ValidationError::invalid("rut", "número fuera de rango"))?;
    if body == 0 {
        return Err(ValidationError::invalid("rut", "número fuera de rango"));
    }

    if rut_check_digit(body) != dv {
        return Err(ValidationError::invalid("rut", "dígito verificador incorrecto"));
    }

    Ok((body, dv))
}

/// Validates a RUT (format and check digit).
pub fn validate_rut(rut: &str) -> ValidationResult<()> {
    parse_rut(rut).map(|_| ())
}

/// Validates a RUT and returns its storage form: `12345678-5`.
pub fn normalize_rut(rut: &str) -> ValidationResult<String> {
    let (body, dv) = parse_rut(rut)?;
    Ok(format!("{}-{}", body, dv))
}

/// Validates a RUT and returns its display form: `12.345.678-5`.
pub fn format_rut(rut: &str) -> ValidationResult<String> {
    let (body, dv) = parse_rut(rut)?;
    Ok(format!("{}-{}", crate::format::group_thousands(body as u64), dv))
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates that a field is present (not empty after trimming).
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

/// Validates a maximum length in characters.
pub fn validate_max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates an email address.
///
/// ## Rules
/// - Exactly one `@` with a non-empty local part
/// - Domain contains a dot that is not at either end
/// - No whitespace, at most 254 characters
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }
    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let invalid = || ValidationError::invalid("email", "no es un correo válido");
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }
    Ok(())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line-item quantity: finite and greater than zero.
pub fn validate_quantity(cantidad: f64) -> ValidationResult<()> {
    if !cantidad.is_finite() || cantidad <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "cantidad".to_string(),
        });
    }
    Ok(())
}

/// Validates a unit price (zero allowed for courtesy items).
pub fn validate_price(field: &str, precio: Money) -> ValidationResult<()> {
    if precio.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a quote discount percentage (0 to 100).
pub fn validate_discount_percentage(pct: f64) -> ValidationResult<()> {
    if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
        return Err(ValidationError::OutOfRange {
            field: "descuento_porcentaje".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

// =============================================================================
// ID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use cotiza_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }

    uuid::Uuid::parse_str(id.trim())
        .map_err(|_| ValidationError::invalid("id", "debe ser un UUID válido"))?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
