//! # Response Envelope
//!
//! Every JSON response has the same shape:
//!
//! ```json
//! { "success": true,  "data": [ ... ], "count": 3 }
//! { "success": true,  "data": { ... }, "message": "Cliente creado" }
//! { "success": false, "error": "rut es obligatorio", "code": "VALIDATION_ERROR" }
//! ```
//!
//! `count` is only set by [`ApiResponse::list`] and always equals the number
//! of rows in `data`.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::ErrorCode;

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            count: None,
            error: None,
            code: None,
            message: None,
        }
    }

    /// Success without a body, e.g. logout.
    pub fn empty() -> Self {
        ApiResponse {
            success: true,
            data: None,
            count: None,
            error: None,
            code: None,
            message: None,
        }
    }

    pub fn failure(code: ErrorCode, error: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            count: None,
            error: Some(error.into()),
            code: Some(code),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(data: Vec<T>) -> Self {
        let count = data.len();
        ApiResponse {
            count: Some(count),
            ..ApiResponse::ok(data)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
