//! # Request Extractors
//!
//! Drop-in replacements for axum's `Json`, `Query` and `Path` whose
//! rejections are [`ApiError`]s, so a malformed body, query string or path
//! segment still answers with the JSON envelope:
//!
//! ```text
//! GET /api/clientes?limit=abc
//!   400 { "success": false, "code": "VALIDATION_ERROR",
//!         "error": "Failed to deserialize query string: limit: ..." }
//! ```

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

/// JSON request body.
#[derive(Debug, Clone, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

/// Query string.
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

/// Path parameters.
#[derive(Debug, Clone, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::header::CONTENT_TYPE;
    use axum::http::{Request, StatusCode};
    use axum::response::{IntoResponse, Response};
    use cotiza_core::{ListFilter, NuevoCliente};
    use serde_json::Value;

    use crate::routes::dashboard::PointQuery;

    async fn envelope(err: ApiError) -> (StatusCode, Value) {
        let response: Response = err.into_response();
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("application/json"), "{}", content_type);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn query<T>(uri: &str) -> Result<Query<T>, ApiError>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        Query::<T>::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_bad_query_string_uses_envelope() {
        let err = query::<ListFilter>("/api/clientes?limit=abc")
            .await
            .unwrap_err();
        let (status, body) = envelope(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["error"].as_str().unwrap().contains("limit"));

        let Query(filter) = query::<ListFilter>("/api/clientes?limit=5&search=andes")
            .await
            .unwrap();
        assert_eq!(filter.limit, Some(5));
        assert_eq!(filter.search.as_deref(), Some("andes"));
    }

    #[tokio::test]
    async fn test_missing_query_field_uses_envelope() {
        let err = query::<PointQuery>("/api/dashboard/chart/point?y=10")
            .await
            .unwrap_err();
        let (status, body) = envelope(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_malformed_json_uses_envelope() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/clientes")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{x:"))
            .unwrap();
        let err = Json::<NuevoCliente>::from_request(request, &()).await.unwrap_err();
        let (status, body) = envelope(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body.get("data").is_none());

        // Missing content type is refused the same way
        let request = Request::builder()
            .method("POST")
            .uri("/api/clientes")
            .body(Body::from(r#"{"rut":"12.345.678-5","nombre_razon_social":"Juan"}"#))
            .unwrap();
        let err = Json::<NuevoCliente>::from_request(request, &()).await.unwrap_err();
        let (_, body) = envelope(err).await;
        assert_eq!(body["success"], false);
    }
}
