//! Health check endpoint.
//!
//! A database that answers but refuses the probe (missing table, access
//! denied) still counts as connected; only an unreachable database gives 503.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use cotiza_db::HealthReport;

use crate::response::ApiResponse;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// `ok`, `degraded` (schema not ready) or `unavailable`
    pub status: &'static str,
    pub version: &'static str,
    pub database: HealthReport,
}

/// `GET /api/health`
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, ApiResponse<HealthStatus>) {
    let database = state.db.health_check().await;

    let (status, code) = match (database.connected, database.schema_ready) {
        (true, true) => ("ok", StatusCode::OK),
        (true, false) => ("degraded", StatusCode::OK),
        (false, _) => ("unavailable", StatusCode::SERVICE_UNAVAILABLE),
    };

    (
        code,
        ApiResponse::ok(HealthStatus {
            status,
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn test_health_ok() {
        let state = test_support::state().await;
        let (code, response) = health(State(state)).await;

        assert_eq!(code, StatusCode::OK);
        let data = response.data.unwrap();
        assert_eq!(data.status, "ok");
        assert!(data.database.connected);
        assert!(data.database.schema_ready);
    }

    #[tokio::test]
    async fn test_health_missing_schema_is_degraded() {
        let state = test_support::state().await;
        sqlx::query("DROP TABLE clientes")
            .execute(state.db.pool())
            .await
            .unwrap();

        let (code, response) = health(State(state)).await;
        assert_eq!(code, StatusCode::OK);
        let data = response.data.unwrap();
        assert_eq!(data.status, "degraded");
        assert!(data.database.connected);
        assert!(!data.database.schema_ready);
    }
}
