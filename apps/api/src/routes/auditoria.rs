//! Audit log browsing (admin only, read only).

use std::sync::Arc;

use axum::extract::State;
use serde::Deserialize;

use cotiza_core::{AccionAuditoria, ListFilter, RegistroAuditoria};
use cotiza_db::AuditoriaFilter;

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::extract::Query;
use crate::response::ApiResponse;
use crate::AppState;

/// `GET /api/auditoria` query string. `search` matches the detail text and the
/// user name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditoriaQuery {
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub entidad: Option<String>,
    pub entidad_id: Option<String>,
    pub usuario_id: Option<String>,
    pub accion: Option<AccionAuditoria>,
}

impl From<AuditoriaQuery> for AuditoriaFilter {
    fn from(q: AuditoriaQuery) -> Self {
        AuditoriaFilter {
            base: ListFilter {
                search: q.search,
                estado: None,
                limit: q.limit,
                offset: q.offset,
            },
            entidad: q.entidad,
            entidad_id: q.entidad_id,
            usuario_id: q.usuario_id,
            accion: q.accion,
        }
    }
}

/// Newest entries first.
pub async fn list(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(query): Query<AuditoriaQuery>,
) -> ApiResult<ApiResponse<Vec<RegistroAuditoria>>> {
    let registros = state.db.auditoria().list(&query.into()).await?;
    Ok(ApiResponse::list(registros))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use cotiza_core::Rol;
    use cotiza_db::NuevoRegistro;
    use serde_json::json;

    #[tokio::test]
    async fn test_filters() {
        let state = test_support::state().await;
        let admin = test_support::usuario(&state, "admin@cotiza.cl", Rol::Admin).await;
        let auditoria = state.db.auditoria();

        auditoria
            .record(
                &NuevoRegistro::new(AccionAuditoria::Crear, "cliente")
                    .usuario(Some(admin.id.clone()))
                    .entidad_id("c-1")
                    .detalle(json!({ "rut": "76086428-5" })),
            )
            .await
            .unwrap();
        auditoria
            .record(&NuevoRegistro::new(AccionAuditoria::Eliminar, "cliente").entidad_id("c-1"))
            .await
            .unwrap();
        auditoria
            .record(&NuevoRegistro::new(AccionAuditoria::Crear, "producto").entidad_id("p-1"))
            .await
            .unwrap();

        let gate = AdminUser(admin.clone());

        let response = list(State(state.clone()), gate.clone(), Query(AuditoriaQuery::default()))
            .await
            .unwrap();
        assert_eq!(response.count, Some(3));

        let response = list(
            State(state.clone()),
            gate.clone(),
            Query(AuditoriaQuery {
                entidad: Some("cliente".to_string()),
                accion: Some(AccionAuditoria::Crear),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        let data = response.data.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].usuario_nombre.as_deref(), Some(admin.nombre.as_str()));

        let response = list(
            State(state),
            gate,
            Query(AuditoriaQuery {
                usuario_id: Some(admin.id),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.count, Some(1));
    }
}
