//! Project (obra) endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;

use cotiza_core::{AccionAuditoria, ActualizarObra, ListFilter, NuevaObra, Obra};
use cotiza_db::{NuevoRegistro, ObraFilter};

use super::audit;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::response::ApiResponse;
use crate::AppState;

const ENTIDAD: &str = "obra";

/// `GET /api/obras` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObrasQuery {
    pub search: Option<String>,
    pub estado: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub cliente_id: Option<String>,
}

impl From<ObrasQuery> for ObraFilter {
    fn from(q: ObrasQuery) -> Self {
        ObraFilter {
            base: ListFilter {
                search: q.search,
                estado: q.estado,
                limit: q.limit,
                offset: q.offset,
            },
            cliente_id: q.cliente_id.filter(|id| !id.is_empty()),
        }
    }
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ObrasQuery>,
) -> ApiResult<ApiResponse<Vec<Obra>>> {
    let obras = state.db.obras().list(&query.into()).await?;
    Ok(ApiResponse::list(obras))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Obra>> {
    let obra = state
        .db
        .obras()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Obra", &id))?;
    Ok(ApiResponse::ok(obra))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Json(form): Json<NuevaObra>,
) -> ApiResult<(StatusCode, ApiResponse<Obra>)> {
    let obra = state.db.obras().create(&form).await?;

    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(AccionAuditoria::Crear, ENTIDAD)
            .entidad_id(&obra.id)
            .detalle(json!({ "nombre": obra.nombre, "cliente_id": obra.cliente_id })),
    )
    .await;

    Ok((StatusCode::CREATED, ApiResponse::ok(obra).with_message("Obra creada")))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Path(id): Path<String>,
    Json(form): Json<ActualizarObra>,
) -> ApiResult<ApiResponse<Obra>> {
    let obra = state.db.obras().update(&id, &form).await?;

    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(AccionAuditoria::Actualizar, ENTIDAD)
            .entidad_id(&id)
            .detalle(serde_json::to_value(&form).unwrap_or_default()),
    )
    .await;

    Ok(ApiResponse::ok(obra).with_message("Obra actualizada"))
}

/// `DELETE /api/obras/{id}`: soft delete (`estado = cancelada`).
pub async fn remove(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Obra>> {
    let obra = state.db.obras().cancel(&id).await?;

    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(AccionAuditoria::Eliminar, ENTIDAD).entidad_id(&id),
    )
    .await;

    Ok(ApiResponse::ok(obra).with_message("Obra cancelada"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use chrono::NaiveDate;
    use cotiza_core::ObraEstado;

    fn nueva(cliente_id: &str, nombre: &str) -> Json<NuevaObra> {
        Json(NuevaObra {
            cliente_id: cliente_id.to_string(),
            nombre: nombre.to_string(),
            comuna: Some("Concepción".to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_create_and_filter_by_client() {
        let state = test_support::state().await;
        let usuario = test_support::auth(&state).await;
        let andes = test_support::cliente(&state, "76.086.428-5").await;
        let soto = test_support::cliente(&state, "12.345.678-5").await;

        let (code, response) = create(State(state.clone()), usuario.clone(), nueva(&andes.id, "Edificio Mirador"))
            .await
            .unwrap();
        assert_eq!(code, StatusCode::CREATED);
        let obra = response.data.unwrap();
        assert_eq!(obra.cliente_nombre.as_deref(), Some("Constructora Andes SpA"));
        assert_eq!(obra.estado, ObraEstado::Planificacion);

        create(State(state.clone()), usuario.clone(), nueva(&soto.id, "Bodega Norte"))
            .await
            .unwrap();

        let response = list(
            State(state.clone()),
            Query(ObrasQuery {
                cliente_id: Some(andes.id.clone()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.count, Some(1));
        assert_eq!(response.data.unwrap()[0].nombre, "Edificio Mirador");

        // An empty cliente_id is ignored
        let response = list(
            State(state),
            Query(ObrasQuery {
                cliente_id: Some(String::new()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.count, Some(2));
    }

    #[tokio::test]
    async fn test_unknown_client_and_bad_dates() {
        let state = test_support::state().await;
        let usuario = test_support::auth(&state).await;
        let err = create(State(state.clone()), usuario.clone(), nueva("nope", "Huérfana"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let cliente = test_support::cliente(&state, "76.086.428-5").await;
        let err = create(
            State(state),
            usuario.clone(),
            Json(NuevaObra {
                fecha_inicio: NaiveDate::from_ymd_opt(2026, 10, 1),
                fecha_termino: NaiveDate::from_ymd_opt(2026, 9, 1),
                ..nueva(&cliente.id, "Fechas invertidas").0
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_and_cancel() {
        let state = test_support::state().await;
        let usuario = test_support::auth(&state).await;
        let cliente = test_support::cliente(&state, "76.086.428-5").await;
        let (_, response) = create(State(state.clone()), usuario.clone(), nueva(&cliente.id, "Loteo"))
            .await
            .unwrap();
        let obra = response.data.unwrap();

        let response = update(
            State(state.clone()),
            usuario.clone(),
            Path(obra.id.clone()),
            Json(ActualizarObra {
                estado: Some(ObraEstado::EnCurso),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.data.unwrap().estado, ObraEstado::EnCurso);

        remove(State(state.clone()), usuario.clone(), Path(obra.id.clone()))
            .await
            .unwrap();
        let response = detail(State(state), Path(obra.id)).await.unwrap();
        assert_eq!(response.data.unwrap().estado, ObraEstado::Cancelada);
    }
}
