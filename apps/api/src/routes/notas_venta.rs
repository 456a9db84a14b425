//! Sales note endpoints.
//!
//! Notes are only ever generated from a quote. Status changes move stock:
//! entering `confirmada`/`despachada` takes it, leaving them (annulment)
//! gives it back.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use cotiza_core::{
    AccionAuditoria, ActualizarNotaVenta, ListFilter, NotaVenta, NotaVentaDetalle, NuevaNotaVenta,
};
use cotiza_db::{NotaVentaFilter, NuevoRegistro};

use super::audit;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::response::ApiResponse;
use crate::AppState;

const ENTIDAD: &str = "nota_venta";

/// `GET /api/notas-venta` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotasQuery {
    pub search: Option<String>,
    pub estado: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub cliente_id: Option<String>,
    pub cotizacion_id: Option<String>,
    pub desde: Option<NaiveDate>,
    pub hasta: Option<NaiveDate>,
}

impl From<NotasQuery> for NotaVentaFilter {
    fn from(q: NotasQuery) -> Self {
        NotaVentaFilter {
            base: ListFilter {
                search: q.search,
                estado: q.estado,
                limit: q.limit,
                offset: q.offset,
            },
            cliente_id: q.cliente_id,
            cotizacion_id: q.cotizacion_id,
            desde: q.desde,
            hasta: q.hasta,
        }
    }
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotasQuery>,
) -> ApiResult<ApiResponse<Vec<NotaVenta>>> {
    let notas = state.db.notas_venta().list(&query.into()).await?;
    Ok(ApiResponse::list(notas))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<NotaVentaDetalle>> {
    let detalle = state
        .db
        .notas_venta()
        .get_detalle(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Nota de venta", &id))?;
    Ok(ApiResponse::ok(detalle))
}

/// `POST /api/notas-venta` with `{ "cotizacion_id": "..." }`.
pub async fn create(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Json(form): Json<NuevaNotaVenta>,
) -> ApiResult<(StatusCode, ApiResponse<NotaVentaDetalle>)> {
    let detalle = state.db.notas_venta().create_from_quote(&form).await?;
    let nota = &detalle.nota;

    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(AccionAuditoria::Crear, ENTIDAD)
            .entidad_id(&nota.id)
            .detalle(json!({
                "numero": nota.numero_formateado(),
                "cotizacion_id": nota.cotizacion_id,
                "total": nota.total,
            })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(detalle).with_message("Nota de venta generada"),
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Path(id): Path<String>,
    Json(form): Json<ActualizarNotaVenta>,
) -> ApiResult<ApiResponse<NotaVentaDetalle>> {
    let detalle = state.db.notas_venta().update(&id, &form).await?;

    let accion = match form.estado {
        Some(_) => AccionAuditoria::CambiarEstado,
        None => AccionAuditoria::Actualizar,
    };
    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(accion, ENTIDAD)
            .entidad_id(&id)
            .detalle(serde_json::to_value(&form).unwrap_or_default()),
    )
    .await;

    Ok(ApiResponse::ok(detalle).with_message("Nota de venta actualizada"))
}

/// `DELETE /api/notas-venta/{id}`: soft delete (`estado = anulada`).
pub async fn remove(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<NotaVentaDetalle>> {
    let detalle = state.db.notas_venta().anular(&id).await?;

    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(AccionAuditoria::Eliminar, ENTIDAD).entidad_id(&id),
    )
    .await;

    Ok(ApiResponse::ok(detalle).with_message("Nota de venta anulada"))
}
