//! Client endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use serde_json::json;

use cotiza_core::{AccionAuditoria, ActualizarCliente, Cliente, ListFilter, NuevoCliente};
use cotiza_db::NuevoRegistro;

use super::audit;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::response::ApiResponse;
use crate::AppState;

const ENTIDAD: &str = "cliente";

/// `GET /api/clientes?search&estado&limit&offset`
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ListFilter>,
) -> ApiResult<ApiResponse<Vec<Cliente>>> {
    let clientes = state.db.clientes().list(&filter).await?;
    Ok(ApiResponse::list(clientes))
}

/// `GET /api/clientes/{id}`
pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Cliente>> {
    let cliente = state
        .db
        .clientes()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Cliente", &id))?;
    Ok(ApiResponse::ok(cliente))
}

/// `POST /api/clientes`
pub async fn create(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Json(form): Json<NuevoCliente>,
) -> ApiResult<(StatusCode, ApiResponse<Cliente>)> {
    let cliente = state.db.clientes().create(&form).await?;

    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(AccionAuditoria::Crear, ENTIDAD)
            .entidad_id(&cliente.id)
            .detalle(json!({ "rut": cliente.rut, "nombre": cliente.nombre_razon_social })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(cliente).with_message("Cliente creado"),
    ))
}

/// `PUT /api/clientes/{id}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Path(id): Path<String>,
    Json(form): Json<ActualizarCliente>,
) -> ApiResult<ApiResponse<Cliente>> {
    let cliente = state.db.clientes().update(&id, &form).await?;

    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(AccionAuditoria::Actualizar, ENTIDAD)
            .entidad_id(&id)
            .detalle(serde_json::to_value(&form).unwrap_or_default()),
    )
    .await;

    Ok(ApiResponse::ok(cliente).with_message("Cliente actualizado"))
}

/// `DELETE /api/clientes/{id}`: soft delete (`estado = inactivo`).
pub async fn remove(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Cliente>> {
    let cliente = state.db.clientes().deactivate(&id).await?;

    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(AccionAuditoria::Eliminar, ENTIDAD).entidad_id(&id),
    )
    .await;

    Ok(ApiResponse::ok(cliente).with_message("Cliente desactivado"))
}
