//! Product and stock endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;

use cotiza_core::{
    AccionAuditoria, ActualizarProducto, AjusteStock, ListFilter, NuevoProducto, Producto,
};
use cotiza_db::{NuevoRegistro, ProductoFilter};

use super::audit;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::response::ApiResponse;
use crate::AppState;

const ENTIDAD: &str = "producto";

/// `GET /api/productos` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductosQuery {
    pub search: Option<String>,
    /// `activo` / `inactivo`
    pub estado: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub activo: Option<bool>,
    /// Only products at or below their minimum stock.
    pub bajo_stock: Option<bool>,
}

impl From<ProductosQuery> for ProductoFilter {
    fn from(q: ProductosQuery) -> Self {
        ProductoFilter {
            base: ListFilter {
                search: q.search,
                estado: q.estado,
                limit: q.limit,
                offset: q.offset,
            },
            activo: q.activo,
            bajo_stock: q.bajo_stock.unwrap_or(false),
        }
    }
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductosQuery>,
) -> ApiResult<ApiResponse<Vec<Producto>>> {
    let productos = state.db.productos().list(&query.into()).await?;
    Ok(ApiResponse::list(productos))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Producto>> {
    let producto = state
        .db
        .productos()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Producto", &id))?;
    Ok(ApiResponse::ok(producto))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Json(form): Json<NuevoProducto>,
) -> ApiResult<(StatusCode, ApiResponse<Producto>)> {
    let producto = state.db.productos().create(&form).await?;

    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(AccionAuditoria::Crear, ENTIDAD)
            .entidad_id(&producto.id)
            .detalle(json!({ "codigo": producto.codigo, "stock": producto.stock_actual })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(producto).with_message("Producto creado"),
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Path(id): Path<String>,
    Json(form): Json<ActualizarProducto>,
) -> ApiResult<ApiResponse<Producto>> {
    let producto = state.db.productos().update(&id, &form).await?;

    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(AccionAuditoria::Actualizar, ENTIDAD)
            .entidad_id(&id)
            .detalle(serde_json::to_value(&form).unwrap_or_default()),
    )
    .await;

    Ok(ApiResponse::ok(producto).with_message("Producto actualizado"))
}

/// `DELETE /api/productos/{id}`: soft delete (`activo = false`).
pub async fn remove(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Producto>> {
    let producto = state.db.productos().deactivate(&id).await?;

    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(AccionAuditoria::Eliminar, ENTIDAD).entidad_id(&id),
    )
    .await;

    Ok(ApiResponse::ok(producto).with_message("Producto desactivado"))
}

/// `POST /api/productos/{id}/stock` with `{ "delta": -3, "motivo": "merma" }`.
pub async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Path(id): Path<String>,
    Json(ajuste): Json<AjusteStock>,
) -> ApiResult<ApiResponse<Producto>> {
    let producto = state.db.productos().adjust_stock(&id, &ajuste).await?;

    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(AccionAuditoria::AjustarStock, ENTIDAD)
            .entidad_id(&id)
            .detalle(json!({
                "delta": ajuste.delta,
                "motivo": ajuste.motivo,
                "stock": producto.stock_actual,
            })),
    )
    .await;

    Ok(ApiResponse::ok(producto).with_message("Stock actualizado"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use crate::ErrorCode;
    use cotiza_db::AuditoriaFilter;

    fn ajuste(delta: f64) -> Json<AjusteStock> {
        Json(AjusteStock {
            delta,
            motivo: Some("recuento".to_string()),
        })
    }

    #[tokio::test]
    async fn test_low_stock_filter() {
        let state = test_support::state().await;
        test_support::producto(&state, "CEM-25", 5_990, 400.0).await;
        test_support::producto(&state, "YES-15", 8_990, 3.0).await;

        let response = list(State(state.clone()), Query(ProductosQuery::default()))
            .await
            .unwrap();
        assert_eq!(response.count, Some(2));

        let response = list(
            State(state),
            Query(ProductosQuery {
                bajo_stock: Some(true),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        let data = response.data.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].codigo, "YES-15");
        assert!(data[0].bajo_stock());
    }

    #[tokio::test]
    async fn test_adjust_stock() {
        let state = test_support::state().await;
        let usuario = test_support::auth(&state).await;
        let producto = test_support::producto(&state, "CEM-25", 5_990, 10.0).await;

        let response = adjust_stock(
            State(state.clone()),
            usuario.clone(),
            Path(producto.id.clone()),
            ajuste(-4.0),
        )
        .await
        .unwrap();
        assert_eq!(response.data.unwrap().stock_actual, 6.0);

        let err = adjust_stock(
            State(state.clone()),
            usuario.clone(),
            Path(producto.id.clone()),
            ajuste(-7.0),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err = adjust_stock(
            State(state.clone()),
            usuario.clone(),
            Path(producto.id.clone()),
            ajuste(0.0),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let registros = state
            .db
            .auditoria()
            .list(&AuditoriaFilter {
                accion: Some(AccionAuditoria::AjustarStock),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(registros.len(), 1);
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_row() {
        let state = test_support::state().await;
        let usuario = test_support::auth(&state).await;
        let producto = test_support::producto(&state, "OSB-11", 12_490, 8.0).await;

        let response = remove(State(state.clone()), usuario.clone(), Path(producto.id.clone()))
            .await
            .unwrap();
        assert!(!response.data.unwrap().activo);

        let response = detail(State(state.clone()), Path(producto.id)).await.unwrap();
        assert!(!response.data.unwrap().activo);

        let response = list(
            State(state),
            Query(ProductosQuery {
                activo: Some(true),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.count, Some(0));
    }

    #[tokio::test]
    async fn test_duplicate_code() {
        let state = test_support::state().await;
        let usuario = test_support::auth(&state).await;
        test_support::producto(&state, "CEM-25", 5_990, 1.0).await;

        let err = create(
            State(state),
            usuario.clone(),
            Json(NuevoProducto {
                codigo: "CEM-25".to_string(),
                nombre: "Otro cemento".to_string(),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(err.message.contains("CEM-25"));
    }
}
