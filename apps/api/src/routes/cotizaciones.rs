//! # Quote Endpoints
//!
//! CRUD plus the printable document:
//!
//! ```text
//! GET  /api/cotizaciones/{id}/html?plantilla=auto|posicionada|condensada
//! GET  /api/cotizaciones/{id}/pdf?plantilla=...
//!        │
//!        ▼
//!   get_detalle ──► render_quote_html ──► ChromiumRenderer ──► application/pdf
//! ```
//!
//! Listing first moves overdue open quotes to `vencida`, so every read sees
//! current statuses.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderName, StatusCode};
use axum::response::Html;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use cotiza_core::format::hoy;
use cotiza_core::pdf::{render_quote_html, Plantilla, QuoteDocument, RenderedHtml};
use cotiza_core::{
    AccionAuditoria, ActualizarCotizacion, Cotizacion, CotizacionDetalle, ListFilter,
    NuevaCotizacion,
};
use cotiza_db::{CotizacionFilter, NuevoRegistro};

use super::audit;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::response::ApiResponse;
use crate::AppState;

const ENTIDAD: &str = "cotizacion";

/// `GET /api/cotizaciones` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CotizacionesQuery {
    pub search: Option<String>,
    pub estado: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub cliente_id: Option<String>,
    pub obra_id: Option<String>,
    pub vendedor_id: Option<String>,
    pub desde: Option<NaiveDate>,
    pub hasta: Option<NaiveDate>,
}

impl From<CotizacionesQuery> for CotizacionFilter {
    fn from(q: CotizacionesQuery) -> Self {
        CotizacionFilter {
            base: ListFilter {
                search: q.search,
                estado: q.estado,
                limit: q.limit,
                offset: q.offset,
            },
            cliente_id: q.cliente_id,
            obra_id: q.obra_id,
            vendedor_id: q.vendedor_id,
            desde: q.desde,
            hasta: q.hasta,
        }
    }
}

/// `?plantilla=` for the document endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentoQuery {
    pub plantilla: Option<String>,
}

impl DocumentoQuery {
    /// `auto` (or nothing) picks the template from the item count.
    fn plantilla(&self, n_items: usize) -> ApiResult<Plantilla> {
        match self.plantilla.as_deref().map(str::trim) {
            None | Some("") | Some("auto") => Ok(Plantilla::auto(n_items)),
            Some(other) => Ok(other.parse()?),
        }
    }
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CotizacionesQuery>,
) -> ApiResult<ApiResponse<Vec<Cotizacion>>> {
    let repo = state.db.cotizaciones();
    repo.expire_overdue(hoy()).await?;

    let cotizaciones = repo.list(&query.into()).await?;
    Ok(ApiResponse::list(cotizaciones))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<CotizacionDetalle>> {
    let detalle = load_detalle(&state, &id).await?;
    Ok(ApiResponse::ok(detalle))
}

/// `POST /api/cotizaciones`. Without `vendedor_id` the session user is the
/// seller.
pub async fn create(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Json(mut form): Json<NuevaCotizacion>,
) -> ApiResult<(StatusCode, ApiResponse<CotizacionDetalle>)> {
    if form.vendedor_id.as_deref().map_or(true, |v| v.trim().is_empty()) {
        form.vendedor_id = usuario.id();
    }

    let detalle = state.db.cotizaciones().create(&form).await?;
    let cot = &detalle.cotizacion;

    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(AccionAuditoria::Crear, ENTIDAD)
            .entidad_id(&cot.id)
            .detalle(json!({
                "numero": cot.numero_formateado(),
                "cliente_id": cot.cliente_id,
                "items": detalle.items.len(),
                "total": cot.total,
            })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(detalle).with_message("Cotización creada"),
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Path(id): Path<String>,
    Json(form): Json<ActualizarCotizacion>,
) -> ApiResult<ApiResponse<CotizacionDetalle>> {
    let detalle = state.db.cotizaciones().update(&id, &form).await?;

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

    Ok(ApiResponse::ok(detalle).with_message("Cotización actualizada"))
}

/// `DELETE /api/cotizaciones/{id}`: soft delete (`estado = anulada`).
pub async fn remove(
    State(state): State<Arc<AppState>>,
    usuario: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<CotizacionDetalle>> {
    let detalle = state.db.cotizaciones().anular(&id).await?;

    audit(
        &state,
        usuario.id(),
        NuevoRegistro::new(AccionAuditoria::Eliminar, ENTIDAD).entidad_id(&id),
    )
    .await;

    Ok(ApiResponse::ok(detalle).with_message("Cotización anulada"))
}

// =============================================================================
// Printable document
// =============================================================================

/// `GET /api/cotizaciones/{id}/html`: the markup the PDF is printed from.
pub async fn html(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<DocumentoQuery>,
) -> ApiResult<Html<String>> {
    let (_, rendered) = render_document(&state, &id, &query).await?;
    Ok(Html(rendered.html))
}

/// `GET /api/cotizaciones/{id}/pdf`
pub async fn pdf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<DocumentoQuery>,
) -> ApiResult<([(HeaderName, String); 2], Vec<u8>)> {
    let (cotizacion, rendered) = render_document(&state, &id, &query).await?;
    let bytes = state.pdf.render(&rendered.html).await?;

    let numero = cotizacion.numero_formateado();
    info!(
        numero = %numero,
        plantilla = ?rendered.plantilla,
        filas = rendered.filas,
        omitidos = rendered.omitidos,
        bytes = bytes.len(),
        "Quote PDF rendered"
    );

    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("inline; filename=\"{}.pdf\"", numero),
            ),
        ],
        bytes,
    ))
}

async fn load_detalle(state: &AppState, id: &str) -> ApiResult<CotizacionDetalle> {
    state
        .db
        .cotizaciones()
        .get_detalle(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Cotización", id))
}

async fn render_document(
    state: &AppState,
    id: &str,
    query: &DocumentoQuery,
) -> ApiResult<(Cotizacion, RenderedHtml)> {
    let detalle = load_detalle(state, id).await?;
    let plantilla = query.plantilla(detalle.items.len())?;
    let cliente = state
        .db
        .clientes()
        .get_by_id(&detalle.cotizacion.cliente_id)
        .await?;

    let doc = QuoteDocument {
        empresa: &state.config.empresa,
        cotizacion: &detalle.cotizacion,
        items: &detalle.items,
        cliente: cliente.as_ref(),
    };
    let rendered = render_quote_html(&doc, plantilla, state.config.pdf_background_url.as_deref());

    debug!(id = %id, plantilla = ?rendered.plantilla, omitidos = rendered.omitidos, "Quote HTML rendered");

    Ok((detalle.cotizacion, rendered))
}
