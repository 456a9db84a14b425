//! # Domain Types
//!
//! Core domain types used throughout Cotiza.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────┐ 1   n ┌─────────────┐                                 │
//! │  │  Cliente    │───────│    Obra     │                                 │
//! │  │  rut        │       │  estado     │                                 │
//! │  └──────┬──────┘       └──────┬──────┘                                 │
//! │         │ 1                    │ 0..1                                   │
//! │         │ n                    │                                        │
//! │  ┌──────┴──────────────────────┴──┐ 1  0..n ┌──────────────────┐       │
//! │  │        Cotizacion              │─────────│    NotaVenta     │       │
//! │  │  numero · estado · totales     │         │  numero · estado │       │
//! │  └──────┬─────────────────────────┘         └────────┬─────────┘       │
//! │         │ 1..n                                       │ 1..n            │
//! │  ┌──────┴───────────┐                       ┌────────┴─────────┐       │
//! │  │  ItemDocumento   │──── producto_id ──────│  ItemDocumento   │       │
//! │  └──────────────────┘          │            └──────────────────┘       │
//! │                          ┌─────┴──────┐                                 │
//! │                          │  Producto  │ + stock_actual / stock_minimo   │
//! │                          └────────────┘                                 │
//! │                                                                         │
//! │  Usuario (admin / vendedor / bodega)    RegistroAuditoria               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names are the JSON field names the frontend reads
//! (`nombre_razon_social`, `cliente_nombre`, ...), so they stay in Spanish.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::format::{format_numero_cotizacion, format_numero_nota};
use crate::money::Money;
use crate::totals::QuoteTotals;
use crate::validation::{
    normalize_rut, validate_discount_percentage, validate_email, validate_max_len,
    validate_price, validate_quantity, validate_required, ValidationResult,
};
use crate::{DEFAULT_PAGE_SIZE, MAX_DOCUMENT_ITEMS, MAX_PAGE_SIZE};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%; 1900 bps = 19% (IVA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Status Enums
// =============================================================================

/// Implements `as_str`, `ALL`, `Display` and `FromStr` for a status enum.
///
/// The string forms match the serde/sqlx representation so query-string
/// filters (`?estado=en_curso`) parse with the same spelling the API emits.
macro_rules! status_strings {
    ($ty:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// Wire/database spelling.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok($ty::$variant),)+
                    _ => Err(ValidationError::NotAllowed {
                        field: $field.to_string(),
                        allowed: $ty::ALL.iter().map(|v| v.as_str().to_string()).collect(),
                    }),
                }
            }
        }
    };
}

/// Client status. `Inactivo` is the soft-deleted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ClienteEstado {
    #[default]
    Activo,
    Inactivo,
}

status_strings!(ClienteEstado, "estado", {
    Activo => "activo",
    Inactivo => "inactivo",
});

/// Construction project status. `Cancelada` is the soft-deleted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ObraEstado {
    #[default]
    Planificacion,
    EnCurso,
    Finalizada,
    Cancelada,
}

status_strings!(ObraEstado, "estado", {
    Planificacion => "planificacion",
    EnCurso => "en_curso",
    Finalizada => "finalizada",
    Cancelada => "cancelada",
});

/// Quote status. `Anulada` is the soft-deleted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CotizacionEstado {
    #[default]
    Borrador,
    Enviada,
    Aprobada,
    Rechazada,
    Vencida,
    Anulada,
}

status_strings!(CotizacionEstado, "estado", {
    Borrador => "borrador",
    Enviada => "enviada",
    Aprobada => "aprobada",
    Rechazada => "rechazada",
    Vencida => "vencida",
    Anulada => "anulada",
});

impl CotizacionEstado {
    /// Whether a sales note may still be generated from a quote in this status.
    pub const fn allows_sales_note(&self) -> bool {
        matches!(
            self,
            CotizacionEstado::Borrador | CotizacionEstado::Enviada | CotizacionEstado::Aprobada
        )
    }

    /// Statuses whose validity period still runs and whose content may be edited.
    pub const fn is_open(&self) -> bool {
        matches!(self, CotizacionEstado::Borrador | CotizacionEstado::Enviada)
    }

    /// Annulled quotes are final; every other status may move anywhere.
    pub fn can_transition_to(&self, next: CotizacionEstado) -> bool {
        *self == next || *self != CotizacionEstado::Anulada
    }
}

/// Sales note status. `Anulada` is the soft-deleted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NotaVentaEstado {
    #[default]
    Pendiente,
    Confirmada,
    Despachada,
    Anulada,
}

status_strings!(NotaVentaEstado, "estado", {
    Pendiente => "pendiente",
    Confirmada => "confirmada",
    Despachada => "despachada",
    Anulada => "anulada",
});

impl NotaVentaEstado {
    /// Whether the note's items have been taken out of stock.
    pub const fn consumes_stock(&self) -> bool {
        matches!(self, NotaVentaEstado::Confirmada | NotaVentaEstado::Despachada)
    }

    /// ```text
    /// pendiente ──► confirmada ──► despachada
    ///     │              │              │
    ///     └──────────────┴──────────────┴──► anulada (final)
    /// ```
    /// Staying in the same status is always allowed.
    pub fn can_transition_to(&self, next: NotaVentaEstado) -> bool {
        use NotaVentaEstado::*;
        *self == next
            || matches!(
                (self, next),
                (Pendiente, Confirmada)
                    | (Pendiente, Despachada)
                    | (Pendiente, Anulada)
                    | (Confirmada, Despachada)
                    | (Confirmada, Anulada)
                    | (Despachada, Anulada)
            )
    }
}

/// User role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Rol {
    Admin,
    #[default]
    Vendedor,
    Bodega,
}

status_strings!(Rol, "rol", {
    Admin => "admin",
    Vendedor => "vendedor",
    Bodega => "bodega",
});

/// What an audit log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AccionAuditoria {
    Crear,
    Actualizar,
    Eliminar,
    CambiarEstado,
    AjustarStock,
    Login,
    Logout,
}

status_strings!(AccionAuditoria, "accion", {
    Crear => "crear",
    Actualizar => "actualizar",
    Eliminar => "eliminar",
    CambiarEstado => "cambiar_estado",
    AjustarStock => "ajustar_stock",
    Login => "login",
    Logout => "logout",
});

// =============================================================================
// List Parameters
// =============================================================================

/// Common list parameters: `search`, `estado`, `limit`, `offset`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ListFilter {
    pub search: Option<String>,
    pub estado: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListFilter {
    /// Effective page size (default 50, capped at 200, at least 1).
    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Effective offset (default 0).
    pub fn offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }

    /// `%term%` LIKE pattern for the search substring, if any.
    ///
    /// `%` and `_` typed by the user are escaped with `\`; queries using the
    /// pattern must declare `ESCAPE '\'`.
    pub fn search_pattern(&self) -> Option<String> {
        let term = self.search.as_deref().map(str::trim).unwrap_or("");
        if term.is_empty() {
            return None;
        }
        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{}%", escaped))
    }

    /// Parses `estado` into the resource's status enum.
    pub fn estado_as<T: FromStr<Err = ValidationError>>(&self) -> ValidationResult<Option<T>> {
        match self.estado.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => value.parse().map(Some),
        }
    }
}

// =============================================================================
// Cliente
// =============================================================================

/// A client (company or person), identified by RUT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Cliente {
    pub id: String,
    /// Normalized RUT (`12345678-5`).
    pub rut: String,
    pub nombre_razon_social: String,
    pub giro: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub comuna: Option<String>,
    pub ciudad: Option<String>,
    /// Contact person at the client.
    pub contacto: Option<String>,
    pub estado: ClienteEstado,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/clientes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NuevoCliente {
    pub rut: String,
    pub nombre_razon_social: String,
    pub giro: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub comuna: Option<String>,
    pub ciudad: Option<String>,
    pub contacto: Option<String>,
}

impl NuevoCliente {
    /// Validates the form and returns a copy with the RUT normalized.
    pub fn validated(&self) -> ValidationResult<NuevoCliente> {
        validate_required("nombre_razon_social", &self.nombre_razon_social)?;
        validate_max_len("nombre_razon_social", &self.nombre_razon_social, 200)?;
        let rut = normalize_rut(&self.rut)?;
        if let Some(email) = non_empty(&self.email) {
            validate_email(email)?;
        }

        Ok(NuevoCliente {
            rut,
            nombre_razon_social: self.nombre_razon_social.trim().to_string(),
            ..self.clone()
        })
    }
}

/// Body of `PUT /api/clientes/{id}`; absent fields stay unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActualizarCliente {
    pub rut: Option<String>,
    pub nombre_razon_social: Option<String>,
    pub giro: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub comuna: Option<String>,
    pub ciudad: Option<String>,
    pub contacto: Option<String>,
    pub estado: Option<ClienteEstado>,
}

impl ActualizarCliente {
    /// Validates present fields and normalizes the RUT if one was sent.
    pub fn validated(&self) -> ValidationResult<ActualizarCliente> {
        let rut = match &self.rut {
            Some(rut) => Some(normalize_rut(rut)?),
            None => None,
        };
        if let Some(nombre) = &self.nombre_razon_social {
            validate_required("nombre_razon_social", nombre)?;
            validate_max_len("nombre_razon_social", nombre, 200)?;
        }
        if let Some(email) = non_empty(&self.email) {
            validate_email(email)?;
        }

        Ok(ActualizarCliente {
            rut,
            ..self.clone()
        })
    }
}

// =============================================================================
// Obra
// =============================================================================

/// A construction site / project belonging to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Obra {
    pub id: String,
    pub cliente_id: String,
    /// Flattened from `clientes.nombre_razon_social`.
    pub cliente_nombre: Option<String>,
    pub nombre: String,
    pub direccion: Option<String>,
    pub comuna: Option<String>,
    pub estado: ObraEstado,
    #[ts(as = "Option<String>")]
    pub fecha_inicio: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub fecha_termino: Option<NaiveDate>,
    pub descripcion: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/obras`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NuevaObra {
    pub cliente_id: String,
    pub nombre: String,
    pub direccion: Option<String>,
    pub comuna: Option<String>,
    pub estado: Option<ObraEstado>,
    #[ts(as = "Option<String>")]
    pub fecha_inicio: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub fecha_termino: Option<NaiveDate>,
    pub descripcion: Option<String>,
}

impl NuevaObra {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("cliente_id", &self.cliente_id)?;
        validate_required("nombre", &self.nombre)?;
        validate_max_len("nombre", &self.nombre, 200)?;
        validate_date_range(self.fecha_inicio, self.fecha_termino)
    }
}

/// Body of `PUT /api/obras/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActualizarObra {
    pub nombre: Option<String>,
    pub direccion: Option<String>,
    pub comuna: Option<String>,
    pub estado: Option<ObraEstado>,
    #[ts(as = "Option<String>")]
    pub fecha_inicio: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub fecha_termino: Option<NaiveDate>,
    pub descripcion: Option<String>,
}

impl ActualizarObra {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(nombre) = &self.nombre {
            validate_required("nombre", nombre)?;
            validate_max_len("nombre", nombre, 200)?;
        }
        validate_date_range(self.fecha_inicio, self.fecha_termino)
    }
}

fn validate_date_range(inicio: Option<NaiveDate>, termino: Option<NaiveDate>) -> ValidationResult<()> {
    if let (Some(inicio), Some(termino)) = (inicio, termino) {
        if termino < inicio {
            return Err(ValidationError::invalid(
                "fecha_termino",
                "no puede ser anterior a fecha_inicio",
            ));
        }
    }
    Ok(())
}

// =============================================================================
// Producto
// =============================================================================

/// A product with its current stock flattened in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Producto {
    pub id: String,
    /// Business identifier (SKU).
    pub codigo: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    /// Unit of sale: `un`, `m2`, `m3`, `kg`, ...
    pub unidad: String,
    pub precio_unitario: Money,
    pub categoria: Option<String>,
    /// `false` is the soft-deleted state.
    pub activo: bool,
    pub stock_actual: f64,
    pub stock_minimo: f64,
    pub ubicacion: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Producto {
    /// Stock at or below the configured minimum.
    pub fn bajo_stock(&self) -> bool {
        self.stock_actual <= self.stock_minimo
    }
}

/// Body of `POST /api/productos`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NuevoProducto {
    pub codigo: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub unidad: Option<String>,
    pub precio_unitario: Money,
    pub categoria: Option<String>,
    pub stock_inicial: Option<f64>,
    pub stock_minimo: Option<f64>,
    pub ubicacion: Option<String>,
}

impl NuevoProducto {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("codigo", &self.codigo)?;
        validate_max_len("codigo", &self.codigo, 50)?;
        validate_required("nombre", &self.nombre)?;
        validate_max_len("nombre", &self.nombre, 200)?;
        validate_price("precio_unitario", self.precio_unitario)?;
        if self.stock_inicial.is_some_and(|s| s < 0.0 || !s.is_finite()) {
            return Err(ValidationError::OutOfRange {
                field: "stock_inicial".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        if self.stock_minimo.is_some_and(|s| s < 0.0 || !s.is_finite()) {
            return Err(ValidationError::OutOfRange {
                field: "stock_minimo".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        Ok(())
    }
}

/// Body of `PUT /api/productos/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActualizarProducto {
    pub codigo: Option<String>,
    pub nombre: Option<String>,
    pub descripcion: Option<String>,
    pub unidad: Option<String>,
    pub precio_unitario: Option<Money>,
    pub categoria: Option<String>,
    pub activo: Option<bool>,
    pub stock_minimo: Option<f64>,
    pub ubicacion: Option<String>,
}

impl ActualizarProducto {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(codigo) = &self.codigo {
            validate_required("codigo", codigo)?;
            validate_max_len("codigo", codigo, 50)?;
        }
        if let Some(nombre) = &self.nombre {
            validate_required("nombre", nombre)?;
            validate_max_len("nombre", nombre, 200)?;
        }
        if let Some(precio) = self.precio_unitario {
            validate_price("precio_unitario", precio)?;
        }
        if self.stock_minimo.is_some_and(|s| s < 0.0 || !s.is_finite()) {
            return Err(ValidationError::OutOfRange {
                field: "stock_minimo".to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
        Ok(())
    }
}

/// Body of `POST /api/productos/{id}/stock`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AjusteStock {
    /// Positive for receipts, negative for withdrawals.
    pub delta: f64,
    pub motivo: Option<String>,
}

impl AjusteStock {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.delta == 0.0 || !self.delta.is_finite() {
            return Err(ValidationError::invalid("delta", "debe ser distinto de cero"));
        }
        Ok(())
    }
}

// =============================================================================
// Document Items (quotes and sales notes)
// =============================================================================

/// A line item on a quote or sales note.
///
/// Description, unit and price are copied from the product when the item is
/// created so the document does not change when the catalog does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ItemDocumento {
    pub id: String,
    /// 1-based position on the document.
    pub posicion: i64,
    pub producto_id: Option<String>,
    pub descripcion: String,
    pub unidad: String,
    pub cantidad: f64,
    pub precio_unitario: Money,
    /// `round(cantidad × precio_unitario)`.
    pub subtotal: Money,
}

/// A line item as sent by the quote form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NuevoItem {
    pub producto_id: Option<String>,
    pub descripcion: String,
    pub unidad: Option<String>,
    pub cantidad: f64,
    pub precio_unitario: Money,
}

impl NuevoItem {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_required("descripcion", &self.descripcion)?;
        validate_max_len("descripcion", &self.descripcion, 500)?;
        validate_quantity(self.cantidad)?;
        validate_price("precio_unitario", self.precio_unitario)
    }

    /// Line subtotal for this item.
    pub fn subtotal(&self) -> Money {
        self.precio_unitario.line_total(self.cantidad)
    }

    /// Builds the stored item at `posicion` with a fresh id.
    pub fn into_item(self, posicion: i64) -> ItemDocumento {
        let subtotal = self.subtotal();
        ItemDocumento {
            id: uuid::Uuid::new_v4().to_string(),
            posicion,
            producto_id: self.producto_id.filter(|id| !id.trim().is_empty()),
            descripcion: self.descripcion.trim().to_string(),
            unidad: self
                .unidad
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| "un".to_string()),
            cantidad: self.cantidad,
            precio_unitario: self.precio_unitario,
            subtotal,
        }
    }
}

/// Validates a full item list (non-empty, bounded, every item valid).
pub fn validate_items(items: &[NuevoItem]) -> crate::CoreResult<()> {
    if items.is_empty() {
        return Err(crate::CoreError::EmptyDocument);
    }
    if items.len() > MAX_DOCUMENT_ITEMS {
        return Err(crate::CoreError::TooManyItems {
            max: MAX_DOCUMENT_ITEMS,
        });
    }
    for item in items {
        item.validate()?;
    }
    Ok(())
}

// =============================================================================
// Cotizacion
// =============================================================================

/// A quote header with client/project/seller names flattened in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Cotizacion {
    pub id: String,
    /// Sequential document number; see [`Cotizacion::numero_formateado`].
    pub numero: i64,
    pub cliente_id: String,
    pub cliente_nombre: Option<String>,
    pub cliente_rut: Option<String>,
    pub obra_id: Option<String>,
    pub obra_nombre: Option<String>,
    pub vendedor_id: Option<String>,
    pub vendedor_nombre: Option<String>,
    #[ts(as = "String")]
    pub fecha: NaiveDate,
    pub validez_dias: i64,
    pub estado: CotizacionEstado,
    pub subtotal: Money,
    pub descuento_porcentaje: f64,
    pub descuento: Money,
    pub neto: Money,
    pub iva: Money,
    pub total: Money,
    pub observaciones: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Cotizacion {
    /// `COT-000123`.
    pub fn numero_formateado(&self) -> String {
        format_numero_cotizacion(self.numero)
    }

    /// Last day the quote is valid.
    pub fn fecha_vencimiento(&self) -> NaiveDate {
        self.fecha + Duration::days(self.validez_dias)
    }

    /// An open quote whose validity period has passed.
    pub fn esta_vencida(&self, hoy: NaiveDate) -> bool {
        self.estado.is_open() && hoy > self.fecha_vencimiento()
    }

    /// Stored totals as a [`QuoteTotals`].
    pub fn totales(&self) -> QuoteTotals {
        QuoteTotals {
            subtotal: self.subtotal,
            descuento: self.descuento,
            neto: self.neto,
            iva: self.iva,
            total: self.total,
        }
    }
}

/// A quote with its line items (`GET /api/cotizaciones/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CotizacionDetalle {
    #[serde(flatten)]
    pub cotizacion: Cotizacion,
    pub items: Vec<ItemDocumento>,
}

/// Body of `POST /api/cotizaciones`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NuevaCotizacion {
    pub cliente_id: String,
    pub obra_id: Option<String>,
    pub vendedor_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub fecha: Option<NaiveDate>,
    pub validez_dias: Option<i64>,
    pub descuento_porcentaje: Option<f64>,
    pub observaciones: Option<String>,
    pub items: Vec<NuevoItem>,
}

impl NuevaCotizacion {
    pub fn validate(&self) -> crate::CoreResult<()> {
        validate_required("cliente_id", &self.cliente_id)?;
        validate_validez(self.validez_dias)?;
        if let Some(pct) = self.descuento_porcentaje {
            validate_discount_percentage(pct)?;
        }
        validate_items(&self.items)
    }
}

/// Body of `PUT /api/cotizaciones/{id}`.
///
/// Sending `items` replaces every line item; totals are recomputed whenever
/// `items` or `descuento_porcentaje` change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActualizarCotizacion {
    pub obra_id: Option<String>,
    pub vendedor_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub fecha: Option<NaiveDate>,
    pub validez_dias: Option<i64>,
    pub estado: Option<CotizacionEstado>,
    pub descuento_porcentaje: Option<f64>,
    pub observaciones: Option<String>,
    pub items: Option<Vec<NuevoItem>>,
}

impl ActualizarCotizacion {
    pub fn validate(&self) -> crate::CoreResult<()> {
        validate_validez(self.validez_dias)?;
        if let Some(pct) = self.descuento_porcentaje {
            validate_discount_percentage(pct)?;
        }
        if let Some(items) = &self.items {
            validate_items(items)?;
        }
        Ok(())
    }

    /// Whether applying this update requires recomputing the totals.
    pub fn changes_totals(&self) -> bool {
        self.items.is_some() || self.descuento_porcentaje.is_some()
    }
}

fn validate_validez(validez: Option<i64>) -> ValidationResult<()> {
    match validez {
        Some(dias) if !(1..=365).contains(&dias) => Err(ValidationError::OutOfRange {
            field: "validez_dias".to_string(),
            min: 1,
            max: 365,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Nota de Venta
// =============================================================================

/// A sales note header with names flattened in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct NotaVenta {
    pub id: String,
    pub numero: i64,
    pub cotizacion_id: Option<String>,
    /// Number of the originating quote, flattened.
    pub cotizacion_numero: Option<i64>,
    pub cliente_id: String,
    pub cliente_nombre: Option<String>,
    pub cliente_rut: Option<String>,
    pub obra_id: Option<String>,
    pub obra_nombre: Option<String>,
    pub vendedor_id: Option<String>,
    pub vendedor_nombre: Option<String>,
    #[ts(as = "String")]
    pub fecha: NaiveDate,
    pub estado: NotaVentaEstado,
    pub subtotal: Money,
    pub descuento: Money,
    pub neto: Money,
    pub iva: Money,
    pub total: Money,
    pub observaciones: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl NotaVenta {
    /// `NV-000045`.
    pub fn numero_formateado(&self) -> String {
        format_numero_nota(self.numero)
    }
}

/// A sales note with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NotaVentaDetalle {
    #[serde(flatten)]
    pub nota: NotaVenta,
    pub items: Vec<ItemDocumento>,
}

/// Body of `POST /api/notas-venta`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NuevaNotaVenta {
    pub cotizacion_id: String,
    pub observaciones: Option<String>,
}

/// Body of `PUT /api/notas-venta/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActualizarNotaVenta {
    pub estado: Option<NotaVentaEstado>,
    pub observaciones: Option<String>,
}

// =============================================================================
// Usuario
// =============================================================================

/// An application user (never carries the password hash).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Usuario {
    pub id: String,
    pub email: String,
    pub nombre: String,
    pub rol: Rol,
    /// `false` is the soft-deleted state.
    pub activo: bool,
    #[ts(as = "Option<String>")]
    pub ultimo_acceso: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/usuarios`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NuevoUsuario {
    pub email: String,
    pub nombre: String,
    pub rol: Option<Rol>,
    pub password: String,
}

impl NuevoUsuario {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_email(&self.email)?;
        validate_required("nombre", &self.nombre)?;
        validate_max_len("nombre", &self.nombre, 120)?;
        crate::validation::validate_password(&self.password)
    }
}

/// Body of `PUT /api/usuarios/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActualizarUsuario {
    pub nombre: Option<String>,
    pub rol: Option<Rol>,
    pub activo: Option<bool>,
    pub password: Option<String>,
}

impl ActualizarUsuario {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(nombre) = &self.nombre {
            validate_required("nombre", nombre)?;
            validate_max_len("nombre", nombre, 120)?;
        }
        if let Some(password) = &self.password {
            crate::validation::validate_password(password)?;
        }
        Ok(())
    }
}

// =============================================================================
// Auditoría
// =============================================================================

/// One audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RegistroAuditoria {
    pub id: String,
    pub usuario_id: Option<String>,
    /// Flattened from `usuarios.nombre`.
    pub usuario_nombre: Option<String>,
    pub accion: AccionAuditoria,
    /// Table-level entity name: `cliente`, `cotizacion`, ...
    pub entidad: String,
    pub entidad_id: Option<String>,
    /// JSON text with the request body or a short description.
    pub detalle: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================
