//! # cotiza-core: Pure Business Logic for Cotiza
//!
//! This crate contains the business rules of the sales back-office as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Cotiza Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Web frontend (browser)                       │   │
//! │  │   Clientes ─ Cotizaciones ─ Obras ─ Inventario ─ Dashboard      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP /api/*                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/api (axum handlers)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cotiza-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  types · money · totals · validation · format                  │   │
//! │  │  pdf (layout + HTML) · chart (geometry + SVG) · stats          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                cotiza-db (Database Layer)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Cliente, Cotizacion, NotaVenta, Obra, ...)
//! - [`money`] - Integer CLP money and tax rates
//! - [`totals`] - Quote totals (subtotal, descuento, neto, IVA, total)
//! - [`validation`] - Password policy, RUT, field rules
//! - [`format`] - es-CL currency, date and document-number formatting
//! - [`pdf`] - Quote PDF layout policy and HTML templates
//! - [`chart`] - Monthly activity chart geometry and SVG rendering
//! - [`stats`] - Dashboard aggregation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use cotiza_core::money::Money;
//! use cotiza_core::IVA;
//!
//! let neto = Money::from_pesos(10_000);
//! assert_eq!(neto.calculate_tax(IVA).pesos(), 1_900);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod chart;
pub mod error;
pub mod format;
pub mod money;
pub mod pdf;
pub mod stats;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use totals::QuoteTotals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Chilean VAT (IVA), 19%.
pub const IVA: TaxRate = TaxRate::from_bps(1900);

/// Page size used when a list request does not send `limit`.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Upper bound for `limit` on list requests.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Days a quote stays valid unless the seller says otherwise.
pub const DEFAULT_VALIDEZ_DIAS: i64 = 30;

/// Maximum number of line items accepted on a quote or sales note.
///
/// The PDF templates truncate well below this; the limit only guards the API.
pub const MAX_DOCUMENT_ITEMS: usize = 500;
