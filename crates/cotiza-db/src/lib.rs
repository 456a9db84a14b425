//! # cotiza-db: Database Layer for Cotiza
//!
//! SQLite storage for the sales back-office, accessed with sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cotiza Data Flow                                 │
//! │                                                                         │
//! │  axum handler (GET /api/cotizaciones?estado=enviada)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     cotiza-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌──────────────────┐  ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories    │  │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  clientes, obras │  │  (embedded)  │  │   │
//! │  │   │               │◄───│  productos, ...  │  │  0001_*.sql  │  │   │
//! │  │   │ SqlitePool    │    │  cotizaciones    │  │              │  │   │
//! │  │   │ health_check  │    │  notas_venta     │  │              │  │   │
//! │  │   └───────────────┘    └──────────────────┘  └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use cotiza_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./cotiza.db")).await?;
//! let clientes = db.clientes().list(&ListFilter::default()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod password;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, HealthReport};

// Repository re-exports for convenience
pub use repository::{
    AuditoriaFilter, AuditoriaRepository, ClienteRepository, CotizacionFilter,
    CotizacionRepository, DashboardRepository, NotaVentaFilter, NotaVentaRepository,
    NuevoRegistro, ObraFilter, ObraRepository, ProductoFilter, ProductoRepository,
    UsuarioConHash, UsuarioRepository,
};
