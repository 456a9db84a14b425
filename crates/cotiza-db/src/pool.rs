//! # Database Connection Pool
//!
//! Pool configuration, SQLite tuning and repository access.
//!
//! ## Connection Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  main()                                                                 │
//! │    │  DbConfig::from_url(&config.database_url)                          │
//! │    ▼                                                                    │
//! │  Database::new(config)                                                  │
//! │    ├── SqliteConnectOptions (WAL, NORMAL sync, foreign keys)           │
//! │    ├── SqlitePoolOptions (max/min connections, timeouts)               │
//! │    └── run_migrations()                                                │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  Arc<AppState { db, .. }>  ── handlers call db.clientes().list(..)     │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  shutdown: db.close()                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    AuditoriaRepository, ClienteRepository, CotizacionRepository, DashboardRepository,
    NotaVentaRepository, ObraRepository, ProductoRepository, UsuarioRepository,
};

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings for the back-office database.
///
/// | field             | default | notes                               |
/// |-------------------|---------|-------------------------------------|
/// | `max_connections` | 5       | `DB_MAX_CONNECTIONS`                |
/// | `min_connections` | 1       |                                     |
/// | `connect_timeout` | 30 s    | pool acquire timeout                |
/// | `idle_timeout`    | 10 min  |                                     |
/// | `run_migrations`  | true    | off only in schema-missing tests    |
///
/// ```rust,ignore
/// let config = DbConfig::from_url(&api.database_url).max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(10 * 60),
            run_migrations: true,
        }
    }

    /// Accepts `cotiza.db`, `sqlite:cotiza.db` or `sqlite://cotiza.db?mode=rwc`.
    pub fn from_url(url: &str) -> Self {
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        let path = path.split('?').next().unwrap_or(path);
        DbConfig::new(path)
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Test database. Every in-memory connection is a separate database, so the pool is
    /// limited to one connection. Code running inside a transaction must use
    /// the transaction, never the pool.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(3600),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Health
// =============================================================================

/// Result of [`Database::health_check`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    /// The database answered (possibly refusing the query).
    pub connected: bool,
    /// The probed table exists and is readable.
    pub schema_ready: bool,
    pub migrations_total: usize,
    pub migrations_applied: usize,
    /// Error text when the probe did not succeed.
    pub detail: Option<String>,
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cloning is cheap (the pool is reference counted).
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database file, tunes SQLite
    /// (WAL, `synchronous = NORMAL`, foreign keys on) and applies pending
    /// migrations unless disabled.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max = config.max_connections,
            min = config.min_connections,
            "SQLite pool ready"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool, for ad-hoc queries in tests and the seed binary.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Repositories
    // =========================================================================

    pub fn clientes(&self) -> ClienteRepository {
        ClienteRepository::new(self.pool.clone())
    }

    pub fn obras(&self) -> ObraRepository {
        ObraRepository::new(self.pool.clone())
    }

    pub fn productos(&self) -> ProductoRepository {
        ProductoRepository::new(self.pool.clone())
    }

    pub fn cotizaciones(&self) -> CotizacionRepository {
        CotizacionRepository::new(self.pool.clone())
    }

    pub fn notas_venta(&self) -> NotaVentaRepository {
        NotaVentaRepository::new(self.pool.clone())
    }

    pub fn usuarios(&self) -> UsuarioRepository {
        UsuarioRepository::new(self.pool.clone())
    }

    pub fn auditoria(&self) -> AuditoriaRepository {
        AuditoriaRepository::new(self.pool.clone())
    }

    pub fn dashboard(&self) -> DashboardRepository {
        DashboardRepository::new(self.pool.clone())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Waits for checked-out connections and closes the pool. Later
    /// repository calls fail with `ConnectionFailed`/`PoolExhausted`.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }

    /// Issues a query against a real table.
    ///
    /// `SELECT 1` would succeed on an empty database; reading `clientes`
    /// also proves the schema is there.
    pub async fn probe(&self) -> DbResult<()> {
        sqlx::query("SELECT id FROM clientes LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(())
    }

    /// Startup/endpoint health check.
    ///
    /// A missing table or an access-denied answer still counts as connected.
    pub async fn health_check(&self) -> HealthReport {
        let (migrations_total, migrations_applied) = migrations::migration_status(&self.pool)
            .await
            .unwrap_or((0, 0));

        match self.probe().await {
            Ok(()) => HealthReport {
                connected: true,
                schema_ready: true,
                migrations_total,
                migrations_applied,
                detail: None,
            },
            Err(err) if err.is_reachable() => {
                warn!(error = %err, "Database reachable but probe was refused");
                HealthReport {
                    connected: true,
                    schema_ready: false,
                    migrations_total,
                    migrations_applied,
                    detail: Some(err.to_string()),
                }
            }
            Err(err) => {
                warn!(error = %err, "Database health check failed");
                HealthReport {
                    connected: false,
                    schema_ready: false,
                    migrations_total,
                    migrations_applied,
                    detail: Some(err.to_string()),
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
