//! # Database Migrations
//!
//! Embedded schema migrations.
//!
//! ## Directory Structure
//! ```text
//! migrations/sqlite/
//! └── 0001_initial_schema.sql   # usuarios, clientes, obras, productos,
//!                               # stock, cotizaciones (+items),
//!                               # notas_venta (+items), auditoria
//! ```

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// SQL files embedded at compile time.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations. Already-applied ones are tracked in
/// `_sqlx_migrations` and skipped.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(migrations = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)`.
///
/// A database that was never migrated reports zero applied migrations.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
