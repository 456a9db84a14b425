//! # Producto Repository
//!
//! Product catalog plus the one-row-per-product `stock` table.
//!
//! ## Stock Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  productos (catalog)           stock (1:1, created with the product)    │
//! │  ┌──────────────────┐          ┌──────────────────────────────┐         │
//! │  │ id, codigo, ...  │──────────│ cantidad ≥ 0, stock_minimo   │         │
//! │  └──────────────────┘          └──────────────────────────────┘         │
//! │                                                                         │
//! │  Writers:                                                               │
//! │  ├── adjust_stock()             manual receipts / withdrawals           │
//! │  └── apply_stock_delta()        sales note confirm / annul (same tx)    │
//! │                                                                         │
//! │  A delta that would leave cantidad < 0 fails with InsufficientStock     │
//! │  and nothing is written.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{activo_filter, clean_text, merge_text, push_page, push_search};
use crate::error::{DbError, DbResult};
use cotiza_core::{
    ActualizarProducto, AjusteStock, CoreError, ListFilter, NuevoProducto, Producto,
};

const SELECT_PRODUCTO: &str = r#"
    SELECT
        p.id, p.codigo, p.nombre, p.descripcion, p.unidad, p.precio_unitario,
        p.categoria, p.activo,
        COALESCE(s.cantidad, 0.0) AS stock_actual,
        COALESCE(s.stock_minimo, 0.0) AS stock_minimo,
        s.ubicacion,
        p.created_at, p.updated_at
    FROM productos p
    LEFT JOIN stock s ON s.producto_id = p.id
"#;

const LOW_STOCK: &str = "COALESCE(s.cantidad, 0.0) <= COALESCE(s.stock_minimo, 0.0)";

/// Float noise tolerated when checking for negative stock.
const STOCK_EPSILON: f64 = 1e-9;

/// List filter for products.
///
/// `base.estado` accepts `activo` / `inactivo` and is equivalent to `activo`.
#[derive(Debug, Clone, Default)]
pub struct ProductoFilter {
    pub base: ListFilter,
    pub activo: Option<bool>,
    /// Only products at or below their minimum stock.
    pub bajo_stock: bool,
}

impl ProductoFilter {
    fn activo(&self) -> DbResult<Option<bool>> {
        match self.activo {
            Some(activo) => Ok(Some(activo)),
            None => activo_filter(&self.base),
        }
    }
}

/// Repository for products and stock.
#[derive(Debug, Clone)]
pub struct ProductoRepository {
    pool: SqlitePool,
}

impl ProductoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductoRepository { pool }
    }

    /// Lists products ordered by name.
    pub async fn list(&self, filter: &ProductoFilter) -> DbResult<Vec<Producto>> {
        let activo = filter.activo()?;

        debug!(search = ?filter.base.search, activo = ?activo, bajo_stock = filter.bajo_stock, "Listing productos");

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_PRODUCTO);
        qb.push(" WHERE 1=1");

        if let Some(activo) = activo {
            qb.push(" AND p.activo = ").push_bind(activo);
        }
        if filter.bajo_stock {
            qb.push(" AND ").push(LOW_STOCK);
        }
        push_search(
            &mut qb,
            &filter.base,
            &["p.codigo", "p.nombre", "p.categoria"],
        );

        qb.push(" ORDER BY p.nombre COLLATE NOCASE, p.id");
        push_page(&mut qb, &filter.base);

        let productos = qb.build_query_as::<Producto>().fetch_all(&self.pool).await?;
        Ok(productos)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Producto>> {
        let producto = sqlx::query_as::<_, Producto>(&format!("{} WHERE p.id = ?1", SELECT_PRODUCTO))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(producto)
    }

    /// Creates a product and its stock row in one transaction.
    pub async fn create(&self, form: &NuevoProducto) -> DbResult<Producto> {
        form.validate()?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let codigo = form.codigo.trim().to_string();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO productos (
                id, codigo, nombre, descripcion, unidad, precio_unitario,
                categoria, activo, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)
            "#,
        )
        .bind(&id)
        .bind(&codigo)
        .bind(form.nombre.trim())
        .bind(clean_text(&form.descripcion))
        .bind(clean_text(&form.unidad).unwrap_or_else(|| "un".to_string()))
        .bind(form.precio_unitario)
        .bind(clean_text(&form.categoria))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&codigo))?;

        sqlx::query(
            r#"
            INSERT INTO stock (producto_id, cantidad, stock_minimo, ubicacion, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&id)
        .bind(form.stock_inicial.unwrap_or(0.0))
        .bind(form.stock_minimo.unwrap_or(0.0))
        .bind(clean_text(&form.ubicacion))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %id, codigo = %codigo, "Producto created");

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Producto", &id))
    }

    /// Applies a partial update to the product and its stock settings.
    ///
    /// The stock quantity itself only changes through [`adjust_stock`](Self::adjust_stock).
    pub async fn update(&self, id: &str, form: &ActualizarProducto) -> DbResult<Producto> {
        form.validate()?;
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Producto", id))?;

        let codigo = form
            .codigo
            .as_deref()
            .map(|c| c.trim().to_string())
            .unwrap_or(current.codigo);
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE productos SET
                codigo = ?2, nombre = ?3, descripcion = ?4, unidad = ?5,
                precio_unitario = ?6, categoria = ?7, activo = ?8, updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&codigo)
        .bind(
            form.nombre
                .as_deref()
                .map(|n| n.trim().to_string())
                .unwrap_or(current.nombre),
        )
        .bind(merge_text(current.descripcion, &form.descripcion))
        .bind(merge_text(Some(current.unidad), &form.unidad).unwrap_or_else(|| "un".to_string()))
        .bind(form.precio_unitario.unwrap_or(current.precio_unitario))
        .bind(merge_text(current.categoria, &form.categoria))
        .bind(form.activo.unwrap_or(current.activo))
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&codigo))?;

        sqlx::query(
            r#"
            INSERT INTO stock (producto_id, cantidad, stock_minimo, ubicacion, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (producto_id) DO UPDATE SET
                stock_minimo = excluded.stock_minimo,
                ubicacion = excluded.ubicacion,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(id)
        .bind(current.stock_actual)
        .bind(form.stock_minimo.unwrap_or(current.stock_minimo))
        .bind(merge_text(current.ubicacion, &form.ubicacion))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %id, "Producto updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Producto", id))
    }

    /// Soft delete: `activo = false`.
    pub async fn deactivate(&self, id: &str) -> DbResult<Producto> {
        let result = sqlx::query("UPDATE productos SET activo = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Producto", id));
        }

        info!(id = %id, "Producto deactivated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Producto", id))
    }

    /// Adds `ajuste.delta` to the stock quantity.
    pub async fn adjust_stock(&self, id: &str, ajuste: &AjusteStock) -> DbResult<Producto> {
        ajuste.validate()?;

        let mut tx = self.pool.begin().await?;
        let cantidad = apply_stock_delta(&mut tx, id, ajuste.delta).await?;
        tx.commit().await?;

        info!(
            id = %id,
            delta = ajuste.delta,
            cantidad = cantidad,
            motivo = ?ajuste.motivo,
            "Stock adjusted"
        );

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Producto", id))
    }

    /// Active products at or below their minimum stock.
    pub async fn count_low_stock(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM productos p LEFT JOIN stock s ON s.producto_id = p.id WHERE p.activo = 1 AND {}",
            LOW_STOCK
        ))
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Adds `delta` to a product's stock on an open connection/transaction and
/// returns the new quantity.
///
/// ## Errors
/// - `NotFound` when the product does not exist
/// - `CoreError::InsufficientStock` when the result would be negative
pub(crate) async fn apply_stock_delta(
    conn: &mut SqliteConnection,
    producto_id: &str,
    delta: f64,
) -> DbResult<f64> {
    let row: Option<(String, f64)> = sqlx::query_as(
        r#"
        SELECT p.codigo, COALESCE(s.cantidad, 0.0)
        FROM productos p
        LEFT JOIN stock s ON s.producto_id = p.id
        WHERE p.id = ?1
        "#,
    )
    .bind(producto_id)
    .fetch_optional(&mut *conn)
    .await?;

    let (codigo, available) = row.ok_or_else(|| DbError::not_found("Producto", producto_id))?;

    let nueva = available + delta;
    if nueva < -STOCK_EPSILON {
        return Err(CoreError::InsufficientStock {
            codigo,
            available,
            requested: -delta,
        }
        .into());
    }
    let nueva = nueva.max(0.0);

    sqlx::query(
        r#"
        INSERT INTO stock (producto_id, cantidad, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT (producto_id) DO UPDATE SET
            cantidad = excluded.cantidad,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(producto_id)
    .bind(nueva)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    debug!(producto_id = %producto_id, delta = delta, cantidad = nueva, "Stock delta applied");

    Ok(nueva)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{db, producto};
    use cotiza_core::Money;

    #[tokio::test]
    async fn test_create_with_stock_row() {
        let db = db().await;
        let p = producto(&db, "CEM-25", 5_990, 40.0).await;

        assert_eq!(p.codigo, "CEM-25");
        assert_eq!(p.unidad, "un");
        assert_eq!(p.precio_unitario, Money::from_pesos(5_990));
        assert_eq!(p.stock_actual, 40.0);
        assert_eq!(p.stock_minimo, 5.0);
        assert!(p.activo);
        assert!(!p.bajo_stock());
    }

    #[tokio::test]
    async fn test_duplicate_codigo() {
        let db = db().await;
        producto(&db, "CEM-25", 5_990, 0.0).await;

        let err = db
            .productos()
            .create(&NuevoProducto {
                codigo: "CEM-25".to_string(),
                nombre: "Otro".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_adjust_stock() {
        let db = db().await;
        let p = producto(&db, "FIE-8", 1_200, 10.0).await;
        let repo = db.productos();

        let p = repo
            .adjust_stock(
                &p.id,
                &AjusteStock {
                    delta: -7.5,
                    motivo: Some("Despacho manual".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(p.stock_actual, 2.5);
        assert!(p.bajo_stock());

        let err = repo
            .adjust_stock(
                &p.id,
                &AjusteStock {
                    delta: -3.0,
                    motivo: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { .. })
        ));

        // Failed adjustment left the quantity untouched
        let p = repo.get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(p.stock_actual, 2.5);

        let zero = repo
            .adjust_stock(&p.id, &AjusteStock { delta: 0.0, motivo: None })
            .await;
        assert!(zero.is_err());
    }

    #[tokio::test]
    async fn test_adjust_stock_missing_product() {
        let db = db().await;
        let err = db
            .productos()
            .adjust_stock("missing", &AjusteStock { delta: 1.0, motivo: None })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_filters_and_low_stock_count() {
        let db = db().await;
        producto(&db, "A-1", 100, 50.0).await;
        let bajo = producto(&db, "B-1", 100, 2.0).await;
        let inactivo = producto(&db, "C-1", 100, 1.0).await;
        let repo = db.productos();
        repo.deactivate(&inactivo.id).await.unwrap();

        let bajos = repo
            .list(&ProductoFilter {
                bajo_stock: true,
                activo: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(bajos.len(), 1);
        assert_eq!(bajos[0].id, bajo.id);

        let inactivos = repo
            .list(&ProductoFilter {
                base: ListFilter {
                    estado: Some("inactivo".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(inactivos.len(), 1);

        let bad = repo
            .list(&ProductoFilter {
                base: ListFilter {
                    estado: Some("borrado".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await;
        assert!(matches!(bad, Err(DbError::Core(CoreError::Validation(_)))));

        let search = repo
            .list(&ProductoFilter {
                base: ListFilter {
                    search: Some("a-1".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.len(), 1);

        assert_eq!(repo.count_low_stock().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_stock_quantity() {
        let db = db().await;
        let p = producto(&db, "A-1", 100, 12.0).await;

        let updated = db
            .productos()
            .update(
                &p.id,
                &ActualizarProducto {
                    precio_unitario: Some(Money::from_pesos(150)),
                    stock_minimo: Some(20.0),
                    ubicacion: Some("Bodega 2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.precio_unitario, Money::from_pesos(150));
        assert_eq!(updated.stock_actual, 12.0);
        assert_eq!(updated.stock_minimo, 20.0);
        assert_eq!(updated.ubicacion.as_deref(), Some("Bodega 2"));
        assert!(updated.bajo_stock());
    }
}
