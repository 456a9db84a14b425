//! # NotaVenta Repository
//!
//! Sales notes are generated from quotes and drive stock movements.
//!
//! ## Lifecycle and Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Cotizacion (borrador|enviada|aprobada)                                 │
//! │       │ create_from_quote: copy header + items, quote → aprobada       │
//! │       ▼                                                                 │
//! │  pendiente ──► confirmada ──► despachada                                │
//! │      │             │              │                                     │
//! │      └─────────────┴──────────────┴──► anulada                          │
//! │                                                                         │
//! │  stock:  pendiente → confirmada|despachada   items leave stock         │
//! │          confirmada|despachada → anulada     items return to stock     │
//! │                                                                         │
//! │  Every transition runs in one transaction; one product without         │
//! │  enough stock aborts the whole change.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::cotizaciones::fetch_cotizacion;
use super::productos::apply_stock_delta;
use super::{
    fetch_items, insert_items, merge_text, next_numero, push_page, push_search, Documento,
};
use crate::error::{DbError, DbResult};
use cotiza_core::format::{format_numero_nota, hoy};
use cotiza_core::{
    ActualizarNotaVenta, CoreError, CotizacionEstado, ItemDocumento, ListFilter, NotaVenta,
    NotaVentaDetalle, NotaVentaEstado, NuevaNotaVenta, QuoteTotals, ValidationError,
};

const SELECT_NOTA: &str = r#"
    SELECT
        n.id, n.numero,
        n.cotizacion_id, c.numero AS cotizacion_numero,
        n.cliente_id, cl.nombre_razon_social AS cliente_nombre, cl.rut AS cliente_rut,
        n.obra_id, o.nombre AS obra_nombre,
        n.vendedor_id, u.nombre AS vendedor_nombre,
        n.fecha, n.estado,
        n.subtotal, n.descuento, n.neto, n.iva, n.total,
        n.observaciones, n.created_at, n.updated_at
    FROM notas_venta n
    LEFT JOIN cotizaciones c ON c.id = n.cotizacion_id
    LEFT JOIN clientes cl ON cl.id = n.cliente_id
    LEFT JOIN obras o ON o.id = n.obra_id
    LEFT JOIN usuarios u ON u.id = n.vendedor_id
"#;

/// List filter for sales notes.
#[derive(Debug, Clone, Default)]
pub struct NotaVentaFilter {
    pub base: ListFilter,
    pub cliente_id: Option<String>,
    pub cotizacion_id: Option<String>,
    pub desde: Option<NaiveDate>,
    pub hasta: Option<NaiveDate>,
}

/// Repository for sales note operations.
#[derive(Debug, Clone)]
pub struct NotaVentaRepository {
    pool: SqlitePool,
}

impl NotaVentaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotaVentaRepository { pool }
    }

    /// Lists sales notes, highest number first.
    pub async fn list(&self, filter: &NotaVentaFilter) -> DbResult<Vec<NotaVenta>> {
        let estado = filter.base.estado_as::<NotaVentaEstado>()?;

        debug!(search = ?filter.base.search, estado = ?estado, "Listing notas de venta");

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_NOTA);
        qb.push(" WHERE 1=1");

        if let Some(estado) = estado {
            qb.push(" AND n.estado = ").push_bind(estado);
        }
        if let Some(cliente_id) = filter.cliente_id.as_deref().filter(|v| !v.is_empty()) {
            qb.push(" AND n.cliente_id = ").push_bind(cliente_id.to_string());
        }
        if let Some(cotizacion_id) = filter.cotizacion_id.as_deref().filter(|v| !v.is_empty()) {
            qb.push(" AND n.cotizacion_id = ").push_bind(cotizacion_id.to_string());
        }
        if let Some(desde) = filter.desde {
            qb.push(" AND n.fecha >= ").push_bind(desde);
        }
        if let Some(hasta) = filter.hasta {
            qb.push(" AND n.fecha <= ").push_bind(hasta);
        }
        push_search(
            &mut qb,
            &filter.base,
            &[
                "CAST(n.numero AS TEXT)",
                "cl.nombre_razon_social",
                "cl.rut",
                "o.nombre",
            ],
        );

        qb.push(" ORDER BY n.numero DESC");
        push_page(&mut qb, &filter.base);

        let notas = qb.build_query_as::<NotaVenta>().fetch_all(&self.pool).await?;
        Ok(notas)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<NotaVenta>> {
        let mut conn = self.pool.acquire().await?;
        fetch_nota(&mut conn, id).await
    }

    pub async fn get_detalle(&self, id: &str) -> DbResult<Option<NotaVentaDetalle>> {
        let mut conn = self.pool.acquire().await?;
        let Some(nota) = fetch_nota(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = fetch_items(&mut conn, Documento::NotaVenta, id).await?;

        Ok(Some(NotaVentaDetalle { nota, items }))
    }

    /// Generates a sales note from a quote.
    ///
    /// ## Errors
    /// - `NotFound` when the quote does not exist
    /// - `QuoteNotConvertible` when the quote is rejected, expired or annulled
    /// - `QuoteAlreadyConverted` when a non-annulled note already exists for it
    pub async fn create_from_quote(&self, form: &NuevaNotaVenta) -> DbResult<NotaVentaDetalle> {
        if form.cotizacion_id.trim().is_empty() {
            return Err(ValidationError::required("cotizacion_id").into());
        }

        let mut tx = self.pool.begin().await?;

        let cotizacion = fetch_cotizacion(&mut tx, &form.cotizacion_id)
            .await?
            .ok_or_else(|| DbError::not_found("Cotizacion", &form.cotizacion_id))?;

        if !cotizacion.estado.allows_sales_note() {
            return Err(CoreError::QuoteNotConvertible {
                numero: cotizacion.numero_formateado(),
                estado: cotizacion.estado.to_string(),
            }
            .into());
        }

        let existente: Option<i64> = sqlx::query_scalar(
            "SELECT numero FROM notas_venta WHERE cotizacion_id = ?1 AND estado != ?2 LIMIT 1",
        )
        .bind(&cotizacion.id)
        .bind(NotaVentaEstado::Anulada)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(numero) = existente {
            return Err(CoreError::QuoteAlreadyConverted {
                numero: cotizacion.numero_formateado(),
                nota: format_numero_nota(numero),
            }
            .into());
        }

        let items: Vec<ItemDocumento> = fetch_items(&mut tx, Documento::Cotizacion, &cotizacion.id)
            .await?
            .into_iter()
            .map(|item| ItemDocumento {
                id: Uuid::new_v4().to_string(),
                ..item
            })
            .collect();
        if items.is_empty() {
            return Err(CoreError::EmptyDocument.into());
        }
        let totals = QuoteTotals::from_items(&items, cotizacion.descuento_porcentaje);

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let numero = next_numero(&mut tx, Documento::NotaVenta).await?;

        sqlx::query(
            r#"
            INSERT INTO notas_venta (
                id, numero, cotizacion_id, cliente_id, obra_id, vendedor_id, fecha, estado,
                subtotal, descuento, neto, iva, total, observaciones, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)
            "#,
        )
        .bind(&id)
        .bind(numero)
        .bind(&cotizacion.id)
        .bind(&cotizacion.cliente_id)
        .bind(&cotizacion.obra_id)
        .bind(&cotizacion.vendedor_id)
        .bind(hoy())
        .bind(NotaVentaEstado::Pendiente)
        .bind(totals.subtotal)
        .bind(totals.descuento)
        .bind(totals.neto)
        .bind(totals.iva)
        .bind(totals.total)
        .bind(merge_text(cotizacion.observaciones.clone(), &form.observaciones))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_items(&mut tx, Documento::NotaVenta, &id, &items).await?;

        sqlx::query("UPDATE cotizaciones SET estado = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(&cotizacion.id)
            .bind(CotizacionEstado::Aprobada)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            id = %id,
            numero = numero,
            cotizacion = cotizacion.numero,
            total = totals.total.pesos(),
            "Nota de venta created"
        );

        self.get_detalle(&id)
            .await?
            .ok_or_else(|| DbError::not_found("NotaVenta", &id))
    }

    /// Changes status and/or observations, moving stock when the status
    /// crosses into or out of a stock-consuming state.
    pub async fn update(&self, id: &str, form: &ActualizarNotaVenta) -> DbResult<NotaVentaDetalle> {
        let mut tx = self.pool.begin().await?;

        let current = fetch_nota(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("NotaVenta", id))?;

        let estado = form.estado.unwrap_or(current.estado);
        if !current.estado.can_transition_to(estado) {
            return Err(CoreError::InvalidTransition {
                documento: current.numero_formateado(),
                from: current.estado.to_string(),
                to: estado.to_string(),
            }
            .into());
        }

        let sign = match (current.estado.consumes_stock(), estado.consumes_stock()) {
            (false, true) => Some(-1.0),
            (true, false) => Some(1.0),
            _ => None,
        };
        if let Some(sign) = sign {
            move_stock(&mut tx, id, sign).await?;
        }

        sqlx::query(
            "UPDATE notas_venta SET estado = ?2, observaciones = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(estado)
        .bind(merge_text(current.observaciones.clone(), &form.observaciones))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            id = %id,
            from = %current.estado,
            to = %estado,
            stock_moved = sign.is_some(),
            "Nota de venta updated"
        );

        self.get_detalle(id)
            .await?
            .ok_or_else(|| DbError::not_found("NotaVenta", id))
    }

    pub async fn set_estado(&self, id: &str, estado: NotaVentaEstado) -> DbResult<NotaVentaDetalle> {
        self.update(
            id,
            &ActualizarNotaVenta {
                estado: Some(estado),
                observaciones: None,
            },
        )
        .await
    }

    /// Soft delete: `estado = anulada` (restores stock if it was taken).
    pub async fn anular(&self, id: &str) -> DbResult<NotaVentaDetalle> {
        self.set_estado(id, NotaVentaEstado::Anulada).await
    }
}

async fn fetch_nota(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<NotaVenta>> {
    let nota = sqlx::query_as::<_, NotaVenta>(&format!("{} WHERE n.id = ?1", SELECT_NOTA))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(nota)
}

/// Applies `sign × cantidad` to the stock of every product-linked item.
async fn move_stock(conn: &mut SqliteConnection, nota_id: &str, sign: f64) -> DbResult<()> {
    let items = fetch_items(conn, Documento::NotaVenta, nota_id).await?;
    for item in &items {
        if let Some(producto_id) = &item.producto_id {
            apply_stock_delta(conn, producto_id, sign * item.cantidad).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{cliente, cotizacion_para, db, item_de, producto};
    use crate::Database;
    use cotiza_core::{Money, NuevoItem};

    async fn quote_with_stock(db: &Database, stock: f64, cantidad: f64) -> (String, String) {
        let c = cliente(db, "12.345.678-5", "Constructora Andes").await;
        let p = producto(db, "CEM-25", 5_990, stock).await;
        let manual = NuevoItem {
            descripcion: "Flete".to_string(),
            cantidad: 1.0,
            precio_unitario: Money::from_pesos(25_000),
            ..Default::default()
        };
        let cot = db
            .cotizaciones()
            .create(&cotizacion_para(&c, vec![item_de(&p, cantidad), manual]))
            .await
            .unwrap();
        (cot.cotizacion.id, p.id)
    }

    async fn stock_of(db: &Database, producto_id: &str) -> f64 {
        db.productos()
            .get_by_id(producto_id)
            .await
            .unwrap()
            .unwrap()
            .stock_actual
    }

    fn from(cotizacion_id: &str) -> NuevaNotaVenta {
        NuevaNotaVenta {
            cotizacion_id: cotizacion_id.to_string(),
            observaciones: None,
        }
    }

    #[tokio::test]
    async fn test_create_from_quote_copies_and_approves() {
        let db = db().await;
        let (cot_id, _) = quote_with_stock(&db, 100.0, 10.0).await;

        let nota = db.notas_venta().create_from_quote(&from(&cot_id)).await.unwrap();

        assert_eq!(nota.nota.numero, 1);
        assert_eq!(nota.nota.estado, NotaVentaEstado::Pendiente);
        assert_eq!(nota.nota.cotizacion_numero, Some(1));
        assert_eq!(nota.nota.cliente_nombre.as_deref(), Some("Constructora Andes"));
        assert_eq!(nota.items.len(), 2);

        let cot = db.cotizaciones().get_detalle(&cot_id).await.unwrap().unwrap();
        assert_eq!(cot.cotizacion.estado, CotizacionEstado::Aprobada);
        assert_eq!(nota.nota.total, cot.cotizacion.total);
        assert_ne!(nota.items[0].id, cot.items[0].id);
    }

    #[tokio::test]
    async fn test_create_rejects_converted_and_annulled_quotes() {
        let db = db().await;
        let (cot_id, _) = quote_with_stock(&db, 100.0, 1.0).await;
        let repo = db.notas_venta();

        let nota = repo.create_from_quote(&from(&cot_id)).await.unwrap();
        let err = repo.create_from_quote(&from(&cot_id)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::QuoteAlreadyConverted { .. })));

        // Once the note is annulled the quote can be converted again
        repo.anular(&nota.nota.id).await.unwrap();
        let again = repo.create_from_quote(&from(&cot_id)).await.unwrap();
        assert_eq!(again.nota.numero, 2);

        db.cotizaciones().anular(&cot_id).await.unwrap();
        repo.anular(&again.nota.id).await.unwrap();
        let err = repo.create_from_quote(&from(&cot_id)).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::QuoteNotConvertible { .. })));

        let err = repo.create_from_quote(&from("missing")).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_confirm_takes_stock_and_annul_restores() {
        let db = db().await;
        let (cot_id, producto_id) = quote_with_stock(&db, 20.0, 8.0).await;
        let repo = db.notas_venta();
        let nota = repo.create_from_quote(&from(&cot_id)).await.unwrap();

        repo.set_estado(&nota.nota.id, NotaVentaEstado::Confirmada).await.unwrap();
        assert_eq!(stock_of(&db, &producto_id).await, 12.0);

        // confirmada → despachada does not move stock again
        repo.set_estado(&nota.nota.id, NotaVentaEstado::Despachada).await.unwrap();
        assert_eq!(stock_of(&db, &producto_id).await, 12.0);

        let anulada = repo.anular(&nota.nota.id).await.unwrap();
        assert_eq!(anulada.nota.estado, NotaVentaEstado::Anulada);
        assert_eq!(stock_of(&db, &producto_id).await, 20.0);

        let err = repo
            .set_estado(&nota.nota.id, NotaVentaEstado::Confirmada)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_confirm_without_stock_is_atomic() {
        let db = db().await;
        let (cot_id, producto_id) = quote_with_stock(&db, 3.0, 8.0).await;
        let repo = db.notas_venta();
        let nota = repo.create_from_quote(&from(&cot_id)).await.unwrap();

        let err = repo
            .set_estado(&nota.nota.id, NotaVentaEstado::Confirmada)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));

        let nota = repo.get_by_id(&nota.nota.id).await.unwrap().unwrap();
        assert_eq!(nota.estado, NotaVentaEstado::Pendiente);
        let p = db.productos().get_by_id(&producto_id).await.unwrap().unwrap();
        assert_eq!(p.stock_actual, 3.0);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = db().await;
        let (cot_id, _) = quote_with_stock(&db, 100.0, 1.0).await;
        let repo = db.notas_venta();
        let nota = repo.create_from_quote(&from(&cot_id)).await.unwrap();
        repo.set_estado(&nota.nota.id, NotaVentaEstado::Confirmada).await.unwrap();

        let confirmadas = repo
            .list(&NotaVentaFilter {
                base: ListFilter {
                    estado: Some("confirmada".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(confirmadas.len(), 1);

        let por_cotizacion = repo
            .list(&NotaVentaFilter {
                cotizacion_id: Some("otra".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(por_cotizacion.is_empty());
    }
}
