//! # Cotizacion Repository
//!
//! Quotes and their line items.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(form)                                                           │
//! │    │                                                                    │
//! │    ├── validate form + references (cliente, obra ∈ cliente, vendedor)   │
//! │    │                                                                    │
//! │    └── BEGIN                                                            │
//! │          ├── numero = MAX(numero) + 1                                   │
//! │          ├── totals = QuoteTotals::from_new_items(items, descuento %)   │
//! │          ├── INSERT cotizaciones                                        │
//! │          ├── INSERT cotizacion_items × n                                │
//! │        COMMIT                                                           │
//! │                                                                         │
//! │  Totals sent by the client are never trusted; they are recomputed      │
//! │  from the items on every write that touches items or the discount.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    delete_items, fetch_items, insert_items, merge_text, next_numero, push_page,
    push_search, Documento,
};
use crate::error::{DbError, DbResult};
use cotiza_core::format::hoy;
use cotiza_core::{
    ActualizarCotizacion, CoreError, Cotizacion, CotizacionDetalle, CotizacionEstado,
    ItemDocumento, ListFilter, NuevaCotizacion, NuevoItem, QuoteTotals, ValidationError,
    DEFAULT_VALIDEZ_DIAS,
};

pub(crate) const SELECT_COTIZACION: &str = r#"
    SELECT
        c.id, c.numero,
        c.cliente_id, cl.nombre_razon_social AS cliente_nombre, cl.rut AS cliente_rut,
        c.obra_id, o.nombre AS obra_nombre,
        c.vendedor_id, u.nombre AS vendedor_nombre,
        c.fecha, c.validez_dias, c.estado,
        c.subtotal, c.descuento_porcentaje, c.descuento, c.neto, c.iva, c.total,
        c.observaciones, c.created_at, c.updated_at
    FROM cotizaciones c
    LEFT JOIN clientes cl ON cl.id = c.cliente_id
    LEFT JOIN obras o ON o.id = c.obra_id
    LEFT JOIN usuarios u ON u.id = c.vendedor_id
"#;

/// List filter for quotes.
#[derive(Debug, Clone, Default)]
pub struct CotizacionFilter {
    pub base: ListFilter,
    pub cliente_id: Option<String>,
    pub obra_id: Option<String>,
    pub vendedor_id: Option<String>,
    /// Inclusive lower bound on `fecha`.
    pub desde: Option<NaiveDate>,
    /// Inclusive upper bound on `fecha`.
    pub hasta: Option<NaiveDate>,
}

/// Repository for quote operations.
#[derive(Debug, Clone)]
pub struct CotizacionRepository {
    pool: SqlitePool,
}

impl CotizacionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CotizacionRepository { pool }
    }

    /// Lists quote headers, highest number first.
    pub async fn list(&self, filter: &CotizacionFilter) -> DbResult<Vec<Cotizacion>> {
        let estado = filter.base.estado_as::<CotizacionEstado>()?;

        debug!(
            search = ?filter.base.search,
            estado = ?estado,
            cliente_id = ?filter.cliente_id,
            "Listing cotizaciones"
        );

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_COTIZACION);
        qb.push(" WHERE 1=1");

        if let Some(estado) = estado {
            qb.push(" AND c.estado = ").push_bind(estado);
        }
        for (column, value) in [
            ("c.cliente_id", &filter.cliente_id),
            ("c.obra_id", &filter.obra_id),
            ("c.vendedor_id", &filter.vendedor_id),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                qb.push(" AND ")
                    .push(column)
                    .push(" = ")
                    .push_bind(value.to_string());
            }
        }
        if let Some(desde) = filter.desde {
            qb.push(" AND c.fecha >= ").push_bind(desde);
        }
        if let Some(hasta) = filter.hasta {
            qb.push(" AND c.fecha <= ").push_bind(hasta);
        }
        push_search(
            &mut qb,
            &filter.base,
            &[
                "CAST(c.numero AS TEXT)",
                "cl.nombre_razon_social",
                "cl.rut",
                "o.nombre",
                "c.observaciones",
            ],
        );

        qb.push(" ORDER BY c.numero DESC");
        push_page(&mut qb, &filter.base);

        let cotizaciones = qb
            .build_query_as::<Cotizacion>()
            .fetch_all(&self.pool)
            .await?;
        Ok(cotizaciones)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Cotizacion>> {
        let mut conn = self.pool.acquire().await?;
        fetch_cotizacion(&mut conn, id).await
    }

    /// Header plus items.
    pub async fn get_detalle(&self, id: &str) -> DbResult<Option<CotizacionDetalle>> {
        let mut conn = self.pool.acquire().await?;
        let Some(cotizacion) = fetch_cotizacion(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = fetch_items(&mut conn, Documento::Cotizacion, id).await?;

        Ok(Some(CotizacionDetalle { cotizacion, items }))
    }

    pub async fn items(&self, id: &str) -> DbResult<Vec<ItemDocumento>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut conn, Documento::Cotizacion, id).await
    }

    /// Creates a quote with the next sequential number.
    pub async fn create(&self, form: &NuevaCotizacion) -> DbResult<CotizacionDetalle> {
        form.validate()?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let descuento_porcentaje = form.descuento_porcentaje.unwrap_or(0.0);
        let items: Vec<ItemDocumento> = numbered(&form.items);
        let totals = QuoteTotals::from_items(&items, descuento_porcentaje);

        let mut tx = self.pool.begin().await?;

        ensure_cliente(&mut tx, &form.cliente_id).await?;
        ensure_obra(&mut tx, form.obra_id.as_deref(), &form.cliente_id).await?;
        ensure_vendedor(&mut tx, form.vendedor_id.as_deref()).await?;

        let numero = next_numero(&mut tx, Documento::Cotizacion).await?;

        sqlx::query(
            r#"
            INSERT INTO cotizaciones (
                id, numero, cliente_id, obra_id, vendedor_id, fecha, validez_dias, estado,
                subtotal, descuento_porcentaje, descuento, neto, iva, total,
                observaciones, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
            "#,
        )
        .bind(&id)
        .bind(numero)
        .bind(&form.cliente_id)
        .bind(non_blank(&form.obra_id))
        .bind(non_blank(&form.vendedor_id))
        .bind(form.fecha.unwrap_or_else(hoy))
        .bind(form.validez_dias.unwrap_or(DEFAULT_VALIDEZ_DIAS))
        .bind(CotizacionEstado::Borrador)
        .bind(totals.subtotal)
        .bind(descuento_porcentaje)
        .bind(totals.descuento)
        .bind(totals.neto)
        .bind(totals.iva)
        .bind(totals.total)
        .bind(merge_text(None, &form.observaciones))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_items(&mut tx, Documento::Cotizacion, &id, &items).await?;

        tx.commit().await?;

        info!(
            id = %id,
            numero = numero,
            items = items.len(),
            total = totals.total.pesos(),
            "Cotizacion created"
        );

        self.get_detalle(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Cotizacion", &id))
    }

    /// Applies a partial update.
    ///
    /// Content (items, discount, project, seller, date, validity) can only
    /// change while the quote is open (`borrador`/`enviada`); status and
    /// observations can change at any time the lifecycle allows.
    pub async fn update(&self, id: &str, form: &ActualizarCotizacion) -> DbResult<CotizacionDetalle> {
        form.validate()?;

        let mut tx = self.pool.begin().await?;

        let current = fetch_cotizacion(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Cotizacion", id))?;

        let estado = form.estado.unwrap_or(current.estado);
        if !current.estado.can_transition_to(estado) {
            return Err(CoreError::InvalidTransition {
                documento: current.numero_formateado(),
                from: current.estado.to_string(),
                to: estado.to_string(),
            }
            .into());
        }

        let changes_content = form.changes_totals()
            || form.obra_id.is_some()
            || form.vendedor_id.is_some()
            || form.fecha.is_some()
            || form.validez_dias.is_some();
        if changes_content && !current.estado.is_open() {
            return Err(CoreError::DocumentLocked {
                documento: current.numero_formateado(),
                estado: current.estado.to_string(),
            }
            .into());
        }

        let obra_id = merge_text(current.obra_id.clone(), &form.obra_id);
        if form.obra_id.is_some() {
            ensure_obra(&mut tx, obra_id.as_deref(), &current.cliente_id).await?;
        }
        let vendedor_id = merge_text(current.vendedor_id.clone(), &form.vendedor_id);
        if form.vendedor_id.is_some() {
            ensure_vendedor(&mut tx, vendedor_id.as_deref()).await?;
        }

        let descuento_porcentaje = form
            .descuento_porcentaje
            .unwrap_or(current.descuento_porcentaje);
        let totals = match &form.items {
            Some(nuevos) => {
                let items = numbered(nuevos);
                delete_items(&mut tx, Documento::Cotizacion, id).await?;
                insert_items(&mut tx, Documento::Cotizacion, id, &items).await?;
                QuoteTotals::from_items(&items, descuento_porcentaje)
            }
            None if form.changes_totals() => {
                let items = fetch_items(&mut tx, Documento::Cotizacion, id).await?;
                QuoteTotals::from_items(&items, descuento_porcentaje)
            }
            None => current.totales(),
        };

        sqlx::query(
            r#"
            UPDATE cotizaciones SET
                obra_id = ?2, vendedor_id = ?3, fecha = ?4, validez_dias = ?5, estado = ?6,
                subtotal = ?7, descuento_porcentaje = ?8, descuento = ?9, neto = ?10,
                iva = ?11, total = ?12, observaciones = ?13, updated_at = ?14
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&obra_id)
        .bind(&vendedor_id)
        .bind(form.fecha.unwrap_or(current.fecha))
        .bind(form.validez_dias.unwrap_or(current.validez_dias))
        .bind(estado)
        .bind(totals.subtotal)
        .bind(descuento_porcentaje)
        .bind(totals.descuento)
        .bind(totals.neto)
        .bind(totals.iva)
        .bind(totals.total)
        .bind(merge_text(current.observaciones.clone(), &form.observaciones))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            id = %id,
            estado = %estado,
            items_replaced = form.items.is_some(),
            total = totals.total.pesos(),
            "Cotizacion updated"
        );

        self.get_detalle(id)
            .await?
            .ok_or_else(|| DbError::not_found("Cotizacion", id))
    }

    pub async fn set_estado(&self, id: &str, estado: CotizacionEstado) -> DbResult<CotizacionDetalle> {
        self.update(
            id,
            &ActualizarCotizacion {
                estado: Some(estado),
                ..Default::default()
            },
        )
        .await
    }

    /// Soft delete: `estado = anulada`.
    pub async fn anular(&self, id: &str) -> DbResult<CotizacionDetalle> {
        self.set_estado(id, CotizacionEstado::Anulada).await
    }

    /// Marks open quotes whose validity ended before `hoy` as `vencida`.
    /// Returns how many quotes changed.
    pub async fn expire_overdue(&self, hoy: NaiveDate) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE cotizaciones SET estado = ?1, updated_at = ?2
            WHERE estado IN (?3, ?4)
              AND date(fecha, '+' || validez_dias || ' days') < ?5
            "#,
        )
        .bind(CotizacionEstado::Vencida)
        .bind(Utc::now())
        .bind(CotizacionEstado::Borrador)
        .bind(CotizacionEstado::Enviada)
        .bind(hoy)
        .execute(&self.pool)
        .await?;

        let expired = result.rows_affected();
        if expired > 0 {
            info!(expired = expired, hoy = %hoy, "Expired overdue cotizaciones");
        }

        Ok(expired)
    }
}

/// Loads one quote header on an open connection/transaction.
pub(crate) async fn fetch_cotizacion(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Cotizacion>> {
    let cotizacion = sqlx::query_as::<_, Cotizacion>(&format!("{} WHERE c.id = ?1", SELECT_COTIZACION))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(cotizacion)
}

/// Builds stored items numbered from 1.
fn numbered(items: &[NuevoItem]) -> Vec<ItemDocumento> {
    items
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, item)| item.into_item(i as i64 + 1))
        .collect()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn ensure_cliente(conn: &mut SqliteConnection, cliente_id: &str) -> DbResult<()> {
    let found: Option<String> = sqlx::query_scalar("SELECT id FROM clientes WHERE id = ?1")
        .bind(cliente_id)
        .fetch_optional(&mut *conn)
        .await?;

    found
        .map(|_| ())
        .ok_or_else(|| DbError::not_found("Cliente", cliente_id))
}

/// The project, when given, must exist and belong to the quote's client.
async fn ensure_obra(conn: &mut SqliteConnection, obra_id: Option<&str>, cliente_id: &str) -> DbResult<()> {
    let Some(obra_id) = obra_id.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(());
    };

    let owner: Option<String> = sqlx::query_scalar("SELECT cliente_id FROM obras WHERE id = ?1")
        .bind(obra_id)
        .fetch_optional(&mut *conn)
        .await?;

    match owner {
        None => Err(DbError::not_found("Obra", obra_id)),
        Some(owner) if owner != cliente_id => Err(ValidationError::invalid(
            "obra_id",
            "la obra no pertenece al cliente de la cotización",
        )
        .into()),
        Some(_) => Ok(()),
    }
}

async fn ensure_vendedor(conn: &mut SqliteConnection, vendedor_id: Option<&str>) -> DbResult<()> {
    let Some(vendedor_id) = vendedor_id.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(());
    };

    let found: Option<String> = sqlx::query_scalar("SELECT id FROM usuarios WHERE id = ?1")
        .bind(vendedor_id)
        .fetch_optional(&mut *conn)
        .await?;

    found
        .map(|_| ())
        .ok_or_else(|| DbError::not_found("Usuario", vendedor_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{cliente, cotizacion_para, db, item_de, producto};
    use cotiza_core::{Money, NuevaObra};

    #[tokio::test]
    async fn test_create_numbers_and_totals() {
        let db = db().await;
        let c = cliente(&db, "12.345.678-5", "Constructora Andes SpA").await;
        let cemento = producto(&db, "CEM-25", 5_990, 100.0).await;
        let fierro = producto(&db, "FIE-8", 1_250, 100.0).await;

        let mut form = cotizacion_para(&c, vec![item_de(&cemento, 10.0), item_de(&fierro, 4.0)]);
        form.descuento_porcentaje = Some(10.0);

        let first = db.cotizaciones().create(&form).await.unwrap();
        let second = db.cotizaciones().create(&form).await.unwrap();

        assert_eq!(first.cotizacion.numero, 1);
        assert_eq!(second.cotizacion.numero, 2);
        assert_eq!(first.cotizacion.cliente_nombre.as_deref(), Some("Constructora Andes SpA"));
        assert_eq!(first.cotizacion.estado, CotizacionEstado::Borrador);
        assert_eq!(first.cotizacion.validez_dias, DEFAULT_VALIDEZ_DIAS);

        // 59.900 + 5.000 = 64.900; -10% = 6.490; neto 58.410; iva 11.098
        let cot = &first.cotizacion;
        assert_eq!(cot.subtotal, Money::from_pesos(64_900));
        assert_eq!(cot.descuento, Money::from_pesos(6_490));
        assert_eq!(cot.neto, Money::from_pesos(58_410));
        assert_eq!(cot.iva, Money::from_pesos(11_098));
        assert_eq!(cot.total, Money::from_pesos(69_508));
        assert!(cot.totales().is_consistent());

        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].posicion, 1);
        assert_eq!(first.items[1].subtotal, Money::from_pesos(5_000));
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_obra() {
        let db = db().await;
        let a = cliente(&db, "12.345.678-5", "Andes").await;
        let b = cliente(&db, "11.111.111-1", "Sur").await;
        let p = producto(&db, "A-1", 100, 10.0).await;
        let obra_b = db
            .obras()
            .create(&NuevaObra {
                cliente_id: b.id.clone(),
                nombre: "Condominio Sur".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut form = cotizacion_para(&a, vec![item_de(&p, 1.0)]);
        form.obra_id = Some(obra_b.id.clone());

        let err = db.cotizaciones().create(&form).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));

        // Nothing was written, numbering is untouched
        let list = db.cotizaciones().list(&CotizacionFilter::default()).await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_create_requires_items_and_cliente() {
        let db = db().await;
        let c = cliente(&db, "12.345.678-5", "Andes").await;

        let err = db
            .cotizaciones()
            .create(&cotizacion_para(&c, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::EmptyDocument)));

        let p = producto(&db, "A-1", 100, 10.0).await;
        let mut form = cotizacion_para(&c, vec![item_de(&p, 1.0)]);
        form.cliente_id = "missing".to_string();
        let err = db.cotizaciones().create(&form).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_replaces_items_and_recomputes() {
        let db = db().await;
        let c = cliente(&db, "12.345.678-5", "Andes").await;
        let p = producto(&db, "A-1", 1_000, 10.0).await;
        let creada = db
            .cotizaciones()
            .create(&cotizacion_para(&c, vec![item_de(&p, 1.0), item_de(&p, 2.0)]))
            .await
            .unwrap();

        let updated = db
            .cotizaciones()
            .update(
                &creada.cotizacion.id,
                &ActualizarCotizacion {
                    items: Some(vec![item_de(&p, 5.0)]),
                    observaciones: Some("Entrega en obra".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.cotizacion.subtotal, Money::from_pesos(5_000));
        assert_eq!(updated.cotizacion.iva, Money::from_pesos(950));
        assert_eq!(updated.cotizacion.total, Money::from_pesos(5_950));
        assert_eq!(updated.cotizacion.observaciones.as_deref(), Some("Entrega en obra"));

        let discounted = db
            .cotizaciones()
            .update(
                &creada.cotizacion.id,
                &ActualizarCotizacion {
                    descuento_porcentaje: Some(20.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(discounted.cotizacion.descuento, Money::from_pesos(1_000));
        assert_eq!(discounted.cotizacion.neto, Money::from_pesos(4_000));
        assert_eq!(discounted.items.len(), 1);
    }

    #[tokio::test]
    async fn test_locked_and_transitions() {
        let db = db().await;
        let c = cliente(&db, "12.345.678-5", "Andes").await;
        let p = producto(&db, "A-1", 1_000, 10.0).await;
        let id = db
            .cotizaciones()
            .create(&cotizacion_para(&c, vec![item_de(&p, 1.0)]))
            .await
            .unwrap()
            .cotizacion
            .id;
        let repo = db.cotizaciones();

        repo.set_estado(&id, CotizacionEstado::Aprobada).await.unwrap();

        let locked = repo
            .update(
                &id,
                &ActualizarCotizacion {
                    items: Some(vec![item_de(&p, 3.0)]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(locked, DbError::Core(CoreError::DocumentLocked { .. })));

        // Observations stay editable
        repo.update(
            &id,
            &ActualizarCotizacion {
                observaciones: Some("Aprobada por teléfono".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let anulada = repo.anular(&id).await.unwrap();
        assert_eq!(anulada.cotizacion.estado, CotizacionEstado::Anulada);
        assert_eq!(anulada.items.len(), 1);

        let err = repo.set_estado(&id, CotizacionEstado::Borrador).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_expire_overdue() {
        let db = db().await;
        let c = cliente(&db, "12.345.678-5", "Andes").await;
        let p = producto(&db, "A-1", 1_000, 10.0).await;
        let repo = db.cotizaciones();

        let mut vieja = cotizacion_para(&c, vec![item_de(&p, 1.0)]);
        vieja.fecha = NaiveDate::from_ymd_opt(2026, 1, 1);
        vieja.validez_dias = Some(15);
        let vieja = repo.create(&vieja).await.unwrap().cotizacion;

        let mut aprobada = cotizacion_para(&c, vec![item_de(&p, 1.0)]);
        aprobada.fecha = NaiveDate::from_ymd_opt(2026, 1, 1);
        let aprobada = repo.create(&aprobada).await.unwrap().cotizacion;
        repo.set_estado(&aprobada.id, CotizacionEstado::Aprobada).await.unwrap();

        let mut vigente = cotizacion_para(&c, vec![item_de(&p, 1.0)]);
        vigente.fecha = NaiveDate::from_ymd_opt(2026, 1, 10);
        vigente.validez_dias = Some(30);
        let vigente = repo.create(&vigente).await.unwrap().cotizacion;

        // 2026-01-16 is the last valid day of the first quote
        let hoy = NaiveDate::from_ymd_opt(2026, 1, 16).unwrap();
        assert_eq!(repo.expire_overdue(hoy).await.unwrap(), 0);

        let hoy = NaiveDate::from_ymd_opt(2026, 1, 17).unwrap();
        assert_eq!(repo.expire_overdue(hoy).await.unwrap(), 1);

        let estado = |id: String| {
            let repo = repo.clone();
            async move { repo.get_by_id(&id).await.unwrap().unwrap().estado }
        };
        assert_eq!(estado(vieja.id).await, CotizacionEstado::Vencida);
        assert_eq!(estado(aprobada.id).await, CotizacionEstado::Aprobada);
        assert_eq!(estado(vigente.id).await, CotizacionEstado::Borrador);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = db().await;
        let a = cliente(&db, "12.345.678-5", "Constructora Andes").await;
        let b = cliente(&db, "11.111.111-1", "Ferretería Sur").await;
        let p = producto(&db, "A-1", 1_000, 10.0).await;
        let repo = db.cotizaciones();

        for c in [&a, &a, &b] {
            repo.create(&cotizacion_para(c, vec![item_de(&p, 1.0)])).await.unwrap();
        }

        let all = repo.list(&CotizacionFilter::default()).await.unwrap();
        assert_eq!(
            all.iter().map(|c| c.numero).collect::<Vec<_>>(),
            vec![3, 2, 1]
        );

        let de_a = repo
            .list(&CotizacionFilter {
                cliente_id: Some(a.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(de_a.len(), 2);

        let sur = repo
            .list(&CotizacionFilter {
                base: ListFilter {
                    search: Some("sur".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(sur.len(), 1);
        assert_eq!(sur[0].cliente_rut.as_deref(), Some("11111111-1"));

        let borradores = repo
            .list(&CotizacionFilter {
                base: ListFilter {
                    estado: Some("borrador".to_string()),
                    limit: Some(2),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(borradores.len(), 2);
    }
}
