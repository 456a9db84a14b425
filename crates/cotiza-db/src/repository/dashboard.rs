//! # Dashboard Repository
//!
//! Loads the row summaries that `cotiza_core::stats` aggregates. No figure is
//! computed in SQL beyond plain counts and sums.

use chrono::{Datelike, NaiveDate};
use sqlx::SqlitePool;
use tracing::debug;

use super::{ClienteRepository, ObraRepository, ProductoRepository};
use crate::error::DbResult;
use cotiza_core::chart::ChartEntry;
use cotiza_core::stats::{DashboardInput, QuoteSummary};
use cotiza_core::{CotizacionEstado, Money, NotaVentaEstado};

#[derive(Debug, Clone)]
pub struct DashboardRepository {
    pool: SqlitePool,
}

impl DashboardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DashboardRepository { pool }
    }

    /// Everything `DashboardStats::compute` needs, as of `hoy`.
    pub async fn load(&self, hoy: NaiveDate) -> DbResult<DashboardInput> {
        let clientes_activos = ClienteRepository::new(self.pool.clone()).count_active().await?;
        let obras_activas = ObraRepository::new(self.pool.clone()).count_active().await?;
        let productos_bajo_stock = ProductoRepository::new(self.pool.clone())
            .count_low_stock()
            .await?;

        let cotizaciones = sqlx::query_as::<_, QuoteSummary>(
            "SELECT estado, fecha, total FROM cotizaciones ORDER BY fecha, numero",
        )
        .fetch_all(&self.pool)
        .await?;

        let (notas_venta, monto_notas_venta): (i64, Money) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(total), 0) FROM notas_venta WHERE estado != ?1",
        )
        .bind(NotaVentaEstado::Anulada)
        .fetch_one(&self.pool)
        .await?;

        debug!(
            cotizaciones = cotizaciones.len(),
            notas_venta = notas_venta,
            "Dashboard input loaded"
        );

        Ok(DashboardInput {
            clientes_activos,
            obras_activas,
            cotizaciones,
            notas_venta,
            monto_notas_venta,
            productos_bajo_stock,
            hoy: Some(hoy),
        })
    }

    /// Non-annulled quotes dated within the `months` months ending with the
    /// month of `end`.
    pub async fn chart_entries(&self, end: NaiveDate, months: usize) -> DbResult<Vec<ChartEntry>> {
        let desde = window_start(end, months);

        let rows: Vec<(NaiveDate, Money)> = sqlx::query_as(
            "SELECT fecha, total FROM cotizaciones WHERE estado != ?1 AND fecha >= ?2 ORDER BY fecha",
        )
        .bind(CotizacionEstado::Anulada)
        .bind(desde)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(fecha, total)| ChartEntry { fecha, total })
            .collect())
    }
}

/// First day of the first month in the window.
fn window_start(end: NaiveDate, months: usize) -> NaiveDate {
    let index = end.year() as i64 * 12 + end.month0() as i64 - months.saturating_sub(1) as i64;
    NaiveDate::from_ymd_opt(index.div_euclid(12) as i32, index.rem_euclid(12) as u32 + 1, 1)
        .unwrap_or(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{cliente, cotizacion_para, db, item_de, producto};
    use cotiza_core::stats::DashboardStats;
    use cotiza_core::NuevaNotaVenta;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_start() {
        assert_eq!(window_start(date(2026, 10, 15), 12), date(2025, 11, 1));
        assert_eq!(window_start(date(2026, 3, 31), 3), date(2026, 1, 1));
        assert_eq!(window_start(date(2026, 1, 5), 1), date(2026, 1, 1));
    }

    #[tokio::test]
    async fn test_load_and_compute() {
        let db = db().await;
        let c = cliente(&db, "12.345.678-5", "Andes").await;
        let p = producto(&db, "A-1", 1_000, 2.0).await;
        let repo = db.cotizaciones();

        let mut ids = Vec::new();
        for mes in [8, 9, 10] {
            let mut form = cotizacion_para(&c, vec![item_de(&p, 1.0)]);
            form.fecha = Some(date(2026, mes, 1));
            form.validez_dias = Some(365);
            ids.push(repo.create(&form).await.unwrap().cotizacion.id);
        }
        db.notas_venta()
            .create_from_quote(&NuevaNotaVenta {
                cotizacion_id: ids[0].clone(),
                observaciones: None,
            })
            .await
            .unwrap();
        repo.anular(&ids[2]).await.unwrap();

        let input = db.dashboard().load(date(2026, 10, 15)).await.unwrap();
        assert_eq!(input.clientes_activos, 1);
        assert_eq!(input.cotizaciones.len(), 3);
        assert_eq!(input.notas_venta, 1);
        assert_eq!(input.monto_notas_venta, Money::from_pesos(1_190));
        assert_eq!(input.productos_bajo_stock, 1);

        let stats = DashboardStats::compute(&input);
        assert_eq!(stats.total_cotizaciones, 2);
        assert_eq!(stats.monto_cotizado, Money::from_pesos(2_380));
        assert_eq!(stats.monto_aprobado, Money::from_pesos(1_190));
        assert_eq!(stats.tasa_conversion, 50.0);
        assert_eq!(stats.serie_mensual.len(), 12);

        let entries = db
            .dashboard()
            .chart_entries(date(2026, 10, 15), 2)
            .await
            .unwrap();
        // August is outside the window; October's quote was annulled
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].fecha, date(2026, 9, 1));
    }
}
