//! # Dashboard Endpoints
//!
//! ```text
//! GET /api/dashboard/stats                       counters + monthly series
//! GET /api/dashboard/chart?months&metric&width&height      image/svg+xml
//! GET /api/dashboard/chart/point?x&y[&radius]    point under the pointer
//! ```
//!
//! `chart/point` recomputes the same geometry the SVG was drawn with, so the
//! client only needs to send the pointer position in chart coordinates.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderName;
use serde::Deserialize;

use cotiza_core::chart::{
    hit_test, monthly_buckets, plot_points, render_svg, ChartArea, ChartMetric, MonthBucket,
    PlotPoint, DEFAULT_MONTHS, HIT_RADIUS,
};
use cotiza_core::format::hoy;
use cotiza_core::stats::DashboardStats;

use crate::error::{ApiError, ApiResult};
use crate::extract::Query;
use crate::response::ApiResponse;
use crate::AppState;

/// Longest window the chart accepts.
pub const MAX_MONTHS: usize = 36;

/// Chart window and canvas.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartQuery {
    pub months: Option<usize>,
    /// `monto` (default) or `cantidad`.
    pub metric: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl ChartQuery {
    fn months(&self) -> usize {
        self.months.unwrap_or(DEFAULT_MONTHS).clamp(1, MAX_MONTHS)
    }

    fn metric(&self) -> ApiResult<ChartMetric> {
        match self.metric.as_deref().map(str::trim) {
            None | Some("") => Ok(ChartMetric::default()),
            Some(other) => Ok(other.parse()?),
        }
    }

    fn area(&self) -> ApiResult<ChartArea> {
        let default = ChartArea::default();
        let area = ChartArea {
            width: self.width.unwrap_or(default.width),
            height: self.height.unwrap_or(default.height),
            ..default
        };
        if !(area.plot_width() > 0.0 && area.plot_height() > 0.0) {
            return Err(ApiError::validation(format!(
                "El gráfico necesita al menos {0}x{0} px",
                area.padding * 2.0 + 1.0
            )));
        }
        Ok(area)
    }
}

/// Pointer position plus the chart it refers to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PointQuery {
    pub x: f64,
    pub y: f64,
    pub radius: Option<f64>,
    pub months: Option<usize>,
    pub metric: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl PointQuery {
    fn chart(&self) -> ChartQuery {
        ChartQuery {
            months: self.months,
            metric: self.metric.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse<DashboardStats>> {
    let input = state.db.dashboard().load(hoy()).await?;
    Ok(ApiResponse::ok(DashboardStats::compute(&input)))
}

/// `GET /api/dashboard/chart`: the monthly quotes chart as SVG.
pub async fn chart(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChartQuery>,
) -> ApiResult<([(HeaderName, String); 1], String)> {
    let metric = query.metric()?;
    let area = query.area()?;
    let buckets = load_buckets(&state, query.months()).await?;

    let svg = render_svg(&buckets, &area, metric);
    Ok(([(CONTENT_TYPE, "image/svg+xml; charset=utf-8".to_string())], svg))
}

/// `GET /api/dashboard/chart/point`: the month under `(x, y)`, if any.
pub async fn chart_point(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PointQuery>,
) -> ApiResult<ApiResponse<Option<PlotPoint>>> {
    let chart = query.chart();
    let metric = chart.metric()?;
    let area = chart.area()?;
    let radius = query.radius.filter(|r| *r > 0.0).unwrap_or(HIT_RADIUS);

    let buckets = load_buckets(&state, chart.months()).await?;
    let points = plot_points(&buckets, &area, metric);

    let hit = hit_test(&points, query.x, query.y, radius)
        .and_then(|index| points.into_iter().find(|p| p.index == index));
    Ok(ApiResponse::ok(hit))
}

async fn load_buckets(state: &AppState, months: usize) -> ApiResult<Vec<MonthBucket>> {
    let end = hoy();
    let entries = state.db.dashboard().chart_entries(end, months).await?;
    Ok(monthly_buckets(&entries, end, months))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use axum::http::StatusCode;
    use cotiza_core::{ActualizarCotizacion, CotizacionEstado, Money, NuevaCotizacion, NuevoItem};

    async fn quote(state: &AppState, cliente_id: &str, pesos: i64) -> String {
        let detalle = state
            .db
            .cotizaciones()
            .create(&NuevaCotizacion {
                cliente_id: cliente_id.to_string(),
                fecha: Some(hoy()),
                items: vec![NuevoItem {
                    descripcion: "Servicio".to_string(),
                    cantidad: 1.0,
                    precio_unitario: Money::from_pesos(pesos),
                    ..Default::default()
                }],
                ..Default::default()
            })
            .await
            .unwrap();
        detalle.cotizacion.id
    }

    #[tokio::test]
    async fn test_stats() {
        let state = test_support::state().await;
        let cliente = test_support::cliente(&state, "76.086.428-5").await;
        test_support::producto(&state, "YES-15", 8_990, 2.0).await;

        let a = quote(&state, &cliente.id, 10_000).await;
        quote(&state, &cliente.id, 20_000).await;
        let anulada = quote(&state, &cliente.id, 99_000).await;

        let repo = state.db.cotizaciones();
        repo.update(
            &a,
            &ActualizarCotizacion {
                estado: Some(CotizacionEstado::Aprobada),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        repo.anular(&anulada).await.unwrap();

        let response = stats(State(state)).await.unwrap();
        let stats = response.data.unwrap();
        assert_eq!(stats.clientes_activos, 1);
        assert_eq!(stats.total_cotizaciones, 2);
        assert_eq!(stats.monto_cotizado, Money::from_pesos(35_700));
        assert_eq!(stats.monto_aprobado, Money::from_pesos(11_900));
        assert_eq!(stats.tasa_conversion, 50.0);
        assert_eq!(stats.productos_bajo_stock, 1);
        assert_eq!(stats.serie_mensual.len(), DEFAULT_MONTHS);
    }

    #[tokio::test]
    async fn test_chart_svg() {
        let state = test_support::state().await;
        let cliente = test_support::cliente(&state, "76.086.428-5").await;
        quote(&state, &cliente.id, 10_000).await;

        let ([(name, content_type)], svg) = chart(
            State(state.clone()),
            Query(ChartQuery {
                months: Some(6),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(name, CONTENT_TYPE);
        assert!(content_type.starts_with("image/svg+xml"));
        assert!(svg.starts_with("<svg"));

        let err = chart(
            State(state.clone()),
            Query(ChartQuery {
                metric: Some("ganancia".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = chart(
            State(state),
            Query(ChartQuery {
                width: Some(50.0),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chart_point_hit_and_miss() {
        let state = test_support::state().await;
        let cliente = test_support::cliente(&state, "76.086.428-5").await;
        quote(&state, &cliente.id, 10_000).await;
        quote(&state, &cliente.id, 5_000).await;

        let query = ChartQuery {
            months: Some(3),
            metric: Some("cantidad".to_string()),
            ..Default::default()
        };
        let buckets = load_buckets(&state, query.months()).await.unwrap();
        let points = plot_points(&buckets, &query.area().unwrap(), ChartMetric::Cantidad);
        let current = points.last().unwrap().clone();
        assert_eq!(current.cantidad, 2);

        let response = chart_point(
            State(state.clone()),
            Query(PointQuery {
                x: current.x + 3.0,
                y: current.y - 3.0,
                months: Some(3),
                metric: Some("cantidad".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        let hit = response.data.unwrap().unwrap();
        assert_eq!(hit.index, current.index);
        assert_eq!(hit.cantidad, 2);

        let response = chart_point(
            State(state),
            Query(PointQuery {
                x: -100.0,
                y: -100.0,
                months: Some(3),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert!(response.data.unwrap().is_none());
    }

    #[test]
    fn test_months_are_clamped() {
        let query = ChartQuery {
            months: Some(0),
            ..Default::default()
        };
        assert_eq!(query.months(), 1);

        let query = ChartQuery {
            months: Some(120),
            ..Default::default()
        };
        assert_eq!(query.months(), MAX_MONTHS);
        assert_eq!(ChartQuery::default().months(), DEFAULT_MONTHS);
    }
}
