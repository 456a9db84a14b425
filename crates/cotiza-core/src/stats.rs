//! # Dashboard Aggregation
//!
//! Turns row summaries loaded by `cotiza-db` into the figures shown on the
//! dashboard cards and chart.
//!
//! Annulled quotes are soft-deleted rows: they are reported in the per-status
//! breakdown but excluded from every other figure.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::chart::{monthly_buckets, ChartEntry, MonthBucket, DEFAULT_MONTHS};
use crate::money::Money;
use crate::types::CotizacionEstado;

/// Minimal projection of a quote row.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct QuoteSummary {
    pub estado: CotizacionEstado,
    pub fecha: NaiveDate,
    pub total: Money,
}

/// Everything [`DashboardStats::compute`] needs.
#[derive(Debug, Clone, Default)]
pub struct DashboardInput {
    pub clientes_activos: i64,
    pub obras_activas: i64,
    pub cotizaciones: Vec<QuoteSummary>,
    pub notas_venta: i64,
    pub monto_notas_venta: Money,
    pub productos_bajo_stock: i64,
    /// Current date; the monthly series ends with this month.
    pub hoy: Option<NaiveDate>,
}

/// Count of quotes in one status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EstadoCount {
    pub estado: CotizacionEstado,
    pub cantidad: i64,
}

/// Response body of `GET /api/dashboard/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardStats {
    pub clientes_activos: i64,
    pub obras_activas: i64,
    /// Quotes excluding annulled ones.
    pub total_cotizaciones: i64,
    pub cotizaciones_por_estado: Vec<EstadoCount>,
    pub monto_cotizado: Money,
    pub monto_aprobado: Money,
    /// `aprobadas / total_cotizaciones × 100`, one decimal.
    pub tasa_conversion: f64,
    pub notas_venta: i64,
    pub monto_notas_venta: Money,
    pub productos_bajo_stock: i64,
    pub serie_mensual: Vec<MonthBucket>,
}

impl DashboardStats {
    pub fn compute(input: &DashboardInput) -> DashboardStats {
        let vigentes: Vec<&QuoteSummary> = input
            .cotizaciones
            .iter()
            .filter(|q| q.estado != CotizacionEstado::Anulada)
            .collect();

        let cotizaciones_por_estado = CotizacionEstado::ALL
            .iter()
            .map(|estado| EstadoCount {
                estado: *estado,
                cantidad: input
                    .cotizaciones
                    .iter()
                    .filter(|q| q.estado == *estado)
                    .count() as i64,
            })
            .collect();

        let aprobadas: Vec<&&QuoteSummary> = vigentes
            .iter()
            .filter(|q| q.estado == CotizacionEstado::Aprobada)
            .collect();

        let total_cotizaciones = vigentes.len() as i64;
        let monto_cotizado: Money = vigentes.iter().map(|q| q.total).sum();
        let monto_aprobado: Money = aprobadas.iter().map(|q| q.total).sum();

        let serie_mensual = match input.hoy {
            Some(hoy) => {
                let entries: Vec<ChartEntry> = vigentes
                    .iter()
                    .map(|q| ChartEntry {
                        fecha: q.fecha,
                        total: q.total,
                    })
                    .collect();
                monthly_buckets(&entries, hoy, DEFAULT_MONTHS)
            }
            None => Vec::new(),
        };

        DashboardStats {
            clientes_activos: input.clientes_activos,
            obras_activas: input.obras_activas,
            total_cotizaciones,
            cotizaciones_por_estado,
            monto_cotizado,
            monto_aprobado,
            tasa_conversion: conversion_rate(aprobadas.len() as i64, total_cotizaciones),
            notas_venta: input.notas_venta,
            monto_notas_venta: input.monto_notas_venta,
            productos_bajo_stock: input.productos_bajo_stock,
            serie_mensual,
        }
    }
}

/// Percentage with one decimal; 0 when there are no quotes.
pub fn conversion_rate(aprobadas: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let pct = aprobadas as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}
