//! # Quote Totals
//!
//! Server-side computation of the money block printed at the bottom of every
//! quote and sales note.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  Subtotal      Σ round(cantidad × precio)     │
//! │  Descuento     round(subtotal × pct / 100)    │
//! │  Neto          subtotal − descuento           │
//! │  IVA 19%       round(neto × 0,19)             │
//! │  ───────────────────────────────────────────  │
//! │  Total         subtotal − descuento + IVA     │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Totals sent by a client are ignored; repositories always store the result
//! of [`QuoteTotals::compute`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{ItemDocumento, NuevoItem};
use crate::IVA;

/// The five money figures of a quote or sales note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuoteTotals {
    pub subtotal: Money,
    pub descuento: Money,
    pub neto: Money,
    pub iva: Money,
    pub total: Money,
}

impl QuoteTotals {
    /// Computes totals from line subtotals and a discount percentage.
    ///
    /// `descuento_porcentaje` is a percentage (5.5 = 5,5%) and is applied with
    /// two-decimal precision.
    pub fn compute<I>(line_subtotals: I, descuento_porcentaje: f64) -> QuoteTotals
    where
        I: IntoIterator<Item = Money>,
    {
        let subtotal: Money = line_subtotals.into_iter().sum();
        let bps = discount_bps(descuento_porcentaje);
        let descuento = subtotal.percentage(bps);
        let neto = subtotal - descuento;
        let iva = neto.calculate_tax(IVA);

        QuoteTotals {
            subtotal,
            descuento,
            neto,
            iva,
            total: subtotal - descuento + iva,
        }
    }

    /// Totals for items as sent by the quote form.
    pub fn from_new_items(items: &[NuevoItem], descuento_porcentaje: f64) -> QuoteTotals {
        Self::compute(items.iter().map(NuevoItem::subtotal), descuento_porcentaje)
    }

    /// Totals for stored items (subtotals recomputed, not trusted).
    pub fn from_items(items: &[ItemDocumento], descuento_porcentaje: f64) -> QuoteTotals {
        Self::compute(
            items
                .iter()
                .map(|item| item.precio_unitario.line_total(item.cantidad)),
            descuento_porcentaje,
        )
    }

    /// Checks the arithmetic relations between the five figures.
    pub fn is_consistent(&self) -> bool {
        self.neto == self.subtotal - self.descuento
            && self.iva == self.neto.calculate_tax(IVA)
            && self.total == self.subtotal - self.descuento + self.iva
    }
}

/// Percentage → basis points, clamped to 0..=100%.
fn discount_bps(pct: f64) -> u32 {
    if !pct.is_finite() {
        return 0;
    }
    (pct.clamp(0.0, 100.0) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(cantidad: f64, precio: i64) -> NuevoItem {
        NuevoItem {
            descripcion: "Item".to_string(),
            cantidad,
            precio_unitario: Money::from_pesos(precio),
            ..Default::default()
        }
    }

    #[test]
    fn test_totals_without_discount() {
        let totals = QuoteTotals::from_new_items(&[item(2.0, 50_000)], 0.0);

        assert_eq!(totals.subtotal.pesos(), 100_000);
        assert_eq!(totals.descuento.pesos(), 0);
        assert_eq!(totals.neto.pesos(), 100_000);
        assert_eq!(totals.iva.pesos(), 19_000);
        assert_eq!(totals.total.pesos(), 119_000);
    }

    #[test]
    fn test_totals_with_discount() {
        // 200.000 - 10% = 180.000; IVA 34.200; total 214.200
        let totals = QuoteTotals::from_new_items(&[item(4.0, 50_000)], 10.0);

        assert_eq!(totals.descuento.pesos(), 20_000);
        assert_eq!(totals.neto.pesos(), 180_000);
        assert_eq!(totals.iva.pesos(), 34_200);
        assert_eq!(totals.total.pesos(), 214_200);
        assert!(totals.is_consistent());
    }

    #[test]
    fn test_totals_round_each_line() {
        // 2,5 × 41.990 = 104.975 ; 0,333 × 333 = 110,889 → 111
        let totals = QuoteTotals::from_new_items(&[item(2.5, 41_990), item(0.333, 333)], 0.0);

        assert_eq!(totals.subtotal.pesos(), 105_086);
        // 105.086 × 0,19 = 19.966,34 → 19.966
        assert_eq!(totals.iva.pesos(), 19_966);
        assert_eq!(totals.total.pesos(), 125_052);
    }

    #[test]
    fn test_fractional_discount() {
        let totals = QuoteTotals::from_new_items(&[item(1.0, 200_000)], 5.5);
        assert_eq!(totals.descuento.pesos(), 11_000);
        assert!(totals.is_consistent());
    }

    #[test]
    fn test_discount_clamped() {
        let totals = QuoteTotals::from_new_items(&[item(1.0, 1_000)], 150.0);
        assert_eq!(totals.neto.pesos(), 0);
        assert_eq!(totals.total.pesos(), 0);
    }

    #[test]
    fn test_empty_items() {
        let totals = QuoteTotals::from_new_items(&[], 0.0);
        assert_eq!(totals, QuoteTotals::default());
    }

    #[test]
    fn test_from_items_ignores_stored_subtotal() {
        let mut stored = item(3.0, 1_000).into_item(1);
        stored.subtotal = Money::from_pesos(1);

        let totals = QuoteTotals::from_items(&[stored], 0.0);
        assert_eq!(totals.subtotal.pesos(), 3_000);
    }
}
