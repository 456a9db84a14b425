//! # Formatting
//!
//! es-CL display formatting for documents, the chart and CSV-like exports.
//!
//! | value                 | output                    |
//! |-----------------------|---------------------------|
//! | `Money(1234567)`      | `$1.234.567`              |
//! | `2026-10-15`          | `15/10/2026`              |
//! | `2026-10-15` (larga)  | `15 de octubre de 2026`   |
//! | `2.5`                 | `2,5`                     |
//! | cotización 123        | `COT-000123`              |
//! | nota de venta 45      | `NV-000045`               |

use chrono::{Datelike, Local, NaiveDate};

use crate::money::Money;

const MESES: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

const MESES_CORTOS: [&str; 12] = [
    "ene", "feb", "mar", "abr", "may", "jun", "jul", "ago", "sep", "oct", "nov", "dic",
];

/// Current business date (server local time).
pub fn hoy() -> NaiveDate {
    Local::now().date_naive()
}

/// Groups digits in threes with `.`: `1234567` → `1.234.567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// Formats pesos: `$1.234.567`, negatives as `-$1.234`.
///
/// ## Example
/// ```rust
/// use cotiza_core::format::format_clp;
/// use cotiza_core::Money;
///
/// assert_eq!(format_clp(Money::from_pesos(1_234_567)), "$1.234.567");
/// assert_eq!(format_clp(Money::from_pesos(-1_234)), "-$1.234");
/// ```
pub fn format_clp(amount: Money) -> String {
    let sign = if amount.is_negative() { "-" } else { "" };
    format!("{}${}", sign, group_thousands(amount.pesos().unsigned_abs()))
}

/// `dd/mm/yyyy`.
pub fn format_fecha(fecha: NaiveDate) -> String {
    fecha.format("%d/%m/%Y").to_string()
}

/// `15 de octubre de 2026`.
pub fn format_fecha_larga(fecha: NaiveDate) -> String {
    format!(
        "{} de {} de {}",
        fecha.day(),
        MESES[fecha.month0() as usize],
        fecha.year()
    )
}

/// Short month label for chart axes: `oct 2026`.
pub fn format_mes_corto(year: i32, month: u32) -> String {
    let idx = (month.clamp(1, 12) - 1) as usize;
    format!("{} {}", MESES_CORTOS[idx], year)
}

/// Formats a quantity with a comma decimal separator, at most two decimals
/// and trailing zeros trimmed: `2.5` → `2,5`, `1234.0` → `1.234`.
pub fn format_cantidad(cantidad: f64) -> String {
    if !cantidad.is_finite() {
        return "0".to_string();
    }

    let rounded = format!("{:.2}", cantidad.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let frac = frac_part.trim_end_matches('0');
    let int_value: u64 = int_part.parse().unwrap_or(0);

    let is_zero = int_value == 0 && frac.is_empty();
    let sign = if cantidad < 0.0 && !is_zero { "-" } else { "" };

    if frac.is_empty() {
        format!("{}{}", sign, group_thousands(int_value))
    } else {
        format!("{}{},{}", sign, group_thousands(int_value), frac)
    }
}

/// Formats a percentage with one decimal: `12.5` → `12,5%`.
pub fn format_porcentaje(pct: f64) -> String {
    format!("{:.1}%", pct).replace('.', ",")
}

/// `COT-000123`.
pub fn format_numero_cotizacion(numero: i64) -> String {
    format!("COT-{:06}", numero)
}

/// `NV-000045`.
pub fn format_numero_nota(numero: i64) -> String {
    format!("NV-{:06}", numero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_hoy_is_local_date() {
        let before = Local::now().date_naive();
        let today = hoy();
        let after = Local::now().date_naive();
        assert!(before <= today && today <= after);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1.000");
        assert_eq!(group_thousands(1_234_567), "1.234.567");
    }

    #[test]
    fn test_format_clp() {
        assert_eq!(format_clp(Money::zero()), "$0");
        assert_eq!(format_clp(Money::from_pesos(119_000)), "$119.000");
        assert_eq!(format_clp(Money::from_pesos(-1_234)), "-$1.234");
    }

    #[test]
    fn test_format_fechas() {
        assert_eq!(format_fecha(date(2026, 3, 5)), "05/03/2026");
        assert_eq!(format_fecha_larga(date(2026, 10, 15)), "15 de octubre de 2026");
        assert_eq!(format_mes_corto(2026, 1), "ene 2026");
    }

    #[test]
    fn test_format_cantidad() {
        assert_eq!(format_cantidad(2.5), "2,5");
        assert_eq!(format_cantidad(3.0), "3");
        assert_eq!(format_cantidad(0.126), "0,13");
        assert_eq!(format_cantidad(1234.75), "1.234,75");
        assert_eq!(format_cantidad(-2.5), "-2,5");
        assert_eq!(format_cantidad(-0.001), "0");
    }

    #[test]
    fn test_format_numeros() {
        assert_eq!(format_numero_cotizacion(123), "COT-000123");
        assert_eq!(format_numero_nota(45), "NV-000045");
        assert_eq!(format_porcentaje(12.5), "12,5%");
    }
}
