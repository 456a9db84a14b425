//! # Monthly Activity Chart
//!
//! Geometry and SVG rendering for the dashboard's "quotes per month" chart.
//!
//! ## Pipeline
//! ```text
//! ┌──────────────┐   monthly_buckets   ┌──────────────┐   plot_points   ┌─────────────┐
//! │ (fecha,total)│ ──────────────────► │ MonthBucket  │ ──────────────► │  PlotPoint  │
//! │  raw rows    │  zero-filled, N mo. │ count, total │  canvas coords  │  x, y       │
//! └──────────────┘                     └──────────────┘                 └──────┬──────┘
//!                                                                              │
//!                  ┌───────────────────────┬───────────────────────────────────┤
//!                  ▼                       ▼                                   ▼
//!            grid_lines()            smooth_path()                       hit_test()
//!          "nice" y-axis ticks    Catmull-Rom → cubic bezier      nearest point within r
//!                  │                       │                                   │
//!                  └───────────┬───────────┘                                   ▼
//!                              ▼                                     tooltip for (x, y)
//!                        render_svg()
//! ```
//!
//! Coordinates are SVG user units: origin top-left, y grows downward. The
//! plot area is the canvas minus `padding` on every side.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::format::{format_clp, format_mes_corto, group_thousands};
use crate::money::Money;
use crate::pdf::escape_html;

/// Months shown on the dashboard chart.
pub const DEFAULT_MONTHS: usize = 12;

// =============================================================================
// Buckets
// =============================================================================

/// One dated amount (a quote) feeding the chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartEntry {
    pub fecha: NaiveDate,
    pub total: Money,
}

/// Aggregate for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthBucket {
    pub year: i32,
    /// 1..=12
    pub month: u32,
    /// `oct 2026`
    pub label: String,
    pub cantidad: u32,
    pub total: Money,
}

/// Counts and sums `entries` per month for the `months` months ending with
/// the month of `end`, oldest first. Months without entries are zero-filled
/// and entries outside the window are ignored.
pub fn monthly_buckets(entries: &[ChartEntry], end: NaiveDate, months: usize) -> Vec<MonthBucket> {
    let end_index = month_index(end.year(), end.month());
    let start_index = end_index - months as i64 + 1;

    let mut buckets: Vec<MonthBucket> = (start_index..=end_index)
        .map(|idx| {
            let (year, month) = from_month_index(idx);
            MonthBucket {
                year,
                month,
                label: format_mes_corto(year, month),
                cantidad: 0,
                total: Money::zero(),
            }
        })
        .collect();

    for entry in entries {
        let idx = month_index(entry.fecha.year(), entry.fecha.month());
        if idx < start_index || idx > end_index {
            continue;
        }
        let bucket = &mut buckets[(idx - start_index) as usize];
        bucket.cantidad += 1;
        bucket.total += entry.total;
    }

    buckets
}

fn month_index(year: i32, month: u32) -> i64 {
    year as i64 * 12 + (month as i64 - 1)
}

fn from_month_index(idx: i64) -> (i32, u32) {
    (idx.div_euclid(12) as i32, idx.rem_euclid(12) as u32 + 1)
}

// =============================================================================
// Geometry
// =============================================================================

/// Which bucket value the y axis plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ChartMetric {
    /// Sum of quote totals (pesos).
    #[default]
    Monto,
    /// Number of quotes.
    Cantidad,
}

impl ChartMetric {
    fn value(&self, bucket: &MonthBucket) -> f64 {
        match self {
            ChartMetric::Monto => bucket.total.pesos() as f64,
            ChartMetric::Cantidad => bucket.cantidad as f64,
        }
    }

    /// Axis/tooltip label for a value of this metric.
    pub fn label(&self, value: f64) -> String {
        match self {
            ChartMetric::Monto => format_clp(Money::from_pesos(value.round() as i64)),
            ChartMetric::Cantidad => group_thousands(value.max(0.0).round() as u64),
        }
    }
}

impl FromStr for ChartMetric {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "monto" => Ok(ChartMetric::Monto),
            "cantidad" => Ok(ChartMetric::Cantidad),
            _ => Err(ValidationError::NotAllowed {
                field: "metric".to_string(),
                allowed: vec!["monto".to_string(), "cantidad".to_string()],
            }),
        }
    }
}

/// Canvas size and inner padding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartArea {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for ChartArea {
    fn default() -> Self {
        ChartArea {
            width: 800.0,
            height: 300.0,
            padding: 48.0,
        }
    }
}

impl ChartArea {
    pub fn left(&self) -> f64 {
        self.padding
    }

    pub fn right(&self) -> f64 {
        self.width - self.padding
    }

    pub fn top(&self) -> f64 {
        self.padding
    }

    /// Baseline (y of value zero).
    pub fn bottom(&self) -> f64 {
        self.height - self.padding
    }

    pub fn plot_width(&self) -> f64 {
        (self.right() - self.left()).max(0.0)
    }

    pub fn plot_height(&self) -> f64 {
        (self.bottom() - self.top()).max(0.0)
    }

    /// Canvas y for `value` on an axis scaled to `max`.
    pub fn y_for(&self, value: f64, max: f64) -> f64 {
        if max <= 0.0 {
            return self.bottom();
        }
        self.bottom() - (value / max) * self.plot_height()
    }
}

/// A bucket mapped to canvas coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlotPoint {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub value: f64,
    pub cantidad: u32,
    pub total: Money,
}

/// Rounds `value` up to 1, 2, 5 or 10 times a power of ten.
///
/// Zero, negative and non-finite values give 0.
pub fn nice_max(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 0.0;
    }
    let magnitude = 10f64.powf(value.log10().floor());
    let normalized = value / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Largest plotted value of a series, rounded with [`nice_max`].
pub fn axis_max(buckets: &[MonthBucket], metric: ChartMetric) -> f64 {
    let max = buckets
        .iter()
        .map(|b| metric.value(b))
        .fold(0.0_f64, f64::max);
    nice_max(max)
}

/// Maps buckets to canvas points.
///
/// x is evenly spaced across the plot width (a single bucket sits in the
/// middle); y is scaled against [`axis_max`]. An all-zero series lies on the
/// baseline.
pub fn plot_points(buckets: &[MonthBucket], area: &ChartArea, metric: ChartMetric) -> Vec<PlotPoint> {
    let max = axis_max(buckets, metric);
    let n = buckets.len();

    buckets
        .iter()
        .enumerate()
        .map(|(index, bucket)| {
            let x = if n <= 1 {
                area.left() + area.plot_width() / 2.0
            } else {
                area.left() + area.plot_width() * index as f64 / (n - 1) as f64
            };
            let value = metric.value(bucket);
            PlotPoint {
                index,
                x,
                y: area.y_for(value, max),
                label: bucket.label.clone(),
                value,
                cantidad: bucket.cantidad,
                total: bucket.total,
            }
        })
        .collect()
}

/// A horizontal grid line.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLine {
    pub y: f64,
    pub value: f64,
    pub label: String,
}

/// `n` equal divisions from the baseline to `max` (n + 1 lines, bottom up).
///
/// With `max == 0` only the baseline is returned.
pub fn grid_lines(area: &ChartArea, max: f64, n: usize, metric: ChartMetric) -> Vec<GridLine> {
    if max <= 0.0 || n == 0 {
        return vec![GridLine {
            y: area.bottom(),
            value: 0.0,
            label: metric.label(0.0),
        }];
    }

    (0..=n)
        .map(|i| {
            let value = max * i as f64 / n as f64;
            GridLine {
                y: area.y_for(value, max),
                value,
                label: metric.label(value),
            }
        })
        .collect()
}

/// Converts points to a smooth SVG path through every point.
///
/// Each segment p1→p2 is a cubic bezier whose control points come from the
/// Catmull-Rom tangents: `c1 = p1 + (p2 - p0) / 6`, `c2 = p2 - (p3 - p1) / 6`,
/// with the end points duplicated at the ends. One point yields only `M`;
/// no points yield an empty string.
pub fn smooth_path(points: &[PlotPoint]) -> String {
    let Some(first) = points.first() else {
        return String::new();
    };

    let mut d = format!("M {:.2} {:.2}", first.x, first.y);
    let n = points.len();

    for i in 0..n.saturating_sub(1) {
        let p0 = &points[i.saturating_sub(1)];
        let p1 = &points[i];
        let p2 = &points[i + 1];
        let p3 = &points[(i + 2).min(n - 1)];

        let c1x = p1.x + (p2.x - p0.x) / 6.0;
        let c1y = p1.y + (p2.y - p0.y) / 6.0;
        let c2x = p2.x - (p3.x - p1.x) / 6.0;
        let c2y = p2.y - (p3.y - p1.y) / 6.0;

        let _ = write!(
            d,
            " C {:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}",
            c1x, c1y, c2x, c2y, p2.x, p2.y
        );
    }

    d
}

/// Index of the point nearest to `(x, y)` whose Euclidean distance is at
/// most `radius`.
pub fn hit_test(points: &[PlotPoint], x: f64, y: f64, radius: f64) -> Option<usize> {
    points
        .iter()
        .map(|p| (p.index, ((p.x - x).powi(2) + (p.y - y).powi(2)).sqrt()))
        .filter(|(_, dist)| *dist <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

// =============================================================================
// SVG
// =============================================================================

/// Radius of the drawn point markers.
pub const POINT_RADIUS: f64 = 4.0;

/// Radius used for tooltip hit-testing (larger than the marker).
pub const HIT_RADIUS: f64 = 12.0;

/// Renders the whole chart: grid with labels, curve, markers and a
/// `<title>` tooltip per marker.
pub fn render_svg(buckets: &[MonthBucket], area: &ChartArea, metric: ChartMetric) -> String {
    let max = axis_max(buckets, metric);
    let points = plot_points(buckets, area, metric);
    let mut svg = String::with_capacity(4 * 1024);

    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}" font-family="Arial, sans-serif" font-size="11">"#,
        w = area.width,
        h = area.height
    );

    svg.push_str("<g class=\"grid\">\n");
    for line in grid_lines(area, max, 4, metric) {
        let _ = writeln!(
            svg,
            r##"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="#e5e7eb"/><text x="{:.2}" y="{:.2}" text-anchor="end" fill="#6b7280">{}</text>"##,
            area.left(),
            line.y,
            area.right(),
            line.y,
            area.left() - 6.0,
            line.y + 4.0,
            escape_html(&line.label)
        );
    }
    svg.push_str("</g>\n");

    svg.push_str("<g class=\"x-labels\">\n");
    for p in &points {
        let _ = writeln!(
            svg,
            r##"<text x="{:.2}" y="{:.2}" text-anchor="middle" fill="#6b7280">{}</text>"##,
            p.x,
            area.bottom() + 18.0,
            escape_html(&p.label)
        );
    }
    svg.push_str("</g>\n");

    if points.len() > 1 {
        let _ = writeln!(
            svg,
            r##"<path class="curve" d="{}" fill="none" stroke="#2563eb" stroke-width="2"/>"##,
            smooth_path(&points)
        );
    }

    svg.push_str("<g class=\"points\">\n");
    for p in &points {
        let _ = writeln!(
            svg,
            r##"<circle cx="{:.2}" cy="{:.2}" r="{}" fill="#2563eb"><title>{}: {} cotizaciones, {}</title></circle>"##,
            p.x,
            p.y,
            POINT_RADIUS,
            escape_html(&p.label),
            p.cantidad,
            format_clp(p.total)
        );
    }
    svg.push_str("</g>\n</svg>\n");

    svg
}

// =============================================================================
// Unit Tests
// =============================================================================
