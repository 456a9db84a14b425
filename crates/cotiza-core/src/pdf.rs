//! # Quote PDF Layout
//!
//! Builds the HTML that the API rasterizes to PDF with a headless browser.
//! This module owns the layout policy (template choice, typography, page
//! capacity, truncation); the browser process lives in `apps/api`.
//!
//! ## Templates
//! ```text
//! ┌──────────────── Posicionada ───────────────┐  ┌──────────── Condensada ────────────┐
//! │ ░░░░ background image (letterhead) ░░░░░░ │  │ EMPRESA            COT-000123      │
//! │  [abs] empresa / cliente / obra / número   │  │ Cliente · Obra · Fecha · Validez   │
//! │  [abs] row 1 ─ top = 360px                 │  │ ┌────┬──────────────┬────┬──────┐  │
//! │  [abs] row 2 ─ top = 360px + row_height    │  │ │ #  │ Descripción  │Cant│ Total│  │
//! │   ...                                      │  │ │ .. │   44 rows max│    │      │  │
//! │  [abs] row 18                              │  │ └────┴──────────────┴────┴──────┘  │
//! │  [abs] totals block (fixed position)       │  │ Se omitieron N ítems               │
//! │                                            │  │ Subtotal / Desc. / Neto / IVA / $  │
//! └────────────────────────────────────────────┘  └────────────────────────────────────┘
//!        capacity 18 rows                                capacity 44 rows, one page
//! ```
//!
//! ## Typography
//! | items   | font  | row height |
//! |---------|-------|------------|
//! | 1..=15  | 10px  | 18px       |
//! | 16..=25 | 9px   | 15px       |
//! | 26..=35 | 8px   | 12.5px     |
//! | 36+     | 7px   | 10.5px     |
//!
//! Items beyond the template capacity are dropped and a single notice row
//! reports how many were omitted. Documents never spill onto a second page.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::format::{format_cantidad, format_clp, format_fecha, format_porcentaje};
use crate::types::{Cliente, Cotizacion, ItemDocumento};

// =============================================================================
// Layout Policy
// =============================================================================

/// Vertical offset of the first item row on the positioned template.
const POSICIONADA_ITEMS_TOP_PX: f32 = 360.0;

/// Vertical offset of the totals block on the positioned template.
const POSICIONADA_TOTALES_TOP_PX: f32 = 900.0;

/// Quote PDF template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Plantilla {
    /// Absolute-positioned fields over the letterhead background image.
    Posicionada,
    /// Single-page flowing table with smaller margins.
    Condensada,
}

impl Plantilla {
    /// Maximum number of item rows the template prints.
    pub const fn capacity(&self) -> usize {
        match self {
            Plantilla::Posicionada => 18,
            Plantilla::Condensada => 44,
        }
    }

    /// Picks the positioned template while the items fit on it.
    pub fn auto(n_items: usize) -> Plantilla {
        if n_items <= Plantilla::Posicionada.capacity() {
            Plantilla::Posicionada
        } else {
            Plantilla::Condensada
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Plantilla::Posicionada => "posicionada",
            Plantilla::Condensada => "condensada",
        }
    }
}

impl FromStr for Plantilla {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "posicionada" => Ok(Plantilla::Posicionada),
            "condensada" => Ok(Plantilla::Condensada),
            _ => Err(ValidationError::NotAllowed {
                field: "plantilla".to_string(),
                allowed: vec!["posicionada".to_string(), "condensada".to_string()],
            }),
        }
    }
}

/// Font size and row height for a given number of printed rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Typography {
    pub font_px: f32,
    pub row_px: f32,
}

/// Fixed item-count-to-typography table.
pub fn typography_for(n_items: usize) -> Typography {
    match n_items {
        0..=15 => Typography {
            font_px: 10.0,
            row_px: 18.0,
        },
        16..=25 => Typography {
            font_px: 9.0,
            row_px: 15.0,
        },
        26..=35 => Typography {
            font_px: 8.0,
            row_px: 12.5,
        },
        _ => Typography {
            font_px: 7.0,
            row_px: 10.5,
        },
    }
}

/// Splits `n_items` into printed rows and omitted rows for a capacity.
pub fn truncate_rows(n_items: usize, capacity: usize) -> (usize, usize) {
    let shown = n_items.min(capacity);
    (shown, n_items - shown)
}

/// Text of the omitted-items notice.
pub fn omitted_notice(omitidos: usize) -> String {
    if omitidos == 1 {
        "Se omitió 1 ítem".to_string()
    } else {
        format!("Se omitieron {} ítems", omitidos)
    }
}

// =============================================================================
// Document Input
// =============================================================================

/// Issuing company data printed on every quote header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmpresaInfo {
    pub nombre: String,
    pub rut: String,
    pub direccion: String,
    pub telefono: String,
    pub email: String,
}

/// Everything the templates read.
#[derive(Debug, Clone)]
pub struct QuoteDocument<'a> {
    pub empresa: &'a EmpresaInfo,
    pub cotizacion: &'a Cotizacion,
    pub items: &'a [ItemDocumento],
    /// Full client record for address/contact lines, when available.
    pub cliente: Option<&'a Cliente>,
}

/// Rendered HTML plus the layout decisions that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedHtml {
    pub html: String,
    pub plantilla: Plantilla,
    /// Item rows actually emitted.
    pub filas: usize,
    /// Items dropped because they did not fit.
    pub omitidos: usize,
}

// =============================================================================
// Rendering
// =============================================================================

/// Renders a quote with the given template.
///
/// `fondo_url` is the letterhead image for [`Plantilla::Posicionada`]; it is
/// ignored by the condensed template.
pub fn render_quote_html(
    doc: &QuoteDocument<'_>,
    plantilla: Plantilla,
    fondo_url: Option<&str>,
) -> RenderedHtml {
    let (filas, omitidos) = truncate_rows(doc.items.len(), plantilla.capacity());
    let typo = typography_for(filas);
    let rows = &doc.items[..filas];

    let html = match plantilla {
        Plantilla::Posicionada => render_posicionada(doc, rows, omitidos, typo, fondo_url),
        Plantilla::Condensada => render_condensada(doc, rows, omitidos, typo),
    };

    RenderedHtml {
        html,
        plantilla,
        filas,
        omitidos,
    }
}

fn render_posicionada(
    doc: &QuoteDocument<'_>,
    rows: &[ItemDocumento],
    omitidos: usize,
    typo: Typography,
    fondo_url: Option<&str>,
) -> String {
    let cot = doc.cotizacion;
    let mut html = String::with_capacity(8 * 1024);

    let fondo = fondo_url
        .map(|url| format!("background-image:url('{}');", escape_html(url)))
        .unwrap_or_default();

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="es"><head><meta charset="utf-8"><title>{numero}</title>
<style>
@page {{ size: A4; margin: 0; }}
body {{ margin: 0; font-family: Arial, Helvetica, sans-serif; }}
.page {{ position: relative; width: 794px; height: 1123px; overflow: hidden; background-size: 794px 1123px; background-repeat: no-repeat; {fondo} }}
.abs {{ position: absolute; white-space: nowrap; }}
.item {{ position: absolute; left: 40px; width: 714px; height: {row}px; line-height: {row}px; font-size: {font}px; }}
.item span {{ position: absolute; overflow: hidden; text-overflow: ellipsis; }}
.num {{ text-align: right; }}
</style></head><body><div class="page">
"#,
        numero = escape_html(&cot.numero_formateado()),
        fondo = fondo,
        row = typo.row_px,
        font = typo.font_px,
    );

    let _ = writeln!(
        html,
        r#"<div class="abs" style="top:40px;left:40px;font-size:14px;font-weight:bold">{}</div>"#,
        escape_html(&doc.empresa.nombre)
    );
    let _ = writeln!(
        html,
        r#"<div class="abs" style="top:60px;left:40px;font-size:10px">RUT {} · {} · {} · {}</div>"#,
        escape_html(&doc.empresa.rut),
        escape_html(&doc.empresa.direccion),
        escape_html(&doc.empresa.telefono),
        escape_html(&doc.empresa.email)
    );
    let _ = writeln!(
        html,
        r#"<div class="abs" style="top:40px;right:40px;font-size:16px;font-weight:bold">{}</div>"#,
        escape_html(&cot.numero_formateado())
    );

    let header = header_fields(doc);
    for (i, (label, value)) in header.iter().enumerate() {
        let _ = writeln!(
            html,
            r#"<div class="abs" style="top:{}px;left:40px;font-size:11px"><b>{}:</b> {}</div>"#,
            150 + i * 22,
            escape_html(label),
            escape_html(value)
        );
    }

    for (i, item) in rows.iter().enumerate() {
        let top = POSICIONADA_ITEMS_TOP_PX + i as f32 * typo.row_px;
        let _ = writeln!(
            html,
            r#"<div class="item" style="top:{top}px"><span style="left:0;width:30px">{pos}</span><span style="left:36px;width:380px">{desc}</span><span style="left:420px;width:50px">{unidad}</span><span class="num" style="left:474px;width:60px">{cant}</span><span class="num" style="left:540px;width:80px">{precio}</span><span class="num" style="left:624px;width:90px">{subtotal}</span></div>"#,
            top = top,
            pos = i + 1,
            desc = escape_html(&item.descripcion),
            unidad = escape_html(&item.unidad),
            cant = format_cantidad(item.cantidad),
            precio = format_clp(item.precio_unitario),
            subtotal = format_clp(item.subtotal),
        );
    }

    if omitidos > 0 {
        let top = POSICIONADA_ITEMS_TOP_PX + rows.len() as f32 * typo.row_px;
        let _ = writeln!(
            html,
            r#"<div class="abs omitidos" style="top:{}px;left:76px;font-size:{}px;font-style:italic">{}</div>"#,
            top,
            typo.font_px,
            omitted_notice(omitidos)
        );
    }

    for (i, (label, value)) in totals_lines(cot).iter().enumerate() {
        let _ = writeln!(
            html,
            r#"<div class="abs totales" style="top:{}px;right:40px;font-size:11px"><b>{}</b> {}</div>"#,
            POSICIONADA_TOTALES_TOP_PX + i as f32 * 20.0,
            escape_html(label),
            escape_html(value)
        );
    }

    if let Some(obs) = cot.observaciones.as_deref().filter(|o| !o.trim().is_empty()) {
        let _ = writeln!(
            html,
            r#"<div class="abs" style="top:{}px;left:40px;width:420px;white-space:normal;font-size:10px">{}</div>"#,
            POSICIONADA_TOTALES_TOP_PX,
            escape_html(obs)
        );
    }

    html.push_str("</div></body></html>\n");
    html
}

fn render_condensada(
    doc: &QuoteDocument<'_>,
    rows: &[ItemDocumento],
    omitidos: usize,
    typo: Typography,
) -> String {
    let cot = doc.cotizacion;
    let mut html = String::with_capacity(8 * 1024);

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="es"><head><meta charset="utf-8"><title>{numero}</title>
<style>
@page {{ size: A4; margin: 10mm 12mm; }}
body {{ margin: 0; font-family: Arial, Helvetica, sans-serif; font-size: {font}px; }}
header {{ display: flex; justify-content: space-between; border-bottom: 1px solid #333; padding-bottom: 4px; }}
table.items {{ width: 100%; border-collapse: collapse; margin-top: 6px; }}
table.items th {{ background: #eee; text-align: left; }}
table.items tr.item td {{ height: {row}px; line-height: {row}px; border-bottom: 1px solid #ddd; padding: 0 3px; white-space: nowrap; overflow: hidden; }}
.num {{ text-align: right; }}
.omitidos {{ font-style: italic; margin-top: 4px; }}
table.totales {{ margin-left: auto; margin-top: 6px; }}
</style></head><body>
"#,
        numero = escape_html(&cot.numero_formateado()),
        font = typo.font_px,
        row = typo.row_px,
    );

    let _ = writeln!(
        html,
        "<header><div><strong>{}</strong><br>RUT {}<br>{}<br>{} · {}</div><div><h2>{}</h2></div></header>",
        escape_html(&doc.empresa.nombre),
        escape_html(&doc.empresa.rut),
        escape_html(&doc.empresa.direccion),
        escape_html(&doc.empresa.telefono),
        escape_html(&doc.empresa.email),
        escape_html(&cot.numero_formateado())
    );

    html.push_str("<section class=\"datos\">");
    for (label, value) in header_fields(doc) {
        let _ = write!(
            html,
            "<div><b>{}:</b> {}</div>",
            escape_html(&label),
            escape_html(&value)
        );
    }
    html.push_str("</section>\n");

    html.push_str(
        "<table class=\"items\"><thead><tr><th>#</th><th>Descripción</th><th>Unidad</th>\
         <th class=\"num\">Cantidad</th><th class=\"num\">P. Unitario</th><th class=\"num\">Total</th>\
         </tr></thead><tbody>\n",
    );
    for (i, item) in rows.iter().enumerate() {
        let _ = writeln!(
            html,
            r#"<tr class="item"><td>{}</td><td>{}</td><td>{}</td><td class="num">{}</td><td class="num">{}</td><td class="num">{}</td></tr>"#,
            i + 1,
            escape_html(&item.descripcion),
            escape_html(&item.unidad),
            format_cantidad(item.cantidad),
            format_clp(item.precio_unitario),
            format_clp(item.subtotal)
        );
    }
    html.push_str("</tbody></table>\n");

    if omitidos > 0 {
        let _ = writeln!(
            html,
            r#"<div class="omitidos">{}</div>"#,
            omitted_notice(omitidos)
        );
    }

    html.push_str("<table class=\"totales\">");
    for (label, value) in totals_lines(cot) {
        let _ = write!(
            html,
            r#"<tr><th>{}</th><td class="num">{}</td></tr>"#,
            escape_html(&label),
            escape_html(&value)
        );
    }
    html.push_str("</table>\n");

    if let Some(obs) = cot.observaciones.as_deref().filter(|o| !o.trim().is_empty()) {
        let _ = writeln!(
            html,
            "<p class=\"observaciones\"><b>Observaciones:</b> {}</p>",
            escape_html(obs)
        );
    }

    html.push_str("</body></html>\n");
    html
}

/// Label/value pairs for the client and document block.
fn header_fields(doc: &QuoteDocument<'_>) -> Vec<(String, String)> {
    let cot = doc.cotizacion;
    let mut fields = vec![
        (
            "Cliente".to_string(),
            cot.cliente_nombre.clone().unwrap_or_default(),
        ),
        ("RUT".to_string(), cot.cliente_rut.clone().unwrap_or_default()),
    ];

    if let Some(cliente) = doc.cliente {
        let direccion = [cliente.direccion.as_deref(), cliente.comuna.as_deref(), cliente.ciudad.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        if !direccion.is_empty() {
            fields.push(("Dirección".to_string(), direccion));
        }
        if let Some(contacto) = cliente.contacto.as_deref().filter(|c| !c.trim().is_empty()) {
            fields.push(("Contacto".to_string(), contacto.to_string()));
        }
    }

    if let Some(obra) = &cot.obra_nombre {
        fields.push(("Obra".to_string(), obra.clone()));
    }
    fields.push(("Fecha".to_string(), format_fecha(cot.fecha)));
    fields.push((
        "Validez".to_string(),
        format!(
            "{} días (hasta {})",
            cot.validez_dias,
            format_fecha(cot.fecha_vencimiento())
        ),
    ));
    if let Some(vendedor) = &cot.vendedor_nombre {
        fields.push(("Vendedor".to_string(), vendedor.clone()));
    }
    fields
}

/// Label/value pairs for the totals block.
fn totals_lines(cot: &Cotizacion) -> Vec<(String, String)> {
    let mut lines = vec![("Subtotal".to_string(), format_clp(cot.subtotal))];
    if !cot.descuento.is_zero() {
        lines.push((
            format!("Descuento ({})", format_porcentaje(cot.descuento_porcentaje)),
            format!("-{}", format_clp(cot.descuento)),
        ));
    }
    lines.push(("Neto".to_string(), format_clp(cot.neto)));
    lines.push(("IVA 19%".to_string(), format_clp(cot.iva)));
    lines.push(("Total".to_string(), format_clp(cot.total)));
    lines
}

/// Escapes text for HTML element content and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
