//! # Repository Module
//!
//! Database repository implementations for Cotiza.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  axum handler                                                          │
//! │       │                                                                 │
//! │       │  db.cotizaciones().list(&filter)                               │
//! │       ▼                                                                 │
//! │  CotizacionRepository                                                  │
//! │  ├── list(&self, filter)       → Vec<Cotizacion> (names flattened)     │
//! │  ├── get_detalle(&self, id)    → Option<CotizacionDetalle>             │
//! │  ├── create(&self, form)       → numero + totals in one transaction    │
//! │  └── anular(&self, id)         → soft delete                           │
//! │       │                                                                 │
//! │       │  SQL (QueryBuilder for optional filters)                       │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - `get_by_id` returns `Ok(None)` for a missing row; mutations return
//!   `DbError::NotFound`.
//! - Lists are ordered deterministically (a unique column breaks ties).
//! - Soft deletes never remove rows.

pub mod auditoria;
pub mod clientes;
pub mod cotizaciones;
pub mod dashboard;
pub mod notas_venta;
pub mod obras;
pub mod productos;
pub mod usuarios;

pub use auditoria::{AuditoriaFilter, AuditoriaRepository, NuevoRegistro};
pub use clientes::ClienteRepository;
pub use cotizaciones::{CotizacionFilter, CotizacionRepository};
pub use dashboard::DashboardRepository;
pub use notas_venta::{NotaVentaFilter, NotaVentaRepository};
pub use obras::{ObraFilter, ObraRepository};
pub use productos::{ProductoFilter, ProductoRepository};
pub use usuarios::{UsuarioConHash, UsuarioRepository};

use cotiza_core::{ItemDocumento, ListFilter, ValidationError};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::error::DbResult;

/// Applies an optional text update: absent keeps `current`, blank clears it.
pub(crate) fn merge_text(current: Option<String>, update: &Option<String>) -> Option<String> {
    match update {
        None => current,
        Some(value) => {
            let value = value.trim();
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        }
    }
}

/// Trims an optional text field, mapping blank to `None`.
pub(crate) fn clean_text(value: &Option<String>) -> Option<String> {
    merge_text(None, value)
}

/// Appends `AND (col1 LIKE ? ESCAPE '\' OR col2 LIKE ? ...)` for the search
/// term, if any.
pub(crate) fn push_search(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ListFilter, columns: &[&str]) {
    let Some(pattern) = filter.search_pattern() else {
        return;
    };

    qb.push(" AND (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(*column)
            .push(" LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\'");
    }
    qb.push(")");
}

/// Appends `LIMIT ? OFFSET ?` from the filter.
pub(crate) fn push_page(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ListFilter) {
    qb.push(" LIMIT ")
        .push_bind(filter.limit() as i64)
        .push(" OFFSET ")
        .push_bind(filter.offset() as i64);
}

/// Maps `estado=activo|inactivo` onto an `activo` flag for tables that soft
/// delete with a boolean.
pub(crate) fn activo_filter(filter: &ListFilter) -> DbResult<Option<bool>> {
    match filter.estado.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some("activo") => Ok(Some(true)),
        Some("inactivo") => Ok(Some(false)),
        Some(_) => Err(ValidationError::NotAllowed {
            field: "estado".to_string(),
            allowed: vec!["activo".to_string(), "inactivo".to_string()],
        }
        .into()),
    }
}

// =============================================================================
// Document Helpers (quotes and sales notes share numbering and items)
// =============================================================================

/// Which document table group a helper operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Documento {
    Cotizacion,
    NotaVenta,
}

impl Documento {
    const fn header_table(self) -> &'static str {
        match self {
            Documento::Cotizacion => "cotizaciones",
            Documento::NotaVenta => "notas_venta",
        }
    }

    const fn items_table(self) -> &'static str {
        match self {
            Documento::Cotizacion => "cotizacion_items",
            Documento::NotaVenta => "nota_venta_items",
        }
    }

    const fn foreign_key(self) -> &'static str {
        match self {
            Documento::Cotizacion => "cotizacion_id",
            Documento::NotaVenta => "nota_venta_id",
        }
    }
}

/// Next sequential document number. Must run inside the transaction that
/// inserts the document; the UNIQUE constraint on `numero` backs it up.
pub(crate) async fn next_numero(conn: &mut SqliteConnection, doc: Documento) -> DbResult<i64> {
    let numero: i64 = sqlx::query_scalar(&format!(
        "SELECT COALESCE(MAX(numero), 0) + 1 FROM {}",
        doc.header_table()
    ))
    .fetch_one(&mut *conn)
    .await?;

    Ok(numero)
}

/// Inserts `items` for document `doc_id`.
pub(crate) async fn insert_items(
    conn: &mut SqliteConnection,
    doc: Documento,
    doc_id: &str,
    items: &[ItemDocumento],
) -> DbResult<()> {
    let sql = format!(
        r#"
        INSERT INTO {} (
            id, {}, producto_id, posicion, descripcion, unidad,
            cantidad, precio_unitario, subtotal
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
        doc.items_table(),
        doc.foreign_key()
    );

    for item in items {
        sqlx::query(&sql)
            .bind(&item.id)
            .bind(doc_id)
            .bind(&item.producto_id)
            .bind(item.posicion)
            .bind(&item.descripcion)
            .bind(&item.unidad)
            .bind(item.cantidad)
            .bind(item.precio_unitario)
            .bind(item.subtotal)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Removes every item of document `doc_id`.
pub(crate) async fn delete_items(conn: &mut SqliteConnection, doc: Documento, doc_id: &str) -> DbResult<()> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE {} = ?1",
        doc.items_table(),
        doc.foreign_key()
    ))
    .bind(doc_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Items of document `doc_id` in position order.
pub(crate) async fn fetch_items(
    conn: &mut SqliteConnection,
    doc: Documento,
    doc_id: &str,
) -> DbResult<Vec<ItemDocumento>> {
    let items = sqlx::query_as::<_, ItemDocumento>(&format!(
        r#"
        SELECT id, posicion, producto_id, descripcion, unidad, cantidad, precio_unitario, subtotal
        FROM {}
        WHERE {} = ?1
        ORDER BY posicion, id
        "#,
        doc.items_table(),
        doc.foreign_key()
    ))
    .bind(doc_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use cotiza_core::{
        Cliente, Money, NuevaCotizacion, NuevoCliente, NuevoItem, NuevoProducto, Producto,
    };

    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn cliente(db: &Database, rut: &str, nombre: &str) -> Cliente {
        db.clientes()
            .create(&NuevoCliente {
                rut: rut.to_string(),
                nombre_razon_social: nombre.to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    pub async fn producto(db: &Database, codigo: &str, precio: i64, stock: f64) -> Producto {
        db.productos()
            .create(&NuevoProducto {
                codigo: codigo.to_string(),
                nombre: format!("Producto {}", codigo),
                unidad: Some("un".to_string()),
                precio_unitario: Money::from_pesos(precio),
                stock_inicial: Some(stock),
                stock_minimo: Some(5.0),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    pub fn item_de(producto: &Producto, cantidad: f64) -> NuevoItem {
        NuevoItem {
            producto_id: Some(producto.id.clone()),
            descripcion: producto.nombre.clone(),
            unidad: Some(producto.unidad.clone()),
            cantidad,
            precio_unitario: producto.precio_unitario,
        }
    }

    pub fn cotizacion_para(cliente: &Cliente, items: Vec<NuevoItem>) -> NuevaCotizacion {
        NuevaCotizacion {
            cliente_id: cliente.id.clone(),
            items,
            ..Default::default()
        }
    }
}
