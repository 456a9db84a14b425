//! # Seed Data Generator
//!
//! Populates a development database with an admin user, clients, projects,
//! products with stock, and quotes spread over the last months.
//!
//! ## Usage
//! ```bash
//! # Default database (./cotiza_dev.db), 60 quotes
//! cargo run -p cotiza-db --bin seed
//!
//! # Custom path and quote count
//! cargo run -p cotiza-db --bin seed -- --db ./data/cotiza.db --quotes 200
//! ```
//!
//! The admin login is `admin@cotiza.cl` / `Cotiza2026`.

use std::env;

use anyhow::Context;
use chrono::Duration;
use cotiza_core::format::hoy;
use cotiza_core::{
    CotizacionEstado, Money, NuevaCotizacion, NuevaNotaVenta, NuevaObra, NuevoCliente, NuevoItem,
    NuevoProducto, NuevoUsuario, NotaVentaEstado, ObraEstado, Producto, Rol,
};
use cotiza_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// (rut, razón social, comuna)
const CLIENTES: &[(&str, &str, &str)] = &[
    ("76.086.428-5", "Constructora Andes SpA", "Concepción"),
    ("12.345.678-5", "Juan Soto Inversiones EIRL", "Talcahuano"),
    ("11.111.111-1", "Inmobiliaria Pacífico Ltda.", "San Pedro de la Paz"),
    ("10.000.013-K", "Ferretería El Sur Ltda.", "Chiguayante"),
    ("7.654.321-6", "Obras Civiles Biobío SpA", "Coronel"),
];

/// (obra, índice del cliente, estado)
const OBRAS: &[(&str, usize, ObraEstado)] = &[
    ("Edificio Mirador del Valle", 0, ObraEstado::EnCurso),
    ("Condominio Los Aromos", 0, ObraEstado::Planificacion),
    ("Ampliación Bodega Norte", 1, ObraEstado::EnCurso),
    ("Loteo Lomas de Andalué", 2, ObraEstado::EnCurso),
    ("Remodelación Local Centro", 3, ObraEstado::Finalizada),
    ("Pavimentación Calle Los Carrera", 4, ObraEstado::Planificacion),
];

/// (código, nombre, unidad, precio, stock, stock mínimo, categoría)
const PRODUCTOS: &[(&str, &str, &str, i64, f64, f64, &str)] = &[
    ("CEM-25", "Cemento Especial 25 kg", "saco", 5_990, 400.0, 50.0, "Obra gruesa"),
    ("HOR-H25", "Hormigón H25 premezclado", "m3", 89_900, 120.0, 10.0, "Obra gruesa"),
    ("FIE-8", "Fierro estriado 8 mm x 6 m", "un", 3_490, 800.0, 100.0, "Fierros"),
    ("FIE-12", "Fierro estriado 12 mm x 6 m", "un", 7_290, 500.0, 80.0, "Fierros"),
    ("MAL-ACMA", "Malla ACMA C-139", "un", 32_990, 60.0, 15.0, "Fierros"),
    ("LAD-PR", "Ladrillo princesa", "un", 390, 12_000.0, 2_000.0, "Albañilería"),
    ("YES-15", "Plancha yeso-cartón 15 mm", "un", 8_990, 3.0, 20.0, "Terminaciones"),
    ("PIN-LAT", "Pintura látex 1 gl", "gl", 14_990, 45.0, 10.0, "Terminaciones"),
    ("MAD-2x4", "Pino dimensionado 2x4 x 3,2 m", "un", 3_150, 900.0, 150.0, "Maderas"),
    ("OSB-11", "Tablero OSB 11 mm", "un", 12_490, 8.0, 25.0, "Maderas"),
];

const ADMIN_EMAIL: &str = "admin@cotiza.cl";
const ADMIN_PASSWORD: &str = "Cotiza2026";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut quotes: usize = 60;
    let mut db_path = String::from("./cotiza_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--quotes" | "-q" => {
                if i + 1 < args.len() {
                    quotes = args[i + 1].parse().unwrap_or(60);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Cotiza Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -q, --quotes <N>   Number of quotes to generate (default: 60)");
                println!("  -d, --db <PATH>    Database file path (default: ./cotiza_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(db = %db_path, quotes = quotes, "Seeding database");

    let db = Database::new(DbConfig::from_url(&db_path))
        .await
        .context("opening database")?;

    if db.usuarios().count().await? > 0 {
        warn!("Database already has users; skipping seed to avoid duplicates");
        return Ok(());
    }

    // Users
    let admin = db
        .usuarios()
        .create(&NuevoUsuario {
            email: ADMIN_EMAIL.to_string(),
            nombre: "Administrador".to_string(),
            rol: Some(Rol::Admin),
            password: ADMIN_PASSWORD.to_string(),
        })
        .await
        .context("creating admin user")?;
    let vendedor = db
        .usuarios()
        .create(&NuevoUsuario {
            email: "ventas@cotiza.cl".to_string(),
            nombre: "Camila Rojas".to_string(),
            rol: Some(Rol::Vendedor),
            password: ADMIN_PASSWORD.to_string(),
        })
        .await
        .context("creating seller")?;
    info!(admin = %admin.email, vendedor = %vendedor.email, "Users created");

    // Clients and projects
    let mut clientes = Vec::with_capacity(CLIENTES.len());
    for (rut, nombre, comuna) in CLIENTES {
        let cliente = db
            .clientes()
            .create(&NuevoCliente {
                rut: rut.to_string(),
                nombre_razon_social: nombre.to_string(),
                comuna: Some(comuna.to_string()),
                ciudad: Some("Concepción".to_string()),
                ..Default::default()
            })
            .await
            .with_context(|| format!("creating cliente {}", rut))?;
        clientes.push(cliente);
    }

    let mut obras = Vec::with_capacity(OBRAS.len());
    for (nombre, cliente_idx, estado) in OBRAS {
        let obra = db
            .obras()
            .create(&NuevaObra {
                cliente_id: clientes[*cliente_idx].id.clone(),
                nombre: nombre.to_string(),
                estado: Some(*estado),
                ..Default::default()
            })
            .await
            .with_context(|| format!("creating obra {}", nombre))?;
        obras.push(obra);
    }
    info!(clientes = clientes.len(), obras = obras.len(), "Clients and projects created");

    // Products
    let mut productos: Vec<Producto> = Vec::with_capacity(PRODUCTOS.len());
    for (codigo, nombre, unidad, precio, stock, minimo, categoria) in PRODUCTOS {
        let producto = db
            .productos()
            .create(&NuevoProducto {
                codigo: codigo.to_string(),
                nombre: nombre.to_string(),
                unidad: Some(unidad.to_string()),
                precio_unitario: Money::from_pesos(*precio),
                categoria: Some(categoria.to_string()),
                stock_inicial: Some(*stock),
                stock_minimo: Some(*minimo),
                ..Default::default()
            })
            .await
            .with_context(|| format!("creating producto {}", codigo))?;
        productos.push(producto);
    }
    info!(productos = productos.len(), "Products created");

    // Quotes spread over the last ~11 months, with deterministic variety
    let hoy = hoy();
    let mut notas = 0;
    for n in 0..quotes {
        let obra = &obras[n % obras.len()];
        let items: Vec<NuevoItem> = (0..(1 + n % 4))
            .map(|k| {
                let producto = &productos[(n * 3 + k * 7) % productos.len()];
                NuevoItem {
                    producto_id: Some(producto.id.clone()),
                    descripcion: producto.nombre.clone(),
                    unidad: Some(producto.unidad.clone()),
                    cantidad: (1 + (n + k) % 9) as f64,
                    precio_unitario: producto.precio_unitario,
                }
            })
            .collect();

        let dias_atras = ((quotes - n) * 330 / quotes.max(1)) as i64;
        let cotizacion = db
            .cotizaciones()
            .create(&NuevaCotizacion {
                cliente_id: obra.cliente_id.clone(),
                obra_id: Some(obra.id.clone()),
                vendedor_id: Some(vendedor.id.clone()),
                fecha: Some(hoy - Duration::days(dias_atras)),
                validez_dias: Some(30),
                descuento_porcentaje: Some([0.0, 0.0, 5.0, 10.0][n % 4]),
                observaciones: None,
                items,
            })
            .await
            .with_context(|| format!("creating cotizacion {}", n + 1))?;

        let id = &cotizacion.cotizacion.id;
        match n % 6 {
            0 | 1 => {
                let nota = db
                    .notas_venta()
                    .create_from_quote(&NuevaNotaVenta {
                        cotizacion_id: id.clone(),
                        observaciones: None,
                    })
                    .await?;
                if n % 2 == 0 {
                    // Skipped silently when a product ran short
                    if let Err(e) = db
                        .notas_venta()
                        .set_estado(&nota.nota.id, NotaVentaEstado::Confirmada)
                        .await
                    {
                        warn!(nota = nota.nota.numero, error = %e, "Could not confirm sales note");
                    }
                }
                notas += 1;
            }
            2 => {
                db.cotizaciones().set_estado(id, CotizacionEstado::Enviada).await?;
            }
            3 => {
                db.cotizaciones().set_estado(id, CotizacionEstado::Rechazada).await?;
            }
            4 if n % 12 == 4 => {
                db.cotizaciones().anular(id).await?;
            }
            _ => {}
        }
    }

    let vencidas = db.cotizaciones().expire_overdue(hoy).await?;
    info!(
        cotizaciones = quotes,
        notas_venta = notas,
        vencidas = vencidas,
        "Quotes created"
    );

    println!();
    println!("Seed complete. Login: {} / {}", ADMIN_EMAIL, ADMIN_PASSWORD);

    db.close().await;
    Ok(())
}
