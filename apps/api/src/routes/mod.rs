//! # Routes
//!
//! One module per resource. Handlers follow the same pattern: parse the query
//! string into a repository filter, call the repository, wrap the result in
//! [`ApiResponse`](crate::ApiResponse). Mutations require a session
//! ([`AuthUser`](crate::auth::AuthUser)) and append an audit entry attributed
//! to it.
//!
//! ```text
//! /api
//! ├── health                       GET
//! ├── auth/{login,session,logout}  POST / GET / POST
//! ├── clientes[/{id}]              GET POST / GET PUT DELETE
//! ├── obras[/{id}]                 GET POST / GET PUT DELETE
//! ├── productos[/{id}[/stock]]     GET POST / GET PUT DELETE / POST
//! ├── cotizaciones[/{id}[/html|/pdf]]
//! ├── notas-venta[/{id}]
//! ├── usuarios[/{id}]              admin only
//! ├── auditoria                    admin only
//! └── dashboard/{stats,chart,chart/point}
//! ```

pub mod auditoria;
pub mod auth;
pub mod clientes;
pub mod cotizaciones;
pub mod dashboard;
pub mod health;
pub mod notas_venta;
pub mod obras;
pub mod productos;
pub mod usuarios;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tracing::warn;

use cotiza_db::NuevoRegistro;

use crate::AppState;

/// All `/api` routes.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health))
        // Session
        .route("/auth/login", post(auth::login))
        .route("/auth/session", get(auth::session))
        .route("/auth/logout", post(auth::logout))
        // Clients and projects
        .route("/clientes", get(clientes::list).post(clientes::create))
        .route(
            "/clientes/{id}",
            get(clientes::detail).put(clientes::update).delete(clientes::remove),
        )
        .route("/obras", get(obras::list).post(obras::create))
        .route(
            "/obras/{id}",
            get(obras::detail).put(obras::update).delete(obras::remove),
        )
        // Inventory
        .route("/productos", get(productos::list).post(productos::create))
        .route(
            "/productos/{id}",
            get(productos::detail).put(productos::update).delete(productos::remove),
        )
        .route("/productos/{id}/stock", post(productos::adjust_stock))
        // Documents
        .route("/cotizaciones", get(cotizaciones::list).post(cotizaciones::create))
        .route(
            "/cotizaciones/{id}",
            get(cotizaciones::detail)
                .put(cotizaciones::update)
                .delete(cotizaciones::remove),
        )
        .route("/cotizaciones/{id}/html", get(cotizaciones::html))
        .route("/cotizaciones/{id}/pdf", get(cotizaciones::pdf))
        .route("/notas-venta", get(notas_venta::list).post(notas_venta::create))
        .route(
            "/notas-venta/{id}",
            get(notas_venta::detail)
                .put(notas_venta::update)
                .delete(notas_venta::remove),
        )
        // Administration
        .route("/usuarios", get(usuarios::list).post(usuarios::create))
        .route(
            "/usuarios/{id}",
            get(usuarios::detail).put(usuarios::update).delete(usuarios::remove),
        )
        .route("/auditoria", get(auditoria::list))
        // Dashboard
        .route("/dashboard/stats", get(dashboard::stats))
        .route("/dashboard/chart", get(dashboard::chart))
        .route("/dashboard/chart/point", get(dashboard::chart_point))
}

/// Appends an audit entry. A failure is logged and never fails the request.
pub(crate) async fn audit(state: &AppState, usuario_id: Option<String>, registro: NuevoRegistro) {
    let registro = registro.usuario(usuario_id);
    if let Err(e) = state.db.auditoria().record(&registro).await {
        warn!(error = %e, entidad = %registro.entidad, "Failed to record audit entry");
    }
}
