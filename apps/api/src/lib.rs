//! # Cotiza API
//!
//! REST server for the sales back-office: clients, projects (obras),
//! products and stock, quotes (cotizaciones) with PDF output, sales notes,
//! users, audit log and dashboard.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cotiza API Server                                │
//! │                                                                         │
//! │  Browser ──► axum Router (/api/...) ──► routes::* ──► cotiza-db        │
//! │                  │                          │                           │
//! │                  │ cookie                   ├──► cotiza-core (totals,  │
//! │                  ▼                          │     PDF HTML, chart SVG)  │
//! │            SessionManager                   └──► ChromiumRenderer      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod pdf;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::{middleware, Router};
use cotiza_db::Database;

use crate::auth::SessionManager;
use crate::config::ApiConfig;
use crate::pdf::ChromiumRenderer;

pub use error::{ApiError, ApiResult, ErrorCode};
pub use response::ApiResponse;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: ApiConfig,
    pub sessions: SessionManager,
    pub pdf: ChromiumRenderer,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let sessions = SessionManager::new(
            config.session_secret.clone(),
            config.session_max_age_secs,
            config.session_idle_secs,
            config.cookie_secure,
        );
        let pdf = ChromiumRenderer::new(config.chromium_path.clone(), config.pdf_timeout());

        AppState {
            db,
            config,
            sessions,
            pdf,
        }
    }
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let api = routes::api_routes().layer(middleware::from_fn_with_state(
        state.clone(),
        auth::slide_session,
    ));

    Router::new().nest("/api", api).with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
    use cotiza_core::{Cliente, Money, NuevoCliente, NuevoProducto, NuevoUsuario, Producto, Rol, Usuario};
    use cotiza_db::{Database, DbConfig};

    use crate::auth::{AuthUser, SESSION_COOKIE};
    use crate::config::ApiConfig;
    use crate::AppState;

    pub const PASSWORD: &str = "Cotiza2026";

    pub async fn state() -> Arc<AppState> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = ApiConfig::from_lookup(|_| None).unwrap();
        Arc::new(AppState::new(db, config))
    }

    pub async fn usuario(state: &AppState, email: &str, rol: Rol) -> Usuario {
        state
            .db
            .usuarios()
            .create(&NuevoUsuario {
                email: email.to_string(),
                nombre: format!("Usuario {}", email),
                rol: Some(rol),
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap()
    }

    /// A signed-in seller with a unique email, for handlers behind [`AuthUser`].
    pub async fn auth(state: &AppState) -> AuthUser {
        let email = format!("sesion-{}@cotiza.cl", uuid::Uuid::new_v4().simple());
        AuthUser(usuario(state, &email, Rol::Vendedor).await)
    }

    /// Request headers carrying a fresh session cookie for `usuario`.
    pub fn session_headers(state: &AppState, usuario: &Usuario) -> HeaderMap {
        let (token, _) = state.sessions.issue(usuario).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, token)).unwrap(),
        );
        headers
    }

    pub async fn cliente(state: &AppState, rut: &str) -> Cliente {
        state
            .db
            .clientes()
            .create(&NuevoCliente {
                rut: rut.to_string(),
                nombre_razon_social: "Constructora Andes SpA".to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    pub async fn producto(state: &AppState, codigo: &str, precio: i64, stock: f64) -> Producto {
        state
            .db
            .productos()
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
}
