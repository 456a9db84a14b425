//! Login, session check and logout.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cotiza_core::{AccionAuditoria, Usuario};
use cotiza_db::password::{verify_dummy, verify_password};
use cotiza_db::NuevoRegistro;

use super::audit;
use crate::auth::{authenticate, Claims, MaybeUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::Json;
use crate::response::ApiResponse;
use crate::AppState;

/// `Set-Cookie` header paired with a response body.
type WithCookie<T> = ([(axum::http::HeaderName, String); 1], ApiResponse<T>);

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of login and session responses.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub usuario: Usuario,
    /// Absolute end of the session.
    pub expira: DateTime<Utc>,
    /// Idle window in seconds before the session is refused.
    pub inactividad_max_segundos: i64,
}

impl SessionInfo {
    fn new(usuario: Usuario, claims: &Claims, idle_secs: i64) -> Self {
        SessionInfo {
            usuario,
            expira: Utc.timestamp_opt(claims.exp, 0).single().unwrap_or_else(Utc::now),
            inactividad_max_segundos: idle_secs,
        }
    }
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<WithCookie<SessionInfo>> {
    let email = body.email.trim().to_lowercase();
    let found = state.db.usuarios().get_by_email(&email).await?;

    // Every branch pays for one Argon2 verification
    let usuario = match found {
        Some(u) => {
            let valid = verify_password(&body.password, &u.password_hash);
            if !u.usuario.activo {
                warn!(email = %email, "Login rejected: inactive user");
                return Err(ApiError::unauthorized("Credenciales inválidas"));
            }
            if !valid {
                warn!(email = %email, "Login rejected: wrong password");
                return Err(ApiError::unauthorized("Credenciales inválidas"));
            }
            u.usuario
        }
        None => {
            verify_dummy(&body.password);
            warn!(email = %email, "Login rejected: unknown email");
            return Err(ApiError::unauthorized("Credenciales inválidas"));
        }
    };

    state.db.usuarios().touch_last_access(&usuario.id).await?;
    let (token, claims) = state.sessions.issue(&usuario)?;

    audit(
        &state,
        Some(usuario.id.clone()),
        NuevoRegistro::new(AccionAuditoria::Login, "sesion").entidad_id(&usuario.id),
    )
    .await;
    info!(usuario = %usuario.email, "Login");

    let cookie = state.sessions.session_cookie(&token, &claims);
    let info = SessionInfo::new(usuario, &claims, state.config.session_idle_secs);
    Ok(([(SET_COOKIE, cookie)], ApiResponse::ok(info)))
}

/// `GET /api/auth/session`: validates the cookie and slides the idle window.
pub async fn session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<WithCookie<SessionInfo>> {
    let (claims, usuario) = authenticate(&state, &headers).await?;
    let (token, claims) = state.sessions.refresh(&claims)?;

    let cookie = state.sessions.session_cookie(&token, &claims);
    let info = SessionInfo::new(usuario, &claims, state.config.session_idle_secs);
    Ok(([(SET_COOKIE, cookie)], ApiResponse::ok(info)))
}

/// `POST /api/auth/logout`: always clears the cookie.
pub async fn logout(State(state): State<Arc<AppState>>, usuario: MaybeUser) -> WithCookie<()> {
    if let Some(id) = usuario.id() {
        audit(
            &state,
            Some(id.clone()),
            NuevoRegistro::new(AccionAuditoria::Logout, "sesion").entidad_id(id),
        )
        .await;
    }

    (
        [(SET_COOKIE, state.sessions.clear_cookie())],
        ApiResponse::empty().with_message("Sesión cerrada"),
    )
}
