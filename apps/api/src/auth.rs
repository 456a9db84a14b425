//! Session authentication module.
//!
//! Sessions are signed JWTs stored in an `HttpOnly` cookie. Besides the
//! absolute expiry (`exp`) the claims carry the time of the last request; a
//! session idle for longer than the configured window is refused. Every
//! request that arrives with a valid session gets the cookie back with a
//! fresh `last_activity` ([`slide_session`]), so the window slides with any
//! activity, not only with `GET /api/auth/session`.
//!
//! ```text
//!  login ──► cookie{iat, exp = iat + max_age, last_activity = now}
//!               │
//!  any request ─┤ now - last_activity > idle ──► 401
//!               │ otherwise ──► new cookie{last_activity = now}, same exp
//!               │
//!  logout ──────┴──► Max-Age=0
//! ```
//!
//! Extractors: [`AuthUser`] (401 without a session) guards every resource
//! mutation, [`AdminUser`] adds the role check, [`MaybeUser`] never rejects.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use cotiza_core::{Rol, Usuario};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "cotiza_session";

/// Session claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (usuario id)
    pub sub: String,

    pub email: String,

    pub rol: Rol,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Absolute expiration (Unix timestamp)
    pub exp: i64,

    /// Last request seen for this session (Unix timestamp)
    pub last_activity: i64,

    /// Session id
    pub jti: String,
}

/// Issues and validates session tokens.
#[derive(Debug, Clone)]
pub struct SessionManager {
    secret: String,
    max_age_secs: i64,
    idle_secs: i64,
    cookie_secure: bool,
}

impl SessionManager {
    pub fn new(secret: String, max_age_secs: i64, idle_secs: i64, cookie_secure: bool) -> Self {
        SessionManager {
            secret,
            max_age_secs,
            idle_secs,
            cookie_secure,
        }
    }

    /// Starts a session for `usuario`.
    pub fn issue(&self, usuario: &Usuario) -> ApiResult<(String, Claims)> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: usuario.id.clone(),
            email: usuario.email.clone(),
            rol: usuario.rol,
            iat: now,
            exp: now + self.max_age_secs,
            last_activity: now,
            jti: Uuid::new_v4().to_string(),
        };
        let token = self.encode(&claims)?;
        Ok((token, claims))
    }

    /// Re-issues `claims` with `last_activity = now`; `exp` is unchanged.
    pub fn refresh(&self, claims: &Claims) -> ApiResult<(String, Claims)> {
        let claims = Claims {
            last_activity: Utc::now().timestamp(),
            ..claims.clone()
        };
        let token = self.encode(&claims)?;
        Ok((token, claims))
    }

    /// Decodes a token, checking signature, expiry and the idle window.
    pub fn validate(&self, token: &str) -> ApiResult<Claims> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// [`SessionManager::validate`] with an explicit clock for the idle check.
    pub fn validate_at(&self, token: &str, now: i64) -> ApiResult<Claims> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ApiError::unauthorized(format!("Sesión inválida: {}", e)))?;

        let claims = token_data.claims;
        if now - claims.last_activity > self.idle_secs {
            return Err(ApiError::unauthorized("Sesión expirada por inactividad"));
        }

        Ok(claims)
    }

    /// `Set-Cookie` value carrying `token` until the session's `exp`.
    pub fn session_cookie(&self, token: &str, claims: &Claims) -> String {
        let max_age = (claims.exp - Utc::now().timestamp()).max(0);
        self.cookie(token, max_age)
    }

    /// `Set-Cookie` value that removes the session cookie.
    pub fn clear_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE, value, max_age
        );
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn encode(&self, claims: &Claims) -> ApiResult<String> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to sign session: {}", e)))
    }
}

/// Extract the session token from the `Cookie` header(s).
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value)
}

/// Validates the session cookie and loads its (active) user.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<(Claims, Usuario)> {
    let token = session_token(headers).ok_or_else(|| ApiError::unauthorized("No hay sesión activa"))?;
    let claims = state.sessions.validate(token)?;

    let usuario = state
        .db
        .usuarios()
        .get_by_id(&claims.sub)
        .await?
        .filter(|u| u.activo)
        .ok_or_else(|| ApiError::unauthorized("Usuario inactivo o inexistente"))?;

    Ok((claims, usuario))
}

/// Middleware re-issuing the session cookie after each request made with a
/// valid session. Responses that already set a cookie (login, logout) and
/// 401s are left alone.
pub async fn slide_session(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let claims = session_token(request.headers()).and_then(|token| state.sessions.validate(token).ok());

    let mut response = next.run(request).await;

    let Some(claims) = claims else {
        return response;
    };
    if response.status() == StatusCode::UNAUTHORIZED || response.headers().contains_key(SET_COOKIE) {
        return response;
    }

    match state.sessions.refresh(&claims) {
        Ok((token, claims)) => {
            let cookie = state.sessions.session_cookie(&token, &claims);
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().insert(SET_COOKIE, value);
                }
                Err(e) => warn!(error = %e, "Session cookie is not a valid header value"),
            }
        }
        Err(e) => warn!(error = %e, "Failed to refresh session"),
    }
    response
}

// =============================================================================
// Extractors
// =============================================================================

/// An active session user; 401 through the envelope otherwise.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Usuario);

impl AuthUser {
    /// The user id, as audit entries take it.
    pub fn id(&self) -> Option<String> {
        Some(self.0.id.clone())
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let (_, usuario) = authenticate(state, &parts.headers).await?;
        Ok(AuthUser(usuario))
    }
}

/// The session user, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Usuario>);

impl MaybeUser {
    pub fn id(&self) -> Option<String> {
        self.0.as_ref().map(|u| u.id.clone())
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            authenticate(state, &parts.headers).await.ok().map(|(_, u)| u),
        ))
    }
}

/// A session user with the `admin` role: 401 without a session, 403 for
/// other roles.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Usuario);

impl AdminUser {
    pub fn check(usuario: Usuario) -> ApiResult<AdminUser> {
        if usuario.rol != Rol::Admin {
            return Err(ApiError::forbidden("Acción permitida solo a administradores"));
        }
        Ok(AdminUser(usuario))
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let (_, usuario) = authenticate(state, &parts.headers).await?;
        AdminUser::check(usuario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn usuario(rol: Rol) -> Usuario {
        let now = Utc::now();
        Usuario {
            id: "u-1".to_string(),
            email: "admin@cotiza.cl".to_string(),
            nombre: "Admin".to_string(),
            rol,
            activo: true,
            ultimo_acceso: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn manager() -> SessionManager {
        SessionManager::new("test-secret".to_string(), 8 * 3600, 1800, false)
    }

    #[test]
    fn test_session_roundtrip() {
        let manager = manager();
        let (token, issued) = manager.issue(&usuario(Rol::Admin)).unwrap();

        let claims = manager.validate(&token).unwrap();
        assert_eq!(claims, issued);
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.rol, Rol::Admin);
        assert_eq!(claims.exp - claims.iat, 8 * 3600);
    }

    #[test]
    fn test_idle_session_is_refused() {
        let manager = manager();
        let (token, claims) = manager.issue(&usuario(Rol::Vendedor)).unwrap();

        assert!(manager.validate_at(&token, claims.last_activity + 1800).is_ok());
        let err = manager
            .validate_at(&token, claims.last_activity + 1801)
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_refresh_keeps_expiry() {
        let manager = manager();
        let (_, claims) = manager.issue(&usuario(Rol::Vendedor)).unwrap();
        let stale = Claims {
            last_activity: claims.last_activity - 1000,
            ..claims.clone()
        };

        let (token, refreshed) = manager.refresh(&stale).unwrap();
        assert_eq!(refreshed.exp, claims.exp);
        assert_eq!(refreshed.jti, claims.jti);
        assert!(refreshed.last_activity >= claims.last_activity);
        assert!(manager.validate(&token).is_ok());
    }

    #[test]
    fn test_wrong_secret() {
        let (token, _) = manager().issue(&usuario(Rol::Admin)).unwrap();
        let other = SessionManager::new("other".to_string(), 3600, 1800, false);
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn test_session_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        assert!(session_token(&headers).is_none());

        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; cotiza_session=abc.def.ghi; lang=es"),
        );
        assert_eq!(session_token(&headers), Some("abc.def.ghi"));

        headers.insert(COOKIE, HeaderValue::from_static("cotiza_session="));
        assert!(session_token(&headers).is_none());
    }

    #[test]
    fn test_cookie_attributes() {
        let secure = SessionManager::new("s".to_string(), 3600, 600, true);
        let (token, claims) = secure.issue(&usuario(Rol::Admin)).unwrap();

        let cookie = secure.session_cookie(&token, &claims);
        assert!(cookie.starts_with(&format!("cotiza_session={};", token)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.ends_with("; Secure"));

        let cleared = manager().clear_cookie();
        assert_eq!(
            cleared,
            "cotiza_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
    }

    #[test]
    fn test_admin_check() {
        assert!(AdminUser::check(usuario(Rol::Admin)).is_ok());
        let err = AdminUser::check(usuario(Rol::Bodega)).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }
}
