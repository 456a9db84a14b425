//! User administration. Every handler requires an admin session.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use serde_json::json;
use tracing::info;

use cotiza_core::{AccionAuditoria, ActualizarUsuario, ListFilter, NuevoUsuario, Usuario};
use cotiza_db::NuevoRegistro;

use super::audit;
use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::response::ApiResponse;
use crate::AppState;

const ENTIDAD: &str = "usuario";

/// `GET /api/usuarios?search&estado=activo|inactivo&limit&offset`
pub async fn list(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(filter): Query<ListFilter>,
) -> ApiResult<ApiResponse<Vec<Usuario>>> {
    let usuarios = state.db.usuarios().list(&filter).await?;
    Ok(ApiResponse::list(usuarios))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Usuario>> {
    let usuario = state
        .db
        .usuarios()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Usuario", &id))?;
    Ok(ApiResponse::ok(usuario))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Json(form): Json<NuevoUsuario>,
) -> ApiResult<(StatusCode, ApiResponse<Usuario>)> {
    let usuario = state.db.usuarios().create(&form).await?;
    info!(admin = %admin.email, usuario = %usuario.email, rol = %usuario.rol, "User created");

    audit(
        &state,
        Some(admin.id),
        NuevoRegistro::new(AccionAuditoria::Crear, ENTIDAD)
            .entidad_id(&usuario.id)
            .detalle(json!({ "email": usuario.email, "rol": usuario.rol })),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(usuario).with_message("Usuario creado"),
    ))
}

/// `PUT /api/usuarios/{id}`. An admin cannot deactivate their own account.
pub async fn update(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(form): Json<ActualizarUsuario>,
) -> ApiResult<ApiResponse<Usuario>> {
    if id == admin.id && form.activo == Some(false) {
        return Err(ApiError::validation("No puede desactivar su propia cuenta"));
    }

    let usuario = state.db.usuarios().update(&id, &form).await?;

    // The password never reaches the audit log
    audit(
        &state,
        Some(admin.id),
        NuevoRegistro::new(AccionAuditoria::Actualizar, ENTIDAD)
            .entidad_id(&id)
            .detalle(json!({
                "nombre": form.nombre,
                "rol": form.rol,
                "activo": form.activo,
                "password_cambiada": form.password.is_some(),
            })),
    )
    .await;

    Ok(ApiResponse::ok(usuario).with_message("Usuario actualizado"))
}

/// `DELETE /api/usuarios/{id}`: soft delete (`activo = false`).
pub async fn remove(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Usuario>> {
    if id == admin.id {
        return Err(ApiError::validation("No puede desactivar su propia cuenta"));
    }

    let usuario = state.db.usuarios().deactivate(&id).await?;

    audit(
        &state,
        Some(admin.id),
        NuevoRegistro::new(AccionAuditoria::Eliminar, ENTIDAD).entidad_id(&id),
    )
    .await;

    Ok(ApiResponse::ok(usuario).with_message("Usuario desactivado"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authenticate;
    use crate::test_support::{self, PASSWORD};
    use axum::http::HeaderMap;
    use cotiza_core::Rol;
    use cotiza_db::password::verify_password;
    use cotiza_db::AuditoriaFilter;

    async fn admin(state: &AppState) -> AdminUser {
        let usuario = test_support::usuario(state, "admin@cotiza.cl", Rol::Admin).await;
        AdminUser(usuario)
    }

    #[tokio::test]
    async fn test_admin_gate() {
        let state = test_support::state().await;
        let vendedor = test_support::usuario(&state, "ana@cotiza.cl", Rol::Vendedor).await;

        let err = authenticate(&state, &HeaderMap::new()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let headers = test_support::session_headers(&state, &vendedor);
        let (_, usuario) = authenticate(&state, &headers).await.unwrap();
        let err = AdminUser::check(usuario).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_hashes_password_and_audits() {
        let state = test_support::state().await;
        let admin = admin(&state).await;
        let admin_id = admin.0.id.clone();

        let (code, response) = create(
            State(state.clone()),
            admin,
            Json(NuevoUsuario {
                email: "Pedro@Cotiza.cl".to_string(),
                nombre: "Pedro Rojas".to_string(),
                rol: Some(Rol::Vendedor),
                password: PASSWORD.to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(code, StatusCode::CREATED);
        let usuario = response.data.unwrap();
        assert_eq!(usuario.email, "pedro@cotiza.cl");

        let stored = state
            .db
            .usuarios()
            .get_by_email("pedro@cotiza.cl")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash, PASSWORD);
        assert!(verify_password(PASSWORD, &stored.password_hash));

        let registros = state
            .db
            .auditoria()
            .list(&AuditoriaFilter {
                entidad: Some(ENTIDAD.to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(registros.len(), 1);
        assert_eq!(registros[0].usuario_id.as_deref(), Some(admin_id.as_str()));
        assert!(!registros[0].detalle.as_deref().unwrap_or("").contains(PASSWORD));
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let state = test_support::state().await;
        let admin = admin(&state).await;

        let err = create(
            State(state),
            admin,
            Json(NuevoUsuario {
                email: "admin@cotiza.cl".to_string(),
                nombre: "Otro".to_string(),
                rol: None,
                password: PASSWORD.to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_password_change_is_not_audited_in_clear() {
        let state = test_support::state().await;
        let admin = admin(&state).await;
        let vendedor = test_support::usuario(&state, "ana@cotiza.cl", Rol::Vendedor).await;

        update(
            State(state.clone()),
            admin,
            Path(vendedor.id.clone()),
            Json(ActualizarUsuario {
                password: Some("NuevaClave9".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        let stored = state
            .db
            .usuarios()
            .get_by_email("ana@cotiza.cl")
            .await
            .unwrap()
            .unwrap();
        assert!(verify_password("NuevaClave9", &stored.password_hash));

        let registros = state
            .db
            .auditoria()
            .list(&AuditoriaFilter {
                entidad_id: Some(vendedor.id),
                ..Default::default()
            })
            .await
            .unwrap();
        let detalle = registros[0].detalle.clone().unwrap_or_default();
        assert!(!detalle.contains("NuevaClave9"));
        assert!(detalle.contains("password_cambiada"));
    }

    #[tokio::test]
    async fn test_self_deactivation_refused() {
        let state = test_support::state().await;
        let admin = admin(&state).await;
        let id = admin.0.id.clone();

        let err = remove(State(state.clone()), admin.clone(), Path(id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = update(
            State(state.clone()),
            admin,
            Path(id.clone()),
            Json(ActualizarUsuario {
                activo: Some(false),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let usuario = state.db.usuarios().get_by_id(&id).await.unwrap().unwrap();
        assert!(usuario.activo);
    }

    #[tokio::test]
    async fn test_deactivate_and_list() {
        let state = test_support::state().await;
        let admin = admin(&state).await;
        let vendedor = test_support::usuario(&state, "ana@cotiza.cl", Rol::Vendedor).await;

        let response = remove(State(state.clone()), admin.clone(), Path(vendedor.id.clone()))
            .await
            .unwrap();
        assert!(!response.data.unwrap().activo);

        let response = list(State(state.clone()), admin.clone(), Query(ListFilter::default()))
            .await
            .unwrap();
        assert_eq!(response.count, Some(2));

        let response = list(
            State(state.clone()),
            admin.clone(),
            Query(ListFilter {
                estado: Some("activo".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.count, Some(1));

        let err = detail(State(state), admin, Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
