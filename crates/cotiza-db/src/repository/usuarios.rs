//! # Usuario Repository
//!
//! Application users. `Usuario` never carries the password hash; only
//! [`UsuarioConHash`] (used by login) does.

use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{activo_filter, push_page, push_search};
use crate::error::{DbError, DbResult};
use crate::password::hash_password;
use cotiza_core::validation::validate_password;
use cotiza_core::{ActualizarUsuario, ListFilter, NuevoUsuario, Rol, Usuario};

const SELECT_USUARIO: &str = r#"
    SELECT id, email, nombre, rol, activo, ultimo_acceso, created_at, updated_at
    FROM usuarios
"#;

/// A user row together with its password hash.
#[derive(Debug, Clone, FromRow)]
pub struct UsuarioConHash {
    #[sqlx(flatten)]
    pub usuario: Usuario,
    pub password_hash: String,
}

/// Repository for user administration.
#[derive(Debug, Clone)]
pub struct UsuarioRepository {
    pool: SqlitePool,
}

impl UsuarioRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UsuarioRepository { pool }
    }

    /// Lists users ordered by name. `estado` accepts `activo` / `inactivo`.
    pub async fn list(&self, filter: &ListFilter) -> DbResult<Vec<Usuario>> {
        let activo = activo_filter(filter)?;

        debug!(search = ?filter.search, activo = ?activo, "Listing usuarios");

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_USUARIO);
        qb.push(" WHERE 1=1");

        if let Some(activo) = activo {
            qb.push(" AND activo = ").push_bind(activo);
        }
        push_search(&mut qb, filter, &["nombre", "email"]);

        qb.push(" ORDER BY nombre COLLATE NOCASE, id");
        push_page(&mut qb, filter);

        let usuarios = qb.build_query_as::<Usuario>().fetch_all(&self.pool).await?;
        Ok(usuarios)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Usuario>> {
        let usuario = sqlx::query_as::<_, Usuario>(&format!("{} WHERE id = ?1", SELECT_USUARIO))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(usuario)
    }

    /// Looks a user up by email (case-insensitive), including the hash.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<UsuarioConHash>> {
        let usuario = sqlx::query_as::<_, UsuarioConHash>(
            r#"
            SELECT id, email, nombre, rol, activo, ultimo_acceso, created_at, updated_at,
                   password_hash
            FROM usuarios
            WHERE email = ?1 COLLATE NOCASE
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(usuario)
    }

    /// Creates a user after checking the password policy.
    pub async fn create(&self, form: &NuevoUsuario) -> DbResult<Usuario> {
        form.validate()?;

        let id = Uuid::new_v4().to_string();
        let email = form.email.trim().to_lowercase();
        let password_hash = hash_password(&form.password)?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO usuarios (
                id, email, nombre, rol, password_hash, activo, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)
            "#,
        )
        .bind(&id)
        .bind(&email)
        .bind(form.nombre.trim())
        .bind(form.rol.unwrap_or_default())
        .bind(&password_hash)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&email))?;

        info!(id = %id, email = %email, "Usuario created");

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Usuario", &id))
    }

    /// Applies a partial update; a new password is re-hashed.
    pub async fn update(&self, id: &str, form: &ActualizarUsuario) -> DbResult<Usuario> {
        form.validate()?;
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Usuario", id))?;

        let nombre = form
            .nombre
            .as_deref()
            .map(|n| n.trim().to_string())
            .unwrap_or(current.nombre);
        let rol: Rol = form.rol.unwrap_or(current.rol);

        sqlx::query("UPDATE usuarios SET nombre = ?2, rol = ?3, activo = ?4, updated_at = ?5 WHERE id = ?1")
            .bind(id)
            .bind(&nombre)
            .bind(rol)
            .bind(form.activo.unwrap_or(current.activo))
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if let Some(password) = &form.password {
            self.set_password(id, password).await?;
        }

        info!(id = %id, rol = %rol, "Usuario updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Usuario", id))
    }

    /// Soft delete: `activo = false`.
    pub async fn deactivate(&self, id: &str) -> DbResult<Usuario> {
        let result = sqlx::query("UPDATE usuarios SET activo = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Usuario", id));
        }

        info!(id = %id, "Usuario deactivated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Usuario", id))
    }

    /// Replaces the password after checking the policy.
    pub async fn set_password(&self, id: &str, password: &str) -> DbResult<()> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let result = sqlx::query("UPDATE usuarios SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(&password_hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Usuario", id));
        }

        info!(id = %id, "Password changed");
        Ok(())
    }

    /// Records a successful login.
    pub async fn touch_last_access(&self, id: &str) -> DbResult<()> {
        sqlx::query("UPDATE usuarios SET ultimo_acceso = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM usuarios")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
