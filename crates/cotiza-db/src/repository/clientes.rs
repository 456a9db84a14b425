//! # Cliente Repository
//!
//! Database operations for clients.
//!
//! ## Key Operations
//! - Search over name, RUT and email
//! - RUT stored normalized (`12345678-5`) and unique
//! - Soft delete: `estado = 'inactivo'`

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{clean_text, merge_text, push_page};
use crate::error::{DbError, DbResult};
use cotiza_core::{ActualizarCliente, Cliente, ClienteEstado, ListFilter, NuevoCliente};

const SELECT_CLIENTE: &str = r#"
    SELECT
        id, rut, nombre_razon_social, giro, email, telefono,
        direccion, comuna, ciudad, contacto, estado, created_at, updated_at
    FROM clientes
"#;

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClienteRepository {
    pool: SqlitePool,
}

impl ClienteRepository {
    /// Creates a new ClienteRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClienteRepository { pool }
    }

    /// Lists clients ordered by name.
    ///
    /// `search` matches name, RUT (with or without dots) and email;
    /// `estado` must be `activo` or `inactivo`.
    pub async fn list(&self, filter: &ListFilter) -> DbResult<Vec<Cliente>> {
        let estado = filter.estado_as::<ClienteEstado>()?;

        debug!(search = ?filter.search, estado = ?estado, "Listing clientes");

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_CLIENTE);
        qb.push(" WHERE 1=1");

        if let Some(estado) = estado {
            qb.push(" AND estado = ").push_bind(estado);
        }

        if let Some(pattern) = filter.search_pattern() {
            // "12.345" should find "12345678-5"
            let rut_pattern = ListFilter {
                search: filter.search.as_ref().map(|s| s.replace('.', "")),
                ..ListFilter::default()
            }
            .search_pattern()
            .unwrap_or_else(|| pattern.clone());

            qb.push(" AND (nombre_razon_social LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR email LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\' OR rut LIKE ")
                .push_bind(rut_pattern)
                .push(" ESCAPE '\\')");
        }

        qb.push(" ORDER BY nombre_razon_social COLLATE NOCASE, id");
        push_page(&mut qb, filter);

        let clientes = qb.build_query_as::<Cliente>().fetch_all(&self.pool).await?;

        debug!(count = clientes.len(), "Listed clientes");
        Ok(clientes)
    }

    /// Gets a client by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Cliente>> {
        let cliente = sqlx::query_as::<_, Cliente>(&format!("{} WHERE id = ?1", SELECT_CLIENTE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(cliente)
    }

    /// Gets a client by RUT (any accepted format).
    pub async fn get_by_rut(&self, rut: &str) -> DbResult<Option<Cliente>> {
        let rut = cotiza_core::validation::normalize_rut(rut)?;

        let cliente = sqlx::query_as::<_, Cliente>(&format!("{} WHERE rut = ?1", SELECT_CLIENTE))
            .bind(rut)
            .fetch_optional(&self.pool)
            .await?;

        Ok(cliente)
    }

    /// Creates a client.
    ///
    /// ## Errors
    /// - `DbError::Core(Validation)` for a bad RUT/email/name
    /// - `DbError::UniqueViolation` when the RUT already exists
    pub async fn create(&self, form: &NuevoCliente) -> DbResult<Cliente> {
        let form = form.validated()?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO clientes (
                id, rut, nombre_razon_social, giro, email, telefono,
                direccion, comuna, ciudad, contacto, estado, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            "#,
        )
        .bind(&id)
        .bind(&form.rut)
        .bind(&form.nombre_razon_social)
        .bind(clean_text(&form.giro))
        .bind(clean_text(&form.email))
        .bind(clean_text(&form.telefono))
        .bind(clean_text(&form.direccion))
        .bind(clean_text(&form.comuna))
        .bind(clean_text(&form.ciudad))
        .bind(clean_text(&form.contacto))
        .bind(ClienteEstado::Activo)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&form.rut))?;

        info!(id = %id, rut = %form.rut, "Cliente created");

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Cliente", &id))
    }

    /// Applies a partial update.
    pub async fn update(&self, id: &str, form: &ActualizarCliente) -> DbResult<Cliente> {
        let form = form.validated()?;
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Cliente", id))?;

        let rut = form.rut.clone().unwrap_or(current.rut);
        let nombre = form
            .nombre_razon_social
            .as_deref()
            .map(|n| n.trim().to_string())
            .unwrap_or(current.nombre_razon_social);

        sqlx::query(
            r#"
            UPDATE clientes SET
                rut = ?2, nombre_razon_social = ?3, giro = ?4, email = ?5,
                telefono = ?6, direccion = ?7, comuna = ?8, ciudad = ?9,
                contacto = ?10, estado = ?11, updated_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&rut)
        .bind(nombre)
        .bind(merge_text(current.giro, &form.giro))
        .bind(merge_text(current.email, &form.email))
        .bind(merge_text(current.telefono, &form.telefono))
        .bind(merge_text(current.direccion, &form.direccion))
        .bind(merge_text(current.comuna, &form.comuna))
        .bind(merge_text(current.ciudad, &form.ciudad))
        .bind(merge_text(current.contacto, &form.contacto))
        .bind(form.estado.unwrap_or(current.estado))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&rut))?;

        info!(id = %id, "Cliente updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Cliente", id))
    }

    /// Soft delete: marks the client `inactivo`. The row stays readable.
    pub async fn deactivate(&self, id: &str) -> DbResult<Cliente> {
        let result = sqlx::query("UPDATE clientes SET estado = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(ClienteEstado::Inactivo)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cliente", id));
        }

        info!(id = %id, "Cliente deactivated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Cliente", id))
    }

    /// Number of active clients.
    pub async fn count_active(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clientes WHERE estado = ?1")
            .bind(ClienteEstado::Activo)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{cliente, db};

    #[tokio::test]
    async fn test_create_normalizes_rut() {
        let db = db().await;
        let created = cliente(&db, "12.345.678-5", "Constructora Andes SpA").await;

        assert_eq!(created.rut, "12345678-5");
        assert_eq!(created.estado, ClienteEstado::Activo);

        let by_rut = db.clientes().get_by_rut("123456785").await.unwrap().unwrap();
        assert_eq!(by_rut.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_rut_rejected() {
        let db = db().await;
        cliente(&db, "12.345.678-5", "Primero").await;

        let err = db
            .clientes()
            .create(&NuevoCliente {
                rut: "12345678-5".to_string(),
                nombre_razon_social: "Segundo".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "rut");
                assert_eq!(value, "12345678-5");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_rut_rejected() {
        let db = db().await;
        let err = db
            .clientes()
            .create(&NuevoCliente {
                rut: "12.345.678-9".to_string(),
                nombre_razon_social: "X".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(_)));
    }

    #[tokio::test]
    async fn test_list_search_and_estado() {
        let db = db().await;
        cliente(&db, "12.345.678-5", "Constructora Andes SpA").await;
        let sur = cliente(&db, "11.111.111-1", "Ferretería Sur").await;
        cliente(&db, "76.086.428-5", "Inmobiliaria Pacífico").await;
        db.clientes().deactivate(&sur.id).await.unwrap();

        let repo = db.clientes();

        let all = repo.list(&ListFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        // Ordered by name
        assert_eq!(all[0].nombre_razon_social, "Constructora Andes SpA");

        let found = repo
            .list(&ListFilter {
                search: Some("andes".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let by_dotted_rut = repo
            .list(&ListFilter {
                search: Some("76.086".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_dotted_rut.len(), 1);
        assert_eq!(by_dotted_rut[0].nombre_razon_social, "Inmobiliaria Pacífico");

        let activos = repo
            .list(&ListFilter {
                estado: Some("activo".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(activos.len(), 2);

        let bad = repo
            .list(&ListFilter {
                estado: Some("borrado".to_string()),
                ..Default::default()
            })
            .await;
        assert!(bad.is_err());
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let db = db().await;
        cliente(&db, "12.345.678-5", "A").await;
        cliente(&db, "11.111.111-1", "B").await;
        cliente(&db, "76.086.428-5", "C").await;

        let page = db
            .clientes()
            .list(&ListFilter {
                limit: Some(2),
                offset: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();

        let names: Vec<_> = page.iter().map(|c| c.nombre_razon_social.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn test_update_partial() {
        let db = db().await;
        let created = cliente(&db, "12.345.678-5", "Andes").await;

        let updated = db
            .clientes()
            .update(
                &created.id,
                &ActualizarCliente {
                    email: Some("compras@andes.cl".to_string()),
                    comuna: Some("Concepción".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.nombre_razon_social, "Andes");
        assert_eq!(updated.email.as_deref(), Some("compras@andes.cl"));
        assert_eq!(updated.comuna.as_deref(), Some("Concepción"));
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_row() {
        let db = db().await;
        let created = cliente(&db, "12.345.678-5", "Andes").await;

        let deactivated = db.clientes().deactivate(&created.id).await.unwrap();
        assert_eq!(deactivated.estado, ClienteEstado::Inactivo);

        let still_there = db.clientes().get_by_id(&created.id).await.unwrap();
        assert!(still_there.is_some());
        assert_eq!(db.clientes().count_active().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_client() {
        let db = db().await;
        assert!(db.clientes().get_by_id("nope").await.unwrap().is_none());
        assert!(matches!(
            db.clientes().deactivate("nope").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
