//! # Obra Repository
//!
//! Construction projects. Each project belongs to one client; lists carry
//! the client's name flattened in as `cliente_nombre`.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{clean_text, merge_text, push_page, push_search};
use crate::error::{DbError, DbResult};
use cotiza_core::{ActualizarObra, ListFilter, NuevaObra, Obra, ObraEstado};

const SELECT_OBRA: &str = r#"
    SELECT
        o.id, o.cliente_id, c.nombre_razon_social AS cliente_nombre,
        o.nombre, o.direccion, o.comuna, o.estado,
        o.fecha_inicio, o.fecha_termino, o.descripcion,
        o.created_at, o.updated_at
    FROM obras o
    LEFT JOIN clientes c ON c.id = o.cliente_id
"#;

/// List filter for projects.
#[derive(Debug, Clone, Default)]
pub struct ObraFilter {
    pub base: ListFilter,
    pub cliente_id: Option<String>,
}

/// Repository for construction project operations.
#[derive(Debug, Clone)]
pub struct ObraRepository {
    pool: SqlitePool,
}

impl ObraRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ObraRepository { pool }
    }

    /// Lists projects, newest first.
    pub async fn list(&self, filter: &ObraFilter) -> DbResult<Vec<Obra>> {
        let estado = filter.base.estado_as::<ObraEstado>()?;

        debug!(search = ?filter.base.search, estado = ?estado, cliente_id = ?filter.cliente_id, "Listing obras");

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(SELECT_OBRA);
        qb.push(" WHERE 1=1");

        if let Some(estado) = estado {
            qb.push(" AND o.estado = ").push_bind(estado);
        }
        if let Some(cliente_id) = filter.cliente_id.as_deref().filter(|c| !c.is_empty()) {
            qb.push(" AND o.cliente_id = ").push_bind(cliente_id.to_string());
        }
        push_search(
            &mut qb,
            &filter.base,
            &["o.nombre", "o.direccion", "o.comuna", "c.nombre_razon_social"],
        );

        qb.push(" ORDER BY o.created_at DESC, o.id");
        push_page(&mut qb, &filter.base);

        let obras = qb.build_query_as::<Obra>().fetch_all(&self.pool).await?;
        Ok(obras)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Obra>> {
        let obra = sqlx::query_as::<_, Obra>(&format!("{} WHERE o.id = ?1", SELECT_OBRA))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(obra)
    }

    /// Creates a project for an existing client.
    pub async fn create(&self, form: &NuevaObra) -> DbResult<Obra> {
        form.validate()?;

        let cliente_exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM clientes WHERE id = ?1")
                .bind(&form.cliente_id)
                .fetch_optional(&self.pool)
                .await?;
        if cliente_exists.is_none() {
            return Err(DbError::not_found("Cliente", &form.cliente_id));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO obras (
                id, cliente_id, nombre, direccion, comuna, estado,
                fecha_inicio, fecha_termino, descripcion, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            "#,
        )
        .bind(&id)
        .bind(&form.cliente_id)
        .bind(form.nombre.trim())
        .bind(clean_text(&form.direccion))
        .bind(clean_text(&form.comuna))
        .bind(form.estado.unwrap_or_default())
        .bind(form.fecha_inicio)
        .bind(form.fecha_termino)
        .bind(clean_text(&form.descripcion))
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(id = %id, cliente_id = %form.cliente_id, "Obra created");

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Obra", &id))
    }

    /// Applies a partial update.
    pub async fn update(&self, id: &str, form: &ActualizarObra) -> DbResult<Obra> {
        form.validate()?;
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Obra", id))?;

        let fecha_inicio = form.fecha_inicio.or(current.fecha_inicio);
        let fecha_termino = form.fecha_termino.or(current.fecha_termino);
        // Re-check the range against stored dates
        ActualizarObra {
            fecha_inicio,
            fecha_termino,
            ..Default::default()
        }
        .validate()?;

        sqlx::query(
            r#"
            UPDATE obras SET
                nombre = ?2, direccion = ?3, comuna = ?4, estado = ?5,
                fecha_inicio = ?6, fecha_termino = ?7, descripcion = ?8, updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(
            form.nombre
                .as_deref()
                .map(|n| n.trim().to_string())
                .unwrap_or(current.nombre),
        )
        .bind(merge_text(current.direccion, &form.direccion))
        .bind(merge_text(current.comuna, &form.comuna))
        .bind(form.estado.unwrap_or(current.estado))
        .bind(fecha_inicio)
        .bind(fecha_termino)
        .bind(merge_text(current.descripcion, &form.descripcion))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        info!(id = %id, "Obra updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Obra", id))
    }

    /// Soft delete: marks the project `cancelada`.
    pub async fn cancel(&self, id: &str) -> DbResult<Obra> {
        let result = sqlx::query("UPDATE obras SET estado = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(ObraEstado::Cancelada)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Obra", id));
        }

        info!(id = %id, "Obra cancelled");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Obra", id))
    }

    /// Projects in `planificacion` or `en_curso`.
    pub async fn count_active(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM obras WHERE estado IN (?1, ?2)")
                .bind(ObraEstado::Planificacion)
                .bind(ObraEstado::EnCurso)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
