//! # Auditoria Repository
//!
//! Append-only audit log. Rows are written by the API after every mutation
//! and on login/logout; nothing updates or deletes them.

use chrono::Utc;
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::{push_page, push_search};
use crate::error::DbResult;
use cotiza_core::{AccionAuditoria, ListFilter, RegistroAuditoria};

/// An entry to record.
#[derive(Debug, Clone)]
pub struct NuevoRegistro {
    pub usuario_id: Option<String>,
    pub accion: AccionAuditoria,
    /// `cliente`, `cotizacion`, `nota_venta`, ...
    pub entidad: String,
    pub entidad_id: Option<String>,
    pub detalle: Option<Value>,
}

impl NuevoRegistro {
    pub fn new(accion: AccionAuditoria, entidad: impl Into<String>) -> Self {
        NuevoRegistro {
            usuario_id: None,
            accion,
            entidad: entidad.into(),
            entidad_id: None,
            detalle: None,
        }
    }

    pub fn usuario(mut self, usuario_id: Option<String>) -> Self {
        self.usuario_id = usuario_id;
        self
    }

    pub fn entidad_id(mut self, id: impl Into<String>) -> Self {
        self.entidad_id = Some(id.into());
        self
    }

    pub fn detalle(mut self, detalle: Value) -> Self {
        self.detalle = Some(detalle);
        self
    }
}

/// List filter for the audit log.
///
/// `base.estado` is unused; `base.search` matches the detail text.
#[derive(Debug, Clone, Default)]
pub struct AuditoriaFilter {
    pub base: ListFilter,
    pub entidad: Option<String>,
    pub entidad_id: Option<String>,
    pub usuario_id: Option<String>,
    pub accion: Option<AccionAuditoria>,
}

#[derive(Debug, Clone)]
pub struct AuditoriaRepository {
    pool: SqlitePool,
}

impl AuditoriaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuditoriaRepository { pool }
    }

    /// Appends one entry and returns its id.
    pub async fn record(&self, registro: &NuevoRegistro) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        let detalle = registro.detalle.as_ref().map(Value::to_string);

        sqlx::query(
            r#"
            INSERT INTO auditoria (id, usuario_id, accion, entidad, entidad_id, detalle, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&id)
        .bind(&registro.usuario_id)
        .bind(registro.accion)
        .bind(&registro.entidad)
        .bind(&registro.entidad_id)
        .bind(detalle)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(
            accion = %registro.accion,
            entidad = %registro.entidad,
            entidad_id = ?registro.entidad_id,
            "Audit entry recorded"
        );

        Ok(id)
    }

    /// Lists entries, newest first.
    pub async fn list(&self, filter: &AuditoriaFilter) -> DbResult<Vec<RegistroAuditoria>> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            r#"
            SELECT a.id, a.usuario_id, u.nombre AS usuario_nombre, a.accion, a.entidad,
                   a.entidad_id, a.detalle, a.created_at
            FROM auditoria a
            LEFT JOIN usuarios u ON u.id = a.usuario_id
            WHERE 1=1
            "#,
        );

        for (column, value) in [
            ("a.entidad", &filter.entidad),
            ("a.entidad_id", &filter.entidad_id),
            ("a.usuario_id", &filter.usuario_id),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                qb.push(" AND ")
                    .push(column)
                    .push(" = ")
                    .push_bind(value.to_string());
            }
        }
        if let Some(accion) = filter.accion {
            qb.push(" AND a.accion = ").push_bind(accion);
        }
        push_search(&mut qb, &filter.base, &["a.detalle", "u.nombre"]);

        qb.push(" ORDER BY a.created_at DESC, a.id");
        push_page(&mut qb, &filter.base);

        let registros = qb
            .build_query_as::<RegistroAuditoria>()
            .fetch_all(&self.pool)
            .await?;
        Ok(registros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::db;
    use cotiza_core::NuevoUsuario;
    use serde_json::json;

    #[tokio::test]
    async fn test_record_and_list() {
        let db = db().await;
        let usuario = db
            .usuarios()
            .create(&NuevoUsuario {
                email: "admin@empresa.cl".to_string(),
                nombre: "Admin".to_string(),
                rol: None,
                password: "Cotiza2026".to_string(),
            })
            .await
            .unwrap();
        let repo = db.auditoria();

        repo.record(
            &NuevoRegistro::new(AccionAuditoria::Crear, "cliente")
                .usuario(Some(usuario.id.clone()))
                .entidad_id("c1")
                .detalle(json!({"rut": "12345678-5"})),
        )
        .await
        .unwrap();
        repo.record(&NuevoRegistro::new(AccionAuditoria::Login, "sesion"))
            .await
            .unwrap();

        let todos = repo.list(&AuditoriaFilter::default()).await.unwrap();
        assert_eq!(todos.len(), 2);

        let clientes = repo
            .list(&AuditoriaFilter {
                entidad: Some("cliente".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(clientes.len(), 1);
        assert_eq!(clientes[0].usuario_nombre.as_deref(), Some("Admin"));
        assert_eq!(clientes[0].accion, AccionAuditoria::Crear);
        let detalle: Value = serde_json::from_str(clientes[0].detalle.as_deref().unwrap()).unwrap();
        assert_eq!(detalle["rut"], "12345678-5");

        let logins = repo
            .list(&AuditoriaFilter {
                accion: Some(AccionAuditoria::Login),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(logins.len(), 1);
        assert!(logins[0].usuario_id.is_none());

        let buscados = repo
            .list(&AuditoriaFilter {
                base: ListFilter {
                    search: Some("12345678".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(buscados.len(), 1);
    }
}
