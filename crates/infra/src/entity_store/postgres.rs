//! Postgres-backed entity store implementation.
//!
//! One table per [`EntityKind`], each with `id BIGSERIAL PRIMARY KEY`,
//! `version BIGINT`, the entity's columns, and `ON DELETE RESTRICT` foreign
//! keys (see `migrations/0001_schema.sql`). SQL is generated from
//! [`Entity::COLUMNS`], so no per-table code is needed.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (foreign key violation) on insert/update | `23503` | `DanglingReference` |
//! | Database (foreign key violation) on delete | `23503` | `Restricted` |
//! | Database (unique violation) | `23505` | `Concurrency` |
//! | Database (check constraint violation) | `23514` | `Record` |
//! | PoolTimedOut / PoolClosed / Io | N/A | `Unavailable` |
//! | Other | Any other | `Backend` |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row as _};
use tracing::{debug, instrument};

use pharmacy_core::{
    Column, ColumnType, DomainError, Entity, ExpectedVersion, FieldValue, Filter, Row,
    SurrogateKey,
};

use super::r#trait::{check_row, EntityStore, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_schema.sql");

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Operation {
    Read,
    Write,
    Delete,
}

/// Postgres-backed entity store.
///
/// ## Thread Safety
///
/// Uses the SQLx connection pool, which is `Send + Sync`.
///
/// ## Sync bridge
///
/// [`EntityStore`] is synchronous. The trait methods run the async inherent
/// methods on the current tokio runtime handle, so they must be called from a
/// blocking context inside the runtime (e.g. `tokio::task::spawn_blocking`),
/// never directly from an async task.
#[derive(Debug, Clone)]
pub struct PostgresEntityStore {
    pool: Arc<PgPool>,
}

impl PostgresEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", Operation::Write, e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(table = %E::KIND), err)]
    pub async fn fetch<E: Entity>(&self, id: E::Id) -> Result<Option<E>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            select_list::<E>(),
            E::KIND.table_name()
        );
        let row = sqlx::query(&sql)
            .bind(id.raw())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("fetch", Operation::Read, e))?;
        row.map(|r| decode_row::<E>(&r)).transpose()
    }

    #[instrument(skip(self, filter), fields(table = %E::KIND), err)]
    pub async fn fetch_where<E: Entity>(&self, filter: &Filter) -> Result<Vec<E>, StoreError> {
        filter.check_columns(E::COLUMNS)?;

        let mut sql = format!("SELECT {} FROM {}", select_list::<E>(), E::KIND.table_name());
        for (idx, clause) in filter.clauses().iter().enumerate() {
            sql.push_str(if idx == 0 { " WHERE " } else { " AND " });
            sql.push_str(&format!(
                "{} {} ${}",
                clause.column,
                clause.op.sql_operator(),
                idx + 1
            ));
        }
        sql.push_str(" ORDER BY id");

        let mut query = sqlx::query(&sql);
        for clause in filter.clauses() {
            let column = column_of::<E>(clause.column)?;
            query = bind_value(query, column, &clause.value);
        }
        let rows = query
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("fetch_where", Operation::Read, e))?;

        debug!(rows = rows.len(), "filtered scan");
        rows.iter().map(decode_row::<E>).collect()
    }

    #[instrument(skip(self, entity), fields(table = %E::KIND), err)]
    pub async fn insert_row<E: Entity>(&self, entity: &E) -> Result<E::Id, StoreError> {
        let row = entity.to_row();
        check_row::<E>(&row)?;

        let names: Vec<&str> = E::COLUMNS.iter().map(|c| c.name).collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("${i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
            E::KIND.table_name(),
            names.join(", "),
            placeholders.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for column in E::COLUMNS {
            query = bind_value(query, column, row.get(column.name).unwrap_or(&FieldValue::Null));
        }
        let inserted = query
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert", Operation::Write, e))?;
        let id: i64 = inserted
            .try_get("id")
            .map_err(|e| map_sqlx_error("insert", Operation::Write, e))?;
        Ok(E::Id::from_raw(id))
    }

    #[instrument(skip(self, entity), fields(table = %E::KIND, id = %entity.id()), err)]
    pub async fn update_row<E: Entity>(
        &self,
        entity: &E,
        expected: ExpectedVersion,
    ) -> Result<u64, StoreError> {
        let row = entity.to_row();
        check_row::<E>(&row)?;

        let assignments: Vec<String> = E::COLUMNS
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ${}", c.name, i + 1))
            .collect();
        let id_param = E::COLUMNS.len() + 1;
        let mut sql = format!(
            "UPDATE {} SET {}, version = version + 1 WHERE id = ${id_param}",
            E::KIND.table_name(),
            assignments.join(", ")
        );
        if let ExpectedVersion::Exact(_) = expected {
            sql.push_str(&format!(" AND version = ${}", id_param + 1));
        }
        sql.push_str(" RETURNING version");

        let mut query = sqlx::query(&sql);
        for column in E::COLUMNS {
            query = bind_value(query, column, row.get(column.name).unwrap_or(&FieldValue::Null));
        }
        query = query.bind(entity.id().raw());
        if let ExpectedVersion::Exact(v) = expected {
            query = query.bind(to_db_version(v)?);
        }

        let updated = query
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update", Operation::Write, e))?;

        match updated {
            Some(r) => {
                let version: i64 = r
                    .try_get("version")
                    .map_err(|e| map_sqlx_error("update", Operation::Write, e))?;
                from_db_version(version)
            }
            None => {
                // Either the row is gone or its version moved on.
                let exists_sql = format!(
                    "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1) AS present",
                    E::KIND.table_name()
                );
                let present: bool = sqlx::query(&exists_sql)
                    .bind(entity.id().raw())
                    .fetch_one(&*self.pool)
                    .await
                    .and_then(|r| r.try_get("present"))
                    .map_err(|e| map_sqlx_error("update", Operation::Read, e))?;
                if present {
                    Err(StoreError::Concurrency(format!(
                        "{} row {}: expected {expected:?}",
                        E::KIND,
                        entity.id()
                    )))
                } else {
                    Err(StoreError::not_found::<E>(entity.id()))
                }
            }
        }
    }

    #[instrument(skip(self), fields(table = %E::KIND), err)]
    pub async fn delete_row<E: Entity>(&self, id: E::Id) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", E::KIND.table_name());
        let result = sqlx::query(&sql)
            .bind(id.raw())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", Operation::Delete, e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<E>(id));
        }
        Ok(())
    }

    fn runtime() -> Result<tokio::runtime::Handle, StoreError> {
        tokio::runtime::Handle::try_current().map_err(|_| {
            StoreError::Unavailable(
                "PostgresEntityStore requires a tokio runtime; call it from spawn_blocking"
                    .to_string(),
            )
        })
    }
}

impl EntityStore for PostgresEntityStore {
    fn get<E: Entity>(&self, id: E::Id) -> Result<Option<E>, StoreError> {
        Self::runtime()?.block_on(self.fetch::<E>(id))
    }

    fn find_where<E: Entity>(&self, filter: &Filter) -> Result<Vec<E>, StoreError> {
        Self::runtime()?.block_on(self.fetch_where::<E>(filter))
    }

    fn insert<E: Entity>(&self, entity: &E) -> Result<E::Id, StoreError> {
        Self::runtime()?.block_on(self.insert_row(entity))
    }

    fn update<E: Entity>(&self, entity: &E, expected: ExpectedVersion) -> Result<u64, StoreError> {
        Self::runtime()?.block_on(self.update_row(entity, expected))
    }

    fn delete<E: Entity>(&self, id: E::Id) -> Result<(), StoreError> {
        Self::runtime()?.block_on(self.delete_row::<E>(id))
    }
}

fn select_list<E: Entity>() -> String {
    let mut names = vec!["id", "version"];
    names.extend(E::COLUMNS.iter().map(|c| c.name));
    names.join(", ")
}

fn column_of<E: Entity>(name: &str) -> Result<&'static Column, StoreError> {
    E::COLUMNS
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| DomainError::validation(format!("unknown column '{name}'")).into())
}

fn to_db_version(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::Backend(format!("version {version} overflows BIGINT")))
}

fn from_db_version(version: i64) -> Result<u64, StoreError> {
    u64::try_from(version).map_err(|_| StoreError::Backend(format!("negative row version {version}")))
}

fn bind_value<'q>(query: PgQuery<'q>, column: &Column, value: &FieldValue) -> PgQuery<'q> {
    match value {
        FieldValue::Int(v) => query.bind(*v),
        FieldValue::Bool(v) => query.bind(*v),
        FieldValue::Text(v) => query.bind(v.clone()),
        FieldValue::Timestamp(v) => query.bind(*v),
        FieldValue::Null => match column.ty {
            ColumnType::Int => query.bind(None::<i64>),
            ColumnType::Bool => query.bind(None::<bool>),
            ColumnType::Text => query.bind(None::<String>),
            ColumnType::Timestamp => query.bind(None::<DateTime<Utc>>),
        },
    }
}

fn decode_row<E: Entity>(pg: &PgRow) -> Result<E, StoreError> {
    let read = |e: sqlx::Error| map_sqlx_error("decode", Operation::Read, e);

    let id: i64 = pg.try_get("id").map_err(read)?;
    let version: i64 = pg.try_get("version").map_err(read)?;

    let mut row = Row::new();
    for column in E::COLUMNS {
        let value = match (column.ty, column.nullable) {
            (ColumnType::Int, false) => FieldValue::Int(pg.try_get(column.name).map_err(read)?),
            (ColumnType::Int, true) => pg.try_get::<Option<i64>, _>(column.name).map_err(read)?.into(),
            (ColumnType::Bool, false) => FieldValue::Bool(pg.try_get(column.name).map_err(read)?),
            (ColumnType::Bool, true) => pg.try_get::<Option<bool>, _>(column.name).map_err(read)?.into(),
            (ColumnType::Text, false) => FieldValue::Text(pg.try_get(column.name).map_err(read)?),
            (ColumnType::Text, true) => pg.try_get::<Option<String>, _>(column.name).map_err(read)?.into(),
            (ColumnType::Timestamp, false) => {
                FieldValue::Timestamp(pg.try_get(column.name).map_err(read)?)
            }
            (ColumnType::Timestamp, true) => pg
                .try_get::<Option<DateTime<Utc>>, _>(column.name)
                .map_err(read)?
                .into(),
        };
        row.set(column.name, value);
    }

    Ok(E::from_row(E::Id::from_raw(id), from_db_version(version)?, &row)?)
}

fn map_sqlx_error(operation: &str, kind: Operation, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23503") if kind == Operation::Delete => StoreError::Restricted(msg),
                Some("23503") => StoreError::DanglingReference(msg),
                Some("23505") => StoreError::Concurrency(msg),
                Some("23514") => StoreError::Record(DomainError::validation(msg)),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{operation}: {err}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}
