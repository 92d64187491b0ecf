use std::sync::Arc;

use thiserror::Error;

use pharmacy_core::{DomainError, Entity, EntityKind, ExpectedVersion, Filter};

/// Version assigned to a freshly inserted row.
pub const INITIAL_VERSION: u64 = 1;

/// Entity store operation error.
///
/// These are **store-boundary errors** (missing rows, stale versions,
/// constraint backstops, connectivity) as opposed to domain errors.
///
/// ## Error Categories
///
/// - **NotFound**: the addressed row does not exist
/// - **Concurrency**: the row's version advanced since it was read
/// - **DanglingReference** / **Restricted**: foreign-key backstop on write / delete
/// - **Unavailable**: transient infrastructure failure (timeouts, connection loss)
/// - **Backend**: any other, non-transient store failure
/// - **Record**: a row failed to encode/decode against its column list
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} row {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("foreign key does not resolve: {0}")]
    DanglingReference(String),

    #[error("row is still referenced: {0}")]
    Restricted(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store backend failure: {0}")]
    Backend(String),

    #[error("invalid record: {0}")]
    Record(#[from] DomainError),
}

impl StoreError {
    /// Transient failures may succeed on retry; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    pub fn not_found<E: Entity>(id: E::Id) -> Self {
        use pharmacy_core::SurrogateKey;
        StoreError::NotFound {
            kind: E::KIND,
            id: id.raw(),
        }
    }
}

/// Durable record storage with row versioning.
///
/// ## Design Principles
///
/// - **No storage assumptions**: works with the in-memory adapter (tests/dev)
///   and the Postgres adapter (production)
/// - **Generic over records**: adapters persist any [`Entity`] through its
///   column codec, so there is no per-table code
/// - **Optimistic locking**: via [`ExpectedVersion`] on `update`
///
/// ## Semantics
///
/// - `insert` ignores the record's key and version, generates a key, and
///   stores the row at [`INITIAL_VERSION`]
/// - `update` fails with `NotFound` if the row is gone and with `Concurrency`
///   if `expected` does not match the stored version; on success the version
///   is incremented and returned
/// - `delete` fails with `NotFound` if the row is gone
/// - `find_where` returns rows in key order
///
/// Every operation may fail with `Unavailable`/`Backend`.
pub trait EntityStore: Send + Sync {
    fn get<E: Entity>(&self, id: E::Id) -> Result<Option<E>, StoreError>;

    fn find_where<E: Entity>(&self, filter: &Filter) -> Result<Vec<E>, StoreError>;

    fn insert<E: Entity>(&self, entity: &E) -> Result<E::Id, StoreError>;

    fn update<E: Entity>(&self, entity: &E, expected: ExpectedVersion) -> Result<u64, StoreError>;

    fn delete<E: Entity>(&self, id: E::Id) -> Result<(), StoreError>;

    fn exists<E: Entity>(&self, id: E::Id) -> Result<bool, StoreError> {
        Ok(self.get::<E>(id)?.is_some())
    }

    fn any_where<E: Entity>(&self, filter: &Filter) -> Result<bool, StoreError> {
        Ok(!self.find_where::<E>(filter)?.is_empty())
    }
}

impl<S> EntityStore for Arc<S>
where
    S: EntityStore,
{
    fn get<E: Entity>(&self, id: E::Id) -> Result<Option<E>, StoreError> {
        (**self).get(id)
    }

    fn find_where<E: Entity>(&self, filter: &Filter) -> Result<Vec<E>, StoreError> {
        (**self).find_where(filter)
    }

    fn insert<E: Entity>(&self, entity: &E) -> Result<E::Id, StoreError> {
        (**self).insert(entity)
    }

    fn update<E: Entity>(&self, entity: &E, expected: ExpectedVersion) -> Result<u64, StoreError> {
        (**self).update(entity, expected)
    }

    fn delete<E: Entity>(&self, id: E::Id) -> Result<(), StoreError> {
        (**self).delete::<E>(id)
    }
}

/// Check an encoded row against the table's column list before writing.
pub(crate) fn check_row<E: Entity>(row: &pharmacy_core::Row) -> Result<(), StoreError> {
    for column in E::COLUMNS {
        let value = row.get(column.name).ok_or_else(|| {
            DomainError::validation(format!("{}: missing column '{}'", E::KIND, column.name))
        })?;
        if !value.fits(column) {
            return Err(DomainError::validation(format!(
                "{}: column '{}' cannot hold a {} value",
                E::KIND,
                column.name,
                value.type_name()
            ))
            .into());
        }
    }
    if row.len() != E::COLUMNS.len() {
        return Err(DomainError::validation(format!(
            "{}: row has {} columns, table has {}",
            E::KIND,
            row.len(),
            E::COLUMNS.len()
        ))
        .into());
    }
    Ok(())
}
