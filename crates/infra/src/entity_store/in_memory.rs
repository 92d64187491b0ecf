use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use pharmacy_core::{
    Entity, EntityKind, ExpectedVersion, FieldValue, Filter, Reference, Row, SurrogateKey,
};

use super::r#trait::{check_row, EntityStore, StoreError, INITIAL_VERSION};

#[derive(Debug, Clone)]
struct StoredRow {
    version: u64,
    row: Row,
}

#[derive(Debug, Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, StoredRow>,
}

#[derive(Debug, Default)]
struct Tables {
    tables: HashMap<EntityKind, Table>,
    /// Foreign keys declared by every table that has received a row.
    references: HashMap<EntityKind, &'static [Reference]>,
}

impl Tables {
    fn contains(&self, kind: EntityKind, id: i64) -> bool {
        self.tables
            .get(&kind)
            .is_some_and(|t| t.rows.contains_key(&id))
    }

    fn check_references<E: Entity>(&self, row: &Row) -> Result<(), StoreError> {
        for reference in E::REFERENCES {
            match row.get(reference.column) {
                Some(FieldValue::Int(target)) if self.contains(reference.target, *target) => {}
                Some(FieldValue::Null) => {}
                Some(value) => {
                    return Err(StoreError::DanglingReference(format!(
                        "{}.{} = {:?} has no matching {} row",
                        E::KIND,
                        reference.column,
                        value,
                        reference.target
                    )));
                }
                None => {
                    return Err(StoreError::DanglingReference(format!(
                        "{}.{} is missing",
                        E::KIND,
                        reference.column
                    )));
                }
            }
        }
        Ok(())
    }

    /// `ON DELETE RESTRICT`: fail if any row still points at `(kind, id)`.
    fn check_not_referenced(&self, kind: EntityKind, id: i64) -> Result<(), StoreError> {
        for (source, references) in &self.references {
            let Some(table) = self.tables.get(source) else {
                continue;
            };
            for reference in references.iter().filter(|r| r.target == kind) {
                let referenced = table
                    .rows
                    .values()
                    .any(|stored| stored.row.get(reference.column) == Some(&FieldValue::Int(id)));
                if referenced {
                    return Err(StoreError::Restricted(format!(
                        "{kind} row {id} is referenced by {source}.{}",
                        reference.column
                    )));
                }
            }
        }
        Ok(())
    }
}

/// In-memory entity store.
///
/// Intended for tests/dev. Not optimized for performance. Foreign keys are
/// enforced by default, mirroring the Postgres schema.
#[derive(Debug)]
pub struct InMemoryEntityStore {
    inner: RwLock<Tables>,
    enforce_foreign_keys: bool,
}

impl Default for InMemoryEntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Tables::default()),
            enforce_foreign_keys: true,
        }
    }

    /// A store without foreign-key enforcement, so guard behaviour can be
    /// observed without the backstop.
    pub fn without_foreign_keys() -> Self {
        Self {
            inner: RwLock::new(Tables::default()),
            enforce_foreign_keys: false,
        }
    }

    /// Number of rows currently stored for `kind`.
    pub fn count(&self, kind: EntityKind) -> Result<usize, StoreError> {
        let tables = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(tables.tables.get(&kind).map_or(0, |table| table.rows.len()))
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("lock poisoned".to_string())
    }

    fn decode<E: Entity>(id: i64, stored: &StoredRow) -> Result<E, StoreError> {
        Ok(E::from_row(E::Id::from_raw(id), stored.version, &stored.row)?)
    }
}

impl EntityStore for InMemoryEntityStore {
    fn get<E: Entity>(&self, id: E::Id) -> Result<Option<E>, StoreError> {
        let tables = self.inner.read().map_err(|_| Self::poisoned())?;
        tables
            .tables
            .get(&E::KIND)
            .and_then(|t| t.rows.get(&id.raw()))
            .map(|stored| Self::decode::<E>(id.raw(), stored))
            .transpose()
    }

    fn find_where<E: Entity>(&self, filter: &Filter) -> Result<Vec<E>, StoreError> {
        filter.check_columns(E::COLUMNS)?;
        let tables = self.inner.read().map_err(|_| Self::poisoned())?;
        let Some(table) = tables.tables.get(&E::KIND) else {
            return Ok(vec![]);
        };
        table
            .rows
            .iter()
            .filter(|(_, stored)| filter.matches(&stored.row))
            .map(|(id, stored)| Self::decode::<E>(*id, stored))
            .collect()
    }

    fn insert<E: Entity>(&self, entity: &E) -> Result<E::Id, StoreError> {
        let row = entity.to_row();
        check_row::<E>(&row)?;

        let mut tables = self.inner.write().map_err(|_| Self::poisoned())?;
        if self.enforce_foreign_keys {
            tables.check_references::<E>(&row)?;
        }
        tables.references.entry(E::KIND).or_insert(E::REFERENCES);

        let table = tables.tables.entry(E::KIND).or_default();
        table.last_id += 1;
        let id = table.last_id;
        table.rows.insert(
            id,
            StoredRow {
                version: INITIAL_VERSION,
                row,
            },
        );
        Ok(E::Id::from_raw(id))
    }

    fn update<E: Entity>(&self, entity: &E, expected: ExpectedVersion) -> Result<u64, StoreError> {
        let row = entity.to_row();
        check_row::<E>(&row)?;
        let id = entity.id().raw();

        let mut tables = self.inner.write().map_err(|_| Self::poisoned())?;
        let current = tables
            .tables
            .get(&E::KIND)
            .and_then(|t| t.rows.get(&id))
            .map(|stored| stored.version)
            .ok_or_else(|| StoreError::not_found::<E>(entity.id()))?;

        if !expected.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "{} row {id}: expected {expected:?}, found {current}",
                E::KIND
            )));
        }
        if self.enforce_foreign_keys {
            tables.check_references::<E>(&row)?;
        }

        let next = current + 1;
        if let Some(stored) = tables
            .tables
            .get_mut(&E::KIND)
            .and_then(|t| t.rows.get_mut(&id))
        {
            stored.version = next;
            stored.row = row;
        }
        Ok(next)
    }

    fn delete<E: Entity>(&self, id: E::Id) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| Self::poisoned())?;
        if !tables.contains(E::KIND, id.raw()) {
            return Err(StoreError::not_found::<E>(id));
        }
        if self.enforce_foreign_keys {
            tables.check_not_referenced(E::KIND, id.raw())?;
        }
        if let Some(table) = tables.tables.get_mut(&E::KIND) {
            table.rows.remove(&id.raw());
        }
        Ok(())
    }
}
