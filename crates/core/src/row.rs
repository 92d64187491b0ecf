//! Column-level representation of persisted records.
//!
//! Store adapters never see concrete record types; they move [`Row`]s of
//! [`FieldValue`]s described by each entity's [`Column`] list.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{DomainError, DomainResult};

/// SQL-level type of a column.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Bool,
    Text,
    Timestamp,
}

/// Static description of a persisted column (excluding `id` and `version`,
/// which every table carries and the store manages).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
}

impl Column {
    pub const fn required(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
        }
    }

    pub const fn nullable(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
        }
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldValue {
    Null,
    Int(i64),
    Bool(bool),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Int(_) => "int",
            FieldValue::Bool(_) => "bool",
            FieldValue::Text(_) => "text",
            FieldValue::Timestamp(_) => "timestamp",
        }
    }

    /// Whether the value may be stored in a column of type `ty`.
    pub fn fits(&self, column: &Column) -> bool {
        match (self, column.ty) {
            (FieldValue::Null, _) => column.nullable,
            (FieldValue::Int(_), ColumnType::Int)
            | (FieldValue::Bool(_), ColumnType::Bool)
            | (FieldValue::Text(_), ColumnType::Text)
            | (FieldValue::Timestamp(_), ColumnType::Timestamp) => true,
            _ => false,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Column name → value map for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: BTreeMap<&'static str, FieldValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &'static str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name, value.into());
        self
    }

    pub fn set(&mut self, name: &'static str, value: impl Into<FieldValue>) {
        self.fields.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn require(&self, name: &str) -> DomainResult<&FieldValue> {
        self.fields
            .get(name)
            .ok_or_else(|| DomainError::decode(format!("missing column '{name}'")))
    }

    fn mismatch(name: &str, expected: &str, found: &FieldValue) -> DomainError {
        DomainError::decode(format!(
            "column '{name}': expected {expected}, found {}",
            found.type_name()
        ))
    }

    pub fn int(&self, name: &str) -> DomainResult<i64> {
        match self.require(name)? {
            FieldValue::Int(v) => Ok(*v),
            other => Err(Self::mismatch(name, "int", other)),
        }
    }

    pub fn bool(&self, name: &str) -> DomainResult<bool> {
        match self.require(name)? {
            FieldValue::Bool(v) => Ok(*v),
            other => Err(Self::mismatch(name, "bool", other)),
        }
    }

    pub fn text(&self, name: &str) -> DomainResult<String> {
        match self.require(name)? {
            FieldValue::Text(v) => Ok(v.clone()),
            other => Err(Self::mismatch(name, "text", other)),
        }
    }

    pub fn timestamp(&self, name: &str) -> DomainResult<DateTime<Utc>> {
        match self.require(name)? {
            FieldValue::Timestamp(v) => Ok(*v),
            other => Err(Self::mismatch(name, "timestamp", other)),
        }
    }

    /// Nullable timestamp; a missing column decodes as `None`.
    pub fn opt_timestamp(&self, name: &str) -> DomainResult<Option<DateTime<Utc>>> {
        match self.fields.get(name) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Timestamp(v)) => Ok(Some(*v)),
            Some(other) => Err(Self::mismatch(name, "timestamp", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_round_trip() {
        let now = Utc::now();
        let row = Row::new()
            .with("qty", 3_i64)
            .with("name", "aspirin")
            .with("sent", false)
            .with("at", now)
            .with("seen", None::<DateTime<Utc>>);

        assert_eq!(row.int("qty").unwrap(), 3);
        assert_eq!(row.text("name").unwrap(), "aspirin");
        assert!(!row.bool("sent").unwrap());
        assert_eq!(row.timestamp("at").unwrap(), now);
        assert_eq!(row.opt_timestamp("seen").unwrap(), None);
    }

    #[test]
    fn type_mismatch_is_a_decode_error() {
        let row = Row::new().with("qty", "three");
        match row.int("qty") {
            Err(DomainError::Decode(msg)) => assert!(msg.contains("expected int")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn missing_column_is_a_decode_error() {
        assert!(matches!(Row::new().text("name"), Err(DomainError::Decode(_))));
    }

    #[test]
    fn null_fits_only_nullable_columns() {
        let strict = Column::required("a", ColumnType::Timestamp);
        let loose = Column::nullable("b", ColumnType::Timestamp);
        assert!(!FieldValue::Null.fits(&strict));
        assert!(FieldValue::Null.fits(&loose));
        assert!(!FieldValue::Int(1).fits(&loose));
    }
}
