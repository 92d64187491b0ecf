//! Entity trait: identity, row version, and column codec.

use crate::error::DomainResult;
use crate::id::SurrogateKey;
use crate::row::{Column, Row};

/// The six persisted tables.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    User,
    Category,
    Product,
    Order,
    OrderDetail,
    Notification,
}

impl EntityKind {
    pub fn table_name(self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Category => "categories",
            EntityKind::Product => "products",
            EntityKind::Order => "orders",
            EntityKind::OrderDetail => "order_details",
            EntityKind::Notification => "notifications",
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A foreign-key column and the table it points at.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Reference {
    pub column: &'static str,
    pub target: EntityKind,
}

impl Reference {
    pub const fn new(column: &'static str, target: EntityKind) -> Self {
        Self { column, target }
    }
}

/// A persisted record.
///
/// `id` and `version` live outside the column list: the store generates the
/// key on insert and bumps the version on every successful update.
pub trait Entity: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Strongly-typed surrogate key.
    type Id: SurrogateKey;

    const KIND: EntityKind;

    /// Persisted columns other than `id` and `version`.
    const COLUMNS: &'static [Column];

    /// Foreign keys (restrict on delete).
    const REFERENCES: &'static [Reference] = &[];

    fn id(&self) -> Self::Id;

    /// Version token read together with the row (0 before the first insert).
    fn version(&self) -> u64;

    fn to_row(&self) -> Row;

    fn from_row(id: Self::Id, version: u64, row: &Row) -> DomainResult<Self>;
}
