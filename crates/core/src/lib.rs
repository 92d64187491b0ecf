//! `pharmacy-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed keys, the record/column codec store adapters rely on, optimistic
//! concurrency tokens, and the domain error model.

pub mod entity;
pub mod error;
pub mod filter;
pub mod id;
pub mod row;
pub mod value_object;
pub mod version;

pub use entity::{Entity, EntityKind, Reference};
pub use error::{DomainError, DomainResult};
pub use filter::{Clause, Comparison, Filter};
pub use id::{CategoryId, NotificationId, OrderDetailId, OrderId, ProductId, SurrogateKey, UserId};
pub use row::{Column, ColumnType, FieldValue, Row};
pub use value_object::ValueObject;
pub use version::ExpectedVersion;
