//! Entity store boundary.
//!
//! The core only ever talks to storage through [`EntityStore`]: get, filtered
//! scans, insert, versioned update, and delete.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryEntityStore;
pub use postgres::PostgresEntityStore;
pub use r#trait::{EntityStore, StoreError, INITIAL_VERSION};
