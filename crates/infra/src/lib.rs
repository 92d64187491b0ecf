//! Infrastructure layer: entity storage, relationship guards, and the order
//! lifecycle services built on them.

pub mod catalog;
pub mod config;
pub mod directory;
pub mod entity_store;
pub mod error;
pub mod guards;
pub mod lifecycle;
pub mod notifier;
pub mod retry;

#[cfg(test)]
mod test_support;

pub use catalog::CatalogService;
pub use config::{ConfigError, LifecycleConfig};
pub use directory::UserDirectory;
pub use entity_store::{EntityStore, InMemoryEntityStore, PostgresEntityStore, StoreError, INITIAL_VERSION};
pub use error::{FailedStep, LifecycleError, LifecycleResult};
pub use guards::{CatalogGuard, IntegrityGuard};
pub use lifecycle::{OrderLifecycleManager, OrderWithDetails, PlacedOrder, StatusUpdate};
pub use notifier::NotificationEmitter;
pub use retry::{retry_transient, RetryPolicy};
