//! Pre-write relationship checks.
//!
//! Guards are advisory reads, not locks: a concurrent writer can still slip in
//! between the check and the write. Store-level foreign keys are the backstop.

pub mod catalog;
pub mod integrity;

pub use catalog::CatalogGuard;
pub use integrity::IntegrityGuard;
