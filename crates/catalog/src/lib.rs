//! Product catalog domain module.
//!
//! Categories own products; products are referenced by order line items.
//! Pure record and validation logic only (no IO, no storage).

pub mod category;
pub mod product;

pub use category::Category;
pub use product::{Price, Product, ProductDraft};
