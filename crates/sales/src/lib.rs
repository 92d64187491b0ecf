//! Orders domain module.
//!
//! Orders, their line items, and the order status lifecycle, implemented as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod detail;
pub mod order;
pub mod status;

pub use detail::{OrderDetail, Quantity};
pub use order::Order;
pub use status::OrderStatus;
