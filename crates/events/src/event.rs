use chrono::{DateTime, Utc};

use pharmacy_core::UserId;

/// Something that happened in the pharmacy that one user should hear about.
///
/// Every event turns into exactly one notification row: `recipient` owns it,
/// `message` is its text before truncation.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name used in logs (e.g. "sales.order.placed").
    fn event_type(&self) -> &'static str;

    fn occurred_at(&self) -> DateTime<Utc>;

    fn recipient(&self) -> UserId;

    fn message(&self) -> String;
}
