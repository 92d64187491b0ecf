//! Lifecycle events and the notifications derived from them.

pub mod event;
pub mod lifecycle;
pub mod notification;

pub use event::Event;
pub use lifecycle::LifecycleEvent;
pub use notification::{Notification, MAX_MESSAGE_LEN};
