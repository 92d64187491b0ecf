//! Notification emission.
//!
//! Notifications are append-only rows derived from [`LifecycleEvent`]s. The
//! periodic sweeps (`check_low_stock`, `announce_recent_orders`) do not
//! deduplicate: every run re-emits for every qualifying row.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use pharmacy_catalog::Product;
use pharmacy_core::{Filter, UserId};
use pharmacy_events::{Event, LifecycleEvent, Notification};
use pharmacy_sales::Order;

use crate::entity_store::{EntityStore, INITIAL_VERSION};
use crate::error::LifecycleResult;

#[derive(Debug, Clone)]
pub struct NotificationEmitter<S> {
    store: S,
}

impl<S: EntityStore> NotificationEmitter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Append one unsent notification for `user_id`.
    pub fn emit(&self, user_id: UserId, message: impl Into<String>) -> LifecycleResult<Notification> {
        self.persist(Notification::new(user_id, message, Utc::now()))
    }

    /// Append the notification derived from `event`.
    pub fn emit_event<E: Event>(&self, event: &E) -> LifecycleResult<Notification> {
        let notification = self.persist(Notification::from_event(event))?;
        debug!(
            event_type = event.event_type(),
            notification_id = %notification.id,
            "event delivered as notification"
        );
        Ok(notification)
    }

    /// One notification to `recipient` per product with `stock < threshold`.
    pub fn check_low_stock(&self, threshold: i64, recipient: UserId) -> LifecycleResult<Vec<Notification>> {
        let low = self
            .store
            .find_where::<Product>(&Filter::all().lt("stock", threshold))?;
        debug!(threshold, products = low.len(), "low-stock scan");

        let mut emitted = Vec::with_capacity(low.len());
        for product in low {
            let event = LifecycleEvent::LowStock {
                product_id: product.id,
                product_name: product.name,
                stock: product.stock,
                recipient,
                occurred_at: Utc::now(),
            };
            emitted.push(self.emit_event(&event)?);
        }
        Ok(emitted)
    }

    /// One "order registered" notification per order placed at or after `since`,
    /// addressed to the order's owner.
    pub fn announce_recent_orders(&self, since: DateTime<Utc>) -> LifecycleResult<Vec<Notification>> {
        let recent = self
            .store
            .find_where::<Order>(&Filter::all().gte("order_date", since))?;
        debug!(%since, orders = recent.len(), "recent-order scan");

        let mut emitted = Vec::with_capacity(recent.len());
        for order in recent {
            let event = LifecycleEvent::OrderRegistered {
                order_id: order.id,
                user_id: order.user_id,
                occurred_at: Utc::now(),
            };
            emitted.push(self.emit_event(&event)?);
        }
        Ok(emitted)
    }

    /// Notifications addressed to `user_id`, oldest first. Read-only.
    pub fn notifications_for(&self, user_id: UserId) -> LifecycleResult<Vec<Notification>> {
        let found = self
            .store
            .find_where::<Notification>(&Filter::all().eq("user_id", user_id.get()))?;
        debug!(%user_id, notifications = found.len(), "notification listing");
        Ok(found)
    }

    fn persist(&self, mut notification: Notification) -> LifecycleResult<Notification> {
        notification.id = self.store.insert(&notification)?;
        notification.version = INITIAL_VERSION;
        info!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            "notification emitted"
        );
        Ok(notification)
    }
}
