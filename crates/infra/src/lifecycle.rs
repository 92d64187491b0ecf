//! Order lifecycle orchestration.
//!
//! Multi-row writes (order + line items + notification, status + notification)
//! are sequential store calls, not one transaction. PlaceOrder undoes its own
//! writes when a later step fails; UpdateOrderStatus keeps the committed status
//! and reports the lost notification as a partial failure.

use std::str::FromStr;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use pharmacy_core::{
    DomainError, Entity, ExpectedVersion, Filter, OrderDetailId, OrderId, ProductId, UserId,
};
use pharmacy_events::{LifecycleEvent, Notification};
use pharmacy_sales::{Order, OrderDetail, OrderStatus};

use crate::config::LifecycleConfig;
use crate::entity_store::{EntityStore, StoreError, INITIAL_VERSION};
use crate::error::{FailedStep, LifecycleError, LifecycleResult};
use crate::guards::IntegrityGuard;
use crate::notifier::NotificationEmitter;
use crate::retry::retry_transient;

/// Result of a successful PlaceOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub details: Vec<OrderDetail>,
    pub notification: Notification,
}

/// Result of a successful UpdateOrderStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub order: Order,
    pub notification: Notification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderWithDetails {
    pub order: Order,
    pub details: Vec<OrderDetail>,
}

/// Orchestrates writes that span orders, line items and notifications.
///
/// Holds no state between calls besides configuration; every operation is its
/// own unit of work against the store.
#[derive(Debug, Clone)]
pub struct OrderLifecycleManager<S> {
    store: S,
    integrity: IntegrityGuard<S>,
    notifier: NotificationEmitter<S>,
    config: LifecycleConfig,
}

impl<S: EntityStore + Clone> OrderLifecycleManager<S> {
    pub fn new(store: S, config: LifecycleConfig) -> Self {
        Self {
            integrity: IntegrityGuard::new(store.clone()),
            notifier: NotificationEmitter::new(store.clone()),
            store,
            config,
        }
    }

    pub fn integrity(&self) -> &IntegrityGuard<S> {
        &self.integrity
    }

    pub fn notifier(&self) -> &NotificationEmitter<S> {
        &self.notifier
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Persist `order`, then each line item, then the "order placed"
    /// notification for the owner.
    ///
    /// Every precondition is checked before the first write. If a later write
    /// fails, the rows already written are deleted again (line items in
    /// reverse, then the order) with bounded retry on transient failures. A
    /// completed rollback reports the original error; a failed rollback
    /// reports `PartialFailure { step: Compensation }`.
    ///
    /// The `order_id` carried by each line item is ignored and replaced with
    /// the generated order key.
    #[instrument(skip(self, order, details), fields(user_id = %order.user_id, lines = details.len()))]
    pub fn place_order(&self, order: Order, details: Vec<OrderDetail>) -> LifecycleResult<PlacedOrder> {
        self.integrity.validate_order_creation(&order)?;
        for detail in &details {
            self.integrity.validate_line_item(detail)?;
        }

        let mut order = order;
        order.id = self.store.insert(&order)?;
        order.version = INITIAL_VERSION;
        debug!(order_id = %order.id, "order row written");

        let mut written: Vec<OrderDetail> = Vec::with_capacity(details.len());
        for detail in details {
            let mut detail = detail.for_order(order.id);
            match self.store.insert(&detail) {
                Ok(id) => {
                    detail.id = id;
                    detail.version = INITIAL_VERSION;
                    written.push(detail);
                }
                Err(err) => {
                    warn!(order_id = %order.id, error = %err, "line item write failed");
                    return Err(self.compensate(order.id, &written, err.into()));
                }
            }
        }

        let placed = LifecycleEvent::OrderPlaced {
            order_id: order.id,
            user_id: order.user_id,
            occurred_at: Utc::now(),
        };
        let notification = match self.notifier.emit_event(&placed) {
            Ok(n) => n,
            Err(err) => {
                warn!(order_id = %order.id, error = %err, "order notification write failed");
                return Err(self.compensate(order.id, &written, err));
            }
        };

        info!(order_id = %order.id, lines = written.len(), "order placed");
        Ok(PlacedOrder {
            order,
            details: written,
            notification,
        })
    }

    /// Undo a partially placed order. Returns the error to report.
    fn compensate(&self, order_id: OrderId, written: &[OrderDetail], cause: LifecycleError) -> LifecycleError {
        let policy = &self.config.compensation_retry;
        let outcome = written
            .iter()
            .rev()
            .try_for_each(|detail| {
                retry_transient(policy, "compensate order detail", || {
                    absent_ok(self.store.delete::<OrderDetail>(detail.id))
                })
            })
            .and_then(|()| {
                retry_transient(policy, "compensate order", || {
                    absent_ok(self.store.delete::<Order>(order_id))
                })
            });

        match outcome {
            Ok(()) => {
                info!(%order_id, "partially placed order rolled back");
                cause
            }
            Err(err) => {
                error!(%order_id, error = %err, cause = %cause, "order rollback failed");
                LifecycleError::partial(
                    FailedStep::Compensation,
                    format!("order {order_id} left partially written after '{cause}': {err}"),
                )
            }
        }
    }

    /// Move an order to `status` and notify its owner.
    ///
    /// The status write and the notification write are separate. If the
    /// notification fails, the status change stays committed and the call
    /// reports `PartialFailure { step: Notification }`.
    #[instrument(skip(self))]
    pub fn update_order_status(&self, order_id: OrderId, status: &str) -> LifecycleResult<StatusUpdate> {
        let next = OrderStatus::from_str(status)?;
        let mut order = self.load_order(order_id)?;
        let previous = order.status;
        order.change_status(next, self.config.enforce_status_transitions)?;

        order.version = self.store.update(&order, ExpectedVersion::Exact(order.version))?;
        info!(from = %previous, to = %next, "order status changed");

        let changed = LifecycleEvent::OrderStatusChanged {
            order_id,
            user_id: order.user_id,
            status: next,
            occurred_at: Utc::now(),
        };
        match self.notifier.emit_event(&changed) {
            Ok(notification) => Ok(StatusUpdate { order, notification }),
            Err(err) => {
                warn!(error = %err, "status committed but notification was not written");
                Err(LifecycleError::partial(
                    FailedStep::Notification,
                    format!("order {order_id} is now {next} but the notification failed: {err}"),
                ))
            }
        }
    }

    /// General field edit with optimistic concurrency on `order.version`.
    ///
    /// Status is not editable here; use [`update_order_status`](Self::update_order_status).
    /// A stale version is reported as `ConcurrencyConflict` and never retried.
    #[instrument(skip(self, order), fields(order_id = %order.id, expected = order.version))]
    pub fn update_order(&self, order: &Order) -> LifecycleResult<Order> {
        self.integrity.validate_order_creation(order)?;

        let current = self.load_order(order.id)?;
        if current.version != order.version {
            debug!(stored = current.version, "stale version rejected");
            return Err(LifecycleError::ConcurrencyConflict(format!(
                "order {} is at version {}, update was based on {}",
                order.id, current.version, order.version
            )));
        }
        if current.status != order.status {
            return Err(DomainError::validation(format!(
                "order {} status can only change through a status update",
                order.id
            ))
            .into());
        }

        let version = self.versioned_update(order)?;
        let mut updated = order.clone();
        updated.version = version;
        debug!(version, "order updated");
        Ok(updated)
    }

    /// Delete an order that owns no line items.
    #[instrument(skip(self))]
    pub fn delete_order(&self, order_id: OrderId) -> LifecycleResult<()> {
        self.integrity.validate_order_deletion(order_id)?;
        self.store.delete::<Order>(order_id)?;
        info!(%order_id, "order deleted");
        Ok(())
    }

    /// Mark every unsent notification of `user_id` as sent and return them as
    /// they were before marking.
    ///
    /// Each row is written against the version it was read at; a row that a
    /// concurrent drain already claimed is skipped, so a notification is handed
    /// out at most once.
    #[instrument(skip(self))]
    pub fn drain_unsent_notifications(&self, user_id: UserId) -> LifecycleResult<Vec<Notification>> {
        let unsent = self.store.find_where::<Notification>(
            &Filter::all().eq("user_id", user_id.get()).eq("is_sent", false),
        )?;

        let mut drained = Vec::with_capacity(unsent.len());
        for pending in unsent {
            let mut sent = pending.clone();
            if !sent.mark_sent() {
                continue;
            }
            match self.store.update(&sent, ExpectedVersion::Exact(pending.version)) {
                Ok(_) => drained.push(pending),
                Err(StoreError::Concurrency(_) | StoreError::NotFound { .. }) => {
                    debug!(notification_id = %pending.id, "already claimed by a concurrent drain");
                }
                Err(err) if drained.is_empty() => return Err(err.into()),
                Err(err) => {
                    warn!(marked = drained.len(), error = %err, "drain interrupted");
                    return Err(LifecycleError::partial(
                        FailedStep::Delivery,
                        format!("{} notifications of user {user_id} marked sent before failure: {err}", drained.len()),
                    ));
                }
            }
        }

        debug!(count = drained.len(), "notifications drained");
        Ok(drained)
    }

    /// Add a line item to an existing order.
    #[instrument(skip(self, detail), fields(order_id = %detail.order_id, product_id = %detail.product_id))]
    pub fn add_order_detail(&self, detail: OrderDetail) -> LifecycleResult<OrderDetail> {
        self.integrity.validate_order_detail_creation(&detail)?;
        let mut detail = detail;
        detail.id = self.store.insert(&detail)?;
        detail.version = INITIAL_VERSION;
        debug!(detail_id = %detail.id, "line item added");
        Ok(detail)
    }

    /// Replace a line item, re-checking quantity and both parents.
    #[instrument(skip(self, detail), fields(detail_id = %detail.id, expected = detail.version))]
    pub fn update_order_detail(&self, detail: &OrderDetail) -> LifecycleResult<OrderDetail> {
        self.integrity.validate_order_detail_creation(detail)?;
        let version = self.versioned_update(detail)?;
        let mut updated = detail.clone();
        updated.version = version;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub fn remove_order_detail(&self, detail_id: OrderDetailId) -> LifecycleResult<()> {
        self.store.delete::<OrderDetail>(detail_id)?;
        debug!(%detail_id, "line item removed");
        Ok(())
    }

    pub fn order_with_details(&self, order_id: OrderId) -> LifecycleResult<OrderWithDetails> {
        let order = self.load_order(order_id)?;
        let details = self.find_order_details(Some(order_id), None)?;
        Ok(OrderWithDetails { order, details })
    }

    /// Line items filtered by order and/or product; no filter returns all.
    pub fn find_order_details(
        &self,
        order_id: Option<OrderId>,
        product_id: Option<ProductId>,
    ) -> LifecycleResult<Vec<OrderDetail>> {
        let mut filter = Filter::all();
        if let Some(order_id) = order_id {
            filter = filter.eq("order_id", order_id.get());
        }
        if let Some(product_id) = product_id {
            filter = filter.eq("product_id", product_id.get());
        }
        Ok(self.store.find_where::<OrderDetail>(&filter)?)
    }

    fn load_order(&self, order_id: OrderId) -> LifecycleResult<Order> {
        self.store
            .get::<Order>(order_id)?
            .ok_or_else(|| StoreError::not_found::<Order>(order_id).into())
    }

    /// Write `entity` against its own version token. On a version mismatch the
    /// row is looked up again so a deleted row reads as `NotFound`.
    fn versioned_update<E: Entity>(&self, entity: &E) -> LifecycleResult<u64> {
        match self.store.update(entity, ExpectedVersion::Exact(entity.version())) {
            Ok(version) => Ok(version),
            Err(StoreError::Concurrency(msg)) => {
                if self.store.exists::<E>(entity.id())? {
                    debug!(kind = %E::KIND, id = %entity.id(), "stale version rejected");
                    Err(LifecycleError::ConcurrencyConflict(msg))
                } else {
                    Err(StoreError::not_found::<E>(entity.id()).into())
                }
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Compensation treats an already-missing row as removed.
fn absent_ok(result: Result<(), StoreError>) -> Result<(), StoreError> {
    match result {
        Err(StoreError::NotFound { .. }) => Ok(()),
        other => other,
    }
}
