//! Referential checks for users, orders and their line items.

use tracing::debug;

use pharmacy_auth::User;
use pharmacy_catalog::Product;
use pharmacy_core::{DomainError, Filter, OrderId, SurrogateKey, UserId};
use pharmacy_sales::{Order, OrderDetail};

use crate::entity_store::EntityStore;
use crate::error::LifecycleResult;

/// Checks that keep orders attached to existing users and products, and keep
/// parents from being removed while they still own children.
#[derive(Debug, Clone)]
pub struct IntegrityGuard<S> {
    store: S,
}

impl<S: EntityStore> IntegrityGuard<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// `order.user_id` must resolve to an existing user.
    pub fn validate_order_creation(&self, order: &Order) -> LifecycleResult<()> {
        if !order.user_id.is_assigned() || !self.store.exists::<User>(order.user_id)? {
            debug!(user_id = %order.user_id, "order rejected: unknown user");
            return Err(DomainError::reference(format!("user {} does not exist", order.user_id)).into());
        }
        Ok(())
    }

    /// Quantity of at least one, and both parents present.
    pub fn validate_order_detail_creation(&self, detail: &OrderDetail) -> LifecycleResult<()> {
        self.validate_line_item(detail)?;
        if !detail.order_id.is_assigned() || !self.store.exists::<Order>(detail.order_id)? {
            debug!(order_id = %detail.order_id, "line item rejected: unknown order");
            return Err(DomainError::reference(format!("order {} does not exist", detail.order_id)).into());
        }
        Ok(())
    }

    /// The order-independent part of
    /// [`validate_order_detail_creation`](Self::validate_order_detail_creation),
    /// for line items whose order has not been written yet.
    pub fn validate_line_item(&self, detail: &OrderDetail) -> LifecycleResult<()> {
        detail.quantity()?;
        if !detail.product_id.is_assigned() || !self.store.exists::<Product>(detail.product_id)? {
            debug!(product_id = %detail.product_id, "line item rejected: unknown product");
            return Err(DomainError::reference(format!("product {} does not exist", detail.product_id)).into());
        }
        Ok(())
    }

    /// An order that still owns line items cannot be removed.
    pub fn validate_order_deletion(&self, order_id: OrderId) -> LifecycleResult<()> {
        let owned = Filter::all().eq("order_id", order_id.get());
        if self.store.any_where::<OrderDetail>(&owned)? {
            debug!(%order_id, "order deletion rejected: line items present");
            return Err(DomainError::conflict(format!("order {order_id} still has line items")).into());
        }
        Ok(())
    }

    /// A user referenced by any order cannot be removed.
    pub fn validate_user_deletion(&self, user_id: UserId) -> LifecycleResult<()> {
        let owned = Filter::all().eq("user_id", user_id.get());
        if self.store.any_where::<Order>(&owned)? {
            debug!(%user_id, "user deletion rejected: orders present");
            return Err(DomainError::conflict(format!("user {user_id} still has orders")).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LifecycleError;
    use crate::test_support::Fixture;
    use pharmacy_core::ProductId;

    #[test]
    fn order_creation_requires_existing_user() {
        let fx = Fixture::new();
        let user = fx.user("alice");
        let guard = IntegrityGuard::new(fx.store.clone());

        assert!(guard.validate_order_creation(&Order::place(user, fx.now)).is_ok());

        let err = guard
            .validate_order_creation(&Order::place(UserId::new(999), fx.now))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Reference(_)));

        let err = guard
            .validate_order_creation(&Order::place(UserId::UNASSIGNED, fx.now))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Reference(_)));
    }

    #[test]
    fn detail_creation_checks_quantity_and_both_parents() {
        let fx = Fixture::new();
        let user = fx.user("bob");
        let product = fx.product("Aspirin", 10);
        let order = fx.order(user);
        let guard = IntegrityGuard::new(fx.store.clone());

        assert!(guard.validate_order_detail_creation(&OrderDetail::new(order, product, 1)).is_ok());

        let err = guard
            .validate_order_detail_creation(&OrderDetail::new(order, product, 0))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));

        let err = guard
            .validate_order_detail_creation(&OrderDetail::new(OrderId::new(404), product, 1))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Reference(m) if m.contains("order 404")));

        let err = guard
            .validate_order_detail_creation(&OrderDetail::new(order, ProductId::new(404), 1))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Reference(m) if m.contains("product 404")));
    }

    #[test]
    fn line_item_check_ignores_missing_order() {
        let fx = Fixture::new();
        let product = fx.product("Ibuprofen", 3);
        let guard = IntegrityGuard::new(fx.store.clone());

        let unsaved = OrderDetail::new(OrderId::UNASSIGNED, product, 2);
        assert!(guard.validate_line_item(&unsaved).is_ok());
        assert!(guard.validate_order_detail_creation(&unsaved).is_err());
    }

    #[test]
    fn order_deletion_conflicts_while_line_items_exist() {
        let fx = Fixture::new();
        let user = fx.user("carol");
        let product = fx.product("Paracetamol", 8);
        let order = fx.order(user);
        let guard = IntegrityGuard::new(fx.store.clone());

        assert!(guard.validate_order_deletion(order).is_ok());

        fx.detail(order, product, 2);
        let err = guard.validate_order_deletion(order).unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict(_)));
    }

    #[test]
    fn user_deletion_conflicts_while_orders_exist() {
        let fx = Fixture::new();
        let user = fx.user("dave");
        let guard = IntegrityGuard::new(fx.store.clone());

        assert!(guard.validate_user_deletion(user).is_ok());

        fx.order(user);
        let err = guard.validate_user_deletion(user).unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict(_)));
    }
}
