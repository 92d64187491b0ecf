//! Events that produce user-facing notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pharmacy_core::{OrderId, ProductId, UserId};
use pharmacy_sales::OrderStatus;

use crate::event::Event;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// An order and all of its line items were persisted.
    OrderPlaced {
        order_id: OrderId,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    /// An order moved to a new status.
    OrderStatusChanged {
        order_id: OrderId,
        user_id: UserId,
        status: OrderStatus,
        occurred_at: DateTime<Utc>,
    },
    /// A recently placed order was announced by the periodic sweep.
    OrderRegistered {
        order_id: OrderId,
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
    /// A product fell under the low-stock threshold.
    LowStock {
        product_id: ProductId,
        product_name: String,
        stock: i64,
        recipient: UserId,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for LifecycleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LifecycleEvent::OrderPlaced { .. } => "sales.order.placed",
            LifecycleEvent::OrderStatusChanged { .. } => "sales.order.status_changed",
            LifecycleEvent::OrderRegistered { .. } => "sales.order.registered",
            LifecycleEvent::LowStock { .. } => "catalog.product.low_stock",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LifecycleEvent::OrderPlaced { occurred_at, .. }
            | LifecycleEvent::OrderStatusChanged { occurred_at, .. }
            | LifecycleEvent::OrderRegistered { occurred_at, .. }
            | LifecycleEvent::LowStock { occurred_at, .. } => *occurred_at,
        }
    }

    fn recipient(&self) -> UserId {
        match self {
            LifecycleEvent::OrderPlaced { user_id, .. }
            | LifecycleEvent::OrderStatusChanged { user_id, .. }
            | LifecycleEvent::OrderRegistered { user_id, .. } => *user_id,
            LifecycleEvent::LowStock { recipient, .. } => *recipient,
        }
    }

    fn message(&self) -> String {
        match self {
            LifecycleEvent::OrderPlaced { order_id, .. } => {
                format!("Your order with ID {order_id} has been placed successfully.")
            }
            LifecycleEvent::OrderStatusChanged {
                order_id, status, ..
            } => format!("Your order with ID {order_id} is now {status}."),
            LifecycleEvent::OrderRegistered { order_id, .. } => {
                format!("Your order #{order_id} has been registered.")
            }
            LifecycleEvent::LowStock {
                product_name,
                stock,
                ..
            } => format!("Product {product_name} is low on stock ({stock})."),
        }
    }
}
