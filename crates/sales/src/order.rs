use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pharmacy_core::{
    Column, ColumnType, DomainError, DomainResult, Entity, EntityKind, OrderId, Reference, Row,
    UserId,
};

use crate::status::OrderStatus;

/// Order header. Line items are separate [`OrderDetail`](crate::OrderDetail) rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_date: DateTime<Utc>,
    pub user_id: UserId,
    pub status: OrderStatus,
    /// Version token read at fetch time; required for updates.
    pub version: u64,
}

impl Order {
    /// A new, unsaved, pending order for `user_id`.
    pub fn place(user_id: UserId, order_date: DateTime<Utc>) -> Self {
        Self {
            id: OrderId::UNASSIGNED,
            order_date,
            user_id,
            status: OrderStatus::Pending,
            version: 0,
        }
    }

    /// Move to `next`, checking the lifecycle graph when `enforce` is set.
    ///
    /// Without enforcement any move between known statuses is accepted.
    pub fn change_status(&mut self, next: OrderStatus, enforce: bool) -> DomainResult<()> {
        if enforce {
            self.status = self.status.transition_to(next)?;
        } else {
            self.status = next;
        }
        Ok(())
    }

    pub fn is_persisted(&self) -> bool {
        self.id.get() > 0
    }
}

impl Entity for Order {
    type Id = OrderId;

    const KIND: EntityKind = EntityKind::Order;

    const COLUMNS: &'static [Column] = &[
        Column::required("order_date", ColumnType::Timestamp),
        Column::required("user_id", ColumnType::Int),
        Column::required("status", ColumnType::Text),
    ];

    const REFERENCES: &'static [Reference] = &[Reference::new("user_id", EntityKind::User)];

    fn id(&self) -> OrderId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("order_date", self.order_date)
            .with("user_id", self.user_id.get())
            .with("status", self.status.as_str())
    }

    fn from_row(id: OrderId, version: u64, row: &Row) -> DomainResult<Self> {
        let status = row
            .text("status")?
            .parse::<OrderStatus>()
            .map_err(|e| DomainError::decode(e.to_string()))?;
        Ok(Self {
            id,
            order_date: row.timestamp("order_date")?,
            user_id: UserId::new(row.int("user_id")?),
            status,
            version,
        })
    }
}
