use serde::{Deserialize, Serialize};

use pharmacy_core::{
    Column, ColumnType, DomainError, DomainResult, Entity, EntityKind, OrderDetailId, OrderId,
    ProductId, Reference, Row, ValueObject,
};

/// Validated line-item quantity (at least one unit).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(i64);

impl Quantity {
    pub fn new(units: i64) -> DomainResult<Self> {
        if units < 1 {
            return Err(DomainError::validation(format!(
                "quantity must be at least 1, got {units}"
            )));
        }
        Ok(Self(units))
    }

    pub fn units(self) -> i64 {
        self.0
    }
}

impl ValueObject for Quantity {}

/// Order line item: one product-and-quantity pairing within an order.
///
/// `quantity` is kept raw so that out-of-range input reaches validation
/// instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: OrderDetailId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub version: u64,
}

impl OrderDetail {
    /// Unsaved line item. `order_id` may be unassigned while the owning order
    /// is itself being placed.
    pub fn new(order_id: OrderId, product_id: ProductId, quantity: i64) -> Self {
        Self {
            id: OrderDetailId::UNASSIGNED,
            order_id,
            product_id,
            quantity,
            version: 0,
        }
    }

    pub fn quantity(&self) -> DomainResult<Quantity> {
        Quantity::new(self.quantity)
    }

    /// Attach to the order that owns this line.
    pub fn for_order(mut self, order_id: OrderId) -> Self {
        self.order_id = order_id;
        self
    }
}

impl Entity for OrderDetail {
    type Id = OrderDetailId;

    const KIND: EntityKind = EntityKind::OrderDetail;

    const COLUMNS: &'static [Column] = &[
        Column::required("order_id", ColumnType::Int),
        Column::required("product_id", ColumnType::Int),
        Column::required("quantity", ColumnType::Int),
    ];

    const REFERENCES: &'static [Reference] = &[
        Reference::new("order_id", EntityKind::Order),
        Reference::new("product_id", EntityKind::Product),
    ];

    fn id(&self) -> OrderDetailId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("order_id", self.order_id.get())
            .with("product_id", self.product_id.get())
            .with("quantity", self.quantity)
    }

    fn from_row(id: OrderDetailId, version: u64, row: &Row) -> DomainResult<Self> {
        Ok(Self {
            id,
            order_id: OrderId::new(row.int("order_id")?),
            product_id: ProductId::new(row.int("product_id")?),
            quantity: row.int("quantity")?,
            version,
        })
    }
}
