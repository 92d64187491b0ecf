use serde::{Deserialize, Serialize};

use pharmacy_core::{
    CategoryId, Column, ColumnType, DomainError, DomainResult, Entity, EntityKind, ProductId,
    Reference, Row, ValueObject,
};

const MAX_NAME_LEN: usize = 200;

/// Unit price in the smallest currency unit (e.g., cents). Always positive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Price(u64);

impl Price {
    pub fn from_cents(cents: u64) -> DomainResult<Self> {
        if cents == 0 {
            return Err(DomainError::validation("price must be positive"));
        }
        if i64::try_from(cents).is_err() {
            return Err(DomainError::validation("price exceeds storable range"));
        }
        Ok(Self(cents))
    }

    pub fn cents(self) -> u64 {
        self.0
    }
}

impl ValueObject for Price {}

impl TryFrom<u64> for Price {
    type Error = DomainError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::from_cents(value)
    }
}

impl From<Price> for u64 {
    fn from(value: Price) -> Self {
        value.0
    }
}

/// Create/update input for a product.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub price_cents: u64,
    pub stock: i64,
    pub category_id: CategoryId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub stock: i64,
    pub category_id: CategoryId,
    #[serde(default)]
    pub version: u64,
}

impl Product {
    /// Validate a draft into an unsaved product.
    pub fn new(draft: ProductDraft) -> DomainResult<Self> {
        let product = Self {
            id: ProductId::UNASSIGNED,
            name: draft.name.trim().to_string(),
            price: Price::from_cents(draft.price_cents)?,
            stock: draft.stock,
            category_id: draft.category_id,
            version: 0,
        };
        product.validate()?;
        Ok(product)
    }

    /// Apply a draft onto an existing row, keeping its key and version token.
    pub fn revise(&self, draft: ProductDraft) -> DomainResult<Self> {
        let mut revised = Self::new(draft)?;
        revised.id = self.id;
        revised.version = self.version;
        Ok(revised)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::validation(format!(
                "product name exceeds {MAX_NAME_LEN} characters"
            )));
        }
        if self.stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }
        Ok(())
    }

    pub fn is_below(&self, threshold: i64) -> bool {
        self.stock < threshold
    }
}

impl Entity for Product {
    type Id = ProductId;

    const KIND: EntityKind = EntityKind::Product;

    const COLUMNS: &'static [Column] = &[
        Column::required("name", ColumnType::Text),
        Column::required("price_cents", ColumnType::Int),
        Column::required("stock", ColumnType::Int),
        Column::required("category_id", ColumnType::Int),
    ];

    const REFERENCES: &'static [Reference] =
        &[Reference::new("category_id", EntityKind::Category)];

    fn id(&self) -> ProductId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("name", self.name.as_str())
            // Price::from_cents guarantees the value fits.
            .with("price_cents", self.price.cents() as i64)
            .with("stock", self.stock)
            .with("category_id", self.category_id.get())
    }

    fn from_row(id: ProductId, version: u64, row: &Row) -> DomainResult<Self> {
        let cents = u64::try_from(row.int("price_cents")?)
            .map_err(|_| DomainError::decode("negative price_cents"))?;
        Ok(Self {
            id,
            name: row.text("name")?,
            price: Price::from_cents(cents).map_err(|e| DomainError::decode(e.to_string()))?,
            stock: row.int("stock")?,
            category_id: CategoryId::new(row.int("category_id")?),
            version,
        })
    }
}
