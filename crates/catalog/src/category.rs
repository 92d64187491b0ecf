use serde::{Deserialize, Serialize};

use pharmacy_core::{
    CategoryId, Column, ColumnType, DomainError, DomainResult, Entity, EntityKind, Row,
};

/// Product category. Names are unique by convention only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub version: u64,
}

impl Category {
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        let category = Self {
            id: CategoryId::UNASSIGNED,
            name: name.into().trim().to_string(),
            version: 0,
        };
        category.validate()?;
        Ok(category)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("category name cannot be empty"));
        }
        Ok(())
    }
}

impl Entity for Category {
    type Id = CategoryId;

    const KIND: EntityKind = EntityKind::Category;

    const COLUMNS: &'static [Column] = &[Column::required("name", ColumnType::Text)];

    fn id(&self) -> CategoryId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn to_row(&self) -> Row {
        Row::new().with("name", self.name.as_str())
    }

    fn from_row(id: CategoryId, version: u64, row: &Row) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: row.text("name")?,
            version,
        })
    }
}
