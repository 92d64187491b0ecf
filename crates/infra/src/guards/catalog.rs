//! Referential checks for categories and products.

use tracing::debug;

use pharmacy_catalog::{Category, Product};
use pharmacy_core::{CategoryId, DomainError, Filter, ProductId, SurrogateKey};
use pharmacy_sales::OrderDetail;

use crate::entity_store::EntityStore;
use crate::error::LifecycleResult;

#[derive(Debug, Clone)]
pub struct CatalogGuard<S> {
    store: S,
}

impl<S: EntityStore> CatalogGuard<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// A category that still owns products cannot be removed.
    pub fn validate_category_deletion(&self, category_id: CategoryId) -> LifecycleResult<()> {
        let owned = Filter::all().eq("category_id", category_id.get());
        if self.store.any_where::<Product>(&owned)? {
            debug!(%category_id, "category deletion rejected: products present");
            return Err(DomainError::conflict(format!("category {category_id} still has products")).into());
        }
        Ok(())
    }

    /// A product referenced by any line item cannot be removed.
    pub fn validate_product_deletion(&self, product_id: ProductId) -> LifecycleResult<()> {
        let referencing = Filter::all().eq("product_id", product_id.get());
        if self.store.any_where::<OrderDetail>(&referencing)? {
            debug!(%product_id, "product deletion rejected: referenced by line items");
            return Err(DomainError::conflict(format!("product {product_id} is referenced by order line items")).into());
        }
        Ok(())
    }

    /// Field rules plus an existing category.
    pub fn validate_product_mutation(&self, product: &Product) -> LifecycleResult<()> {
        product.validate()?;
        if !product.category_id.is_assigned() || !self.store.exists::<Category>(product.category_id)? {
            debug!(category_id = %product.category_id, "product rejected: unknown category");
            return Err(DomainError::reference(format!("category {} does not exist", product.category_id)).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LifecycleError;
    use crate::test_support::Fixture;
    use pharmacy_catalog::ProductDraft;

    #[test]
    fn category_deletion_conflicts_once_a_product_exists() {
        let fx = Fixture::new();
        let category = fx.category("Vitamins");
        let guard = CatalogGuard::new(fx.store.clone());

        assert!(guard.validate_category_deletion(category).is_ok());

        fx.product_in(category, "Vitamin C", 20);
        let err = guard.validate_category_deletion(category).unwrap_err();
        assert!(matches!(err, LifecycleError::Conflict(_)));
    }

    #[test]
    fn product_deletion_conflicts_while_referenced() {
        let fx = Fixture::new();
        let user = fx.user("erin");
        let used = fx.product("Cough Syrup", 4);
        let unused = fx.product("Bandages", 50);
        let order = fx.order(user);
        fx.detail(order, used, 1);
        let guard = CatalogGuard::new(fx.store.clone());

        assert!(matches!(
            guard.validate_product_deletion(used),
            Err(LifecycleError::Conflict(_))
        ));
        assert!(guard.validate_product_deletion(unused).is_ok());
    }

    #[test]
    fn product_mutation_requires_existing_category() {
        let fx = Fixture::new();
        let category = fx.category("Skin care");
        let guard = CatalogGuard::new(fx.store.clone());

        let draft = |category_id| ProductDraft {
            name: "Sunscreen".into(),
            price_cents: 1299,
            stock: 12,
            category_id,
        };

        let ok = Product::new(draft(category)).unwrap();
        assert!(guard.validate_product_mutation(&ok).is_ok());

        let dangling = Product::new(draft(CategoryId::new(77))).unwrap();
        assert!(matches!(
            guard.validate_product_mutation(&dangling),
            Err(LifecycleError::Reference(_))
        ));

        let mut negative = ok.clone();
        negative.stock = -1;
        assert!(matches!(
            guard.validate_product_mutation(&negative),
            Err(LifecycleError::Validation(_))
        ));
    }
}
