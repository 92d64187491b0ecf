//! Category and product maintenance.

use tracing::{debug, info, instrument};

use pharmacy_catalog::{Category, Product, ProductDraft};
use pharmacy_core::{CategoryId, ExpectedVersion, ProductId};

use crate::entity_store::{EntityStore, StoreError, INITIAL_VERSION};
use crate::error::{LifecycleError, LifecycleResult};
use crate::guards::CatalogGuard;

#[derive(Debug, Clone)]
pub struct CatalogService<S> {
    store: S,
    guard: CatalogGuard<S>,
}

impl<S: EntityStore + Clone> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self {
            guard: CatalogGuard::new(store.clone()),
            store,
        }
    }

    pub fn guard(&self) -> &CatalogGuard<S> {
        &self.guard
    }

    pub fn create_category(&self, name: &str) -> LifecycleResult<Category> {
        let mut category = Category::new(name)?;
        category.id = self.store.insert(&category)?;
        category.version = INITIAL_VERSION;
        info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    /// Rename against the version token the caller read.
    #[instrument(skip(self, name))]
    pub fn rename_category(&self, category_id: CategoryId, name: &str, version: u64) -> LifecycleResult<Category> {
        let mut category = self.load::<Category>(category_id)?;
        category.name = name.trim().to_string();
        category.validate()?;
        category.version = self.conditional_update(&category, version)?;
        Ok(category)
    }

    #[instrument(skip(self))]
    pub fn delete_category(&self, category_id: CategoryId) -> LifecycleResult<()> {
        self.guard.validate_category_deletion(category_id)?;
        self.store.delete::<Category>(category_id)?;
        info!(%category_id, "category deleted");
        Ok(())
    }

    pub fn create_product(&self, draft: ProductDraft) -> LifecycleResult<Product> {
        let mut product = Product::new(draft)?;
        self.guard.validate_product_mutation(&product)?;
        product.id = self.store.insert(&product)?;
        product.version = INITIAL_VERSION;
        info!(product_id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    /// Replace a product's fields against the version token the caller read.
    #[instrument(skip(self, draft))]
    pub fn update_product(&self, product_id: ProductId, draft: ProductDraft, version: u64) -> LifecycleResult<Product> {
        let current = self.load::<Product>(product_id)?;
        let mut product = current.revise(draft)?;
        self.guard.validate_product_mutation(&product)?;
        product.version = self.conditional_update(&product, version)?;
        Ok(product)
    }

    #[instrument(skip(self))]
    pub fn delete_product(&self, product_id: ProductId) -> LifecycleResult<()> {
        self.guard.validate_product_deletion(product_id)?;
        self.store.delete::<Product>(product_id)?;
        info!(%product_id, "product deleted");
        Ok(())
    }

    fn load<E: pharmacy_core::Entity>(&self, id: E::Id) -> LifecycleResult<E> {
        self.store
            .get::<E>(id)?
            .ok_or_else(|| StoreError::not_found::<E>(id).into())
    }

    fn conditional_update<E: pharmacy_core::Entity>(&self, entity: &E, version: u64) -> LifecycleResult<u64> {
        match self.store.update(entity, ExpectedVersion::Exact(version)) {
            Ok(next) => Ok(next),
            Err(StoreError::Concurrency(msg)) => {
                debug!(kind = %E::KIND, id = %entity.id(), version, "stale version rejected");
                Err(LifecycleError::ConcurrencyConflict(msg))
            }
            Err(err) => Err(err.into()),
        }
    }
}
