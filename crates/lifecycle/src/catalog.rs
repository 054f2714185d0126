//! Product catalog seam.

use std::collections::HashMap;

use async_trait::async_trait;
use common::ProductId;
use doc_store::{DocumentStore, Version};
use domain::{Aggregate, DEFAULT_MAX_ATTEMPTS, DomainError, Product, Repository};

use crate::error::{LifecycleError, Result};

/// Read access to products plus the stock writes the order engine owns.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns a product, `None` if it does not exist.
    async fn get(&self, id: ProductId) -> Result<Option<Product>>;

    /// Returns the products among `ids` that exist.
    async fn get_many(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>>;

    /// Takes `quantity` units out of stock.
    ///
    /// Fails with `InsufficientStock` if fewer are on hand; stock is left
    /// unchanged in that case.
    async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<Product>;

    /// Puts `quantity` units back. Returns `None` if the product is gone.
    async fn release_stock(&self, id: ProductId, quantity: u32) -> Result<Option<Product>>;

    /// Creates or replaces a product.
    async fn upsert(&self, product: Product) -> Result<Product>;
}

/// Catalog stored as `products` documents next to carts and orders.
///
/// Stock writes are optimistic: each reloads the product, checks it and
/// writes back at the version it read, retrying when another writer won.
pub struct StoreProductCatalog<S: DocumentStore> {
    products: Repository<S, Product>,
    max_attempts: usize,
}

impl<S: DocumentStore + Clone> Clone for StoreProductCatalog<S> {
    fn clone(&self) -> Self {
        Self {
            products: self.products.clone(),
            max_attempts: self.max_attempts,
        }
    }
}

impl<S: DocumentStore> StoreProductCatalog<S> {
    pub fn new(store: S) -> Self {
        Self {
            products: Repository::new(store),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets how many write conflicts a stock change tolerates.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Loads many products at once, e.g. from a seed file.
    pub async fn seed(&self, products: impl IntoIterator<Item = Product>) -> Result<usize> {
        let mut count = 0;
        for product in products {
            self.upsert(product).await?;
            count += 1;
        }
        tracing::info!(count, "catalog seeded");
        Ok(count)
    }

    fn stock_error(error: DomainError, id: ProductId, operation: &'static str) -> LifecycleError {
        if error.is_conflict() {
            metrics::counter!("stock_write_conflicts_total", "operation" => operation).increment(1);
            tracing::warn!(product_id = %id, operation, "stock write kept conflicting");
        }
        error.into()
    }
}

#[async_trait]
impl<S: DocumentStore> ProductCatalog for StoreProductCatalog<S> {
    async fn get(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.load(&id.to_string()).await?)
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>> {
        let keys: Vec<String> = ids.iter().map(ProductId::to_string).collect();
        let products = self.products.load_many(&keys).await?;
        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<Product> {
        let result = self
            .products
            .execute_with_retry(&id.to_string(), self.max_attempts, |product| {
                product.reserve(quantity)
            })
            .await
            .map_err(|e| match e {
                DomainError::NotFound { .. } => LifecycleError::ProductUnavailable {
                    name: "Unknown".to_string(),
                },
                other => Self::stock_error(other, id, "reserve"),
            })?;

        metrics::counter!("stock_reservations_total").increment(1);
        tracing::debug!(product_id = %id, quantity, stock = result.aggregate.stock, "stock reserved");
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self))]
    async fn release_stock(&self, id: ProductId, quantity: u32) -> Result<Option<Product>> {
        let result = self
            .products
            .execute_with_retry(&id.to_string(), self.max_attempts, |product| {
                product.release(quantity)
            })
            .await;

        match result {
            Ok(result) => {
                metrics::counter!("stock_releases_total").increment(1);
                tracing::debug!(product_id = %id, quantity, stock = result.aggregate.stock, "stock released");
                Ok(Some(result.aggregate))
            }
            Err(DomainError::NotFound { .. }) => Ok(None),
            Err(e) => Err(Self::stock_error(e, id, "release")),
        }
    }

    async fn upsert(&self, mut product: Product) -> Result<Product> {
        product.validate()?;
        let current = self.products.load(&product.id.to_string()).await?;
        product.set_version(current.map_or_else(Version::initial, |p| p.version()));
        let version = self.products.save(&product).await?;
        product.set_version(version);
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_store::InMemoryDocumentStore;
    use domain::Money;

    fn catalog() -> StoreProductCatalog<InMemoryDocumentStore> {
        StoreProductCatalog::new(InMemoryDocumentStore::new())
    }

    fn milk(stock: u32) -> Product {
        Product::new(ProductId::new(), "MLK-1", "Milk", Money::from_cents(349), stock)
    }

    #[tokio::test]
    async fn test_rejected_reserve_leaves_stock() {
        let catalog = catalog();
        let product = catalog.upsert(milk(2)).await.unwrap();

        let err = catalog.reserve_stock(product.id, 3).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InsufficientStock { available: 2, requested: 3, .. }
        ));
        assert_eq!(catalog.get(product.id).await.unwrap().unwrap().stock, 2);

        let reserved = catalog.reserve_stock(product.id, 2).await.unwrap();
        assert_eq!(reserved.stock, 0);
    }

    #[tokio::test]
    async fn test_reserve_missing_product_is_unavailable() {
        let catalog = catalog();
        let err = catalog.reserve_stock(ProductId::new(), 1).await.unwrap_err();
        assert_eq!(err.code(), "PRODUCT_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_release_missing_product_is_none() {
        let catalog = catalog();
        assert!(catalog.release_stock(ProductId::new(), 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing() {
        let catalog = catalog();
        let product = catalog.upsert(milk(5)).await.unwrap();
        assert_eq!(product.version(), Version::first());

        let mut restocked = product.clone();
        restocked.stock = 40;
        let stored = catalog.upsert(restocked).await.unwrap();
        assert_eq!(stored.version(), Version::new(2));
        assert_eq!(catalog.get(product.id).await.unwrap().unwrap().stock, 40);
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_product() {
        let catalog = catalog();
        let mut product = milk(1);
        product.name = " ".to_string();
        assert!(matches!(
            catalog.upsert(product).await,
            Err(LifecycleError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_upsert_rejects_overlong_name() {
        let catalog = catalog();
        let mut product = milk(1);
        product.name = "Milk ".repeat(56);
        let err = catalog.upsert(product.clone()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Validation(_)));
        assert!(catalog.get(product.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_many_skips_missing() {
        let catalog = catalog();
        let a = catalog.upsert(milk(1)).await.unwrap();
        let found = catalog.get_many(&[a.id, ProductId::new()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&a.id));
    }
}
