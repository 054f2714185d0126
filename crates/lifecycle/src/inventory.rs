//! Stock checks and reservations for checkout and cancellation.

use std::sync::Arc;

use common::ProductId;
use domain::{OrderLineItem, Product};

use crate::catalog::ProductCatalog;
use crate::error::{LifecycleError, Result};

/// A quantity of one product to take or put back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLine {
    pub product_id: ProductId,
    /// Product name, used when the product itself is gone.
    pub name: String,
    pub quantity: u32,
}

impl From<&OrderLineItem> for StockLine {
    fn from(line: &OrderLineItem) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name.clone(),
            quantity: line.quantity,
        }
    }
}

/// Checks, without writing, that `quantity` units of an active product can
/// be sold. `product` is the live catalog entry, `None` if it is gone.
pub fn check(product: Option<&Product>, quantity: u32) -> Result<&Product> {
    let product = product.ok_or_else(|| LifecycleError::ProductUnavailable {
        name: "Unknown".to_string(),
    })?;
    if !product.is_active {
        return Err(LifecycleError::ProductUnavailable {
            name: product.name.clone(),
        });
    }
    if product.stock < quantity {
        return Err(LifecycleError::InsufficientStock {
            product_id: product.id,
            name: product.name.clone(),
            available: product.stock,
            requested: quantity,
        });
    }
    Ok(product)
}

/// Guards stock levels on top of a [`ProductCatalog`].
pub struct InventoryGate<C> {
    catalog: Arc<C>,
}

impl<C> Clone for InventoryGate<C> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<C: ProductCatalog> InventoryGate<C> {
    pub fn new(catalog: Arc<C>) -> Self {
        Self { catalog }
    }

    pub async fn reserve(&self, product_id: ProductId, quantity: u32) -> Result<Product> {
        self.catalog.reserve_stock(product_id, quantity).await
    }

    /// Returns stock to a product. `false` if the product no longer exists.
    pub async fn release(&self, product_id: ProductId, quantity: u32) -> Result<bool> {
        let released = self.catalog.release_stock(product_id, quantity).await?;
        if released.is_none() {
            tracing::warn!(%product_id, quantity, "product missing, stock not restored");
        }
        Ok(released.is_some())
    }

    /// Reserves every line, or none.
    ///
    /// On the first failure the lines already reserved are released again,
    /// newest first, and the failure is returned.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn reserve_all(&self, lines: &[StockLine]) -> Result<()> {
        let mut reserved: Vec<&StockLine> = Vec::with_capacity(lines.len());

        for line in lines {
            let result = self
                .reserve(line.product_id, line.quantity)
                .await
                .map_err(|e| match e {
                    LifecycleError::ProductUnavailable { .. } => {
                        LifecycleError::ProductUnavailable {
                            name: line.name.clone(),
                        }
                    }
                    other => other,
                });
            match result {
                Ok(_) => reserved.push(line),
                Err(error) => {
                    tracing::warn!(
                        product_id = %line.product_id,
                        name = %line.name,
                        %error,
                        compensating = reserved.len(),
                        "stock reservation failed"
                    );
                    let undo: Vec<StockLine> = reserved.into_iter().rev().cloned().collect();
                    self.release_all(&undo).await;
                    return Err(error);
                }
            }
        }

        Ok(())
    }

    /// Returns stock for every line, best effort.
    ///
    /// Missing products and failed writes are logged and skipped. Returns
    /// how many lines were restored.
    pub async fn release_all(&self, lines: &[StockLine]) -> usize {
        let mut restored = 0;
        for line in lines {
            match self.release(line.product_id, line.quantity).await {
                Ok(true) => restored += 1,
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(
                        product_id = %line.product_id,
                        name = %line.name,
                        %error,
                        "failed to restore stock"
                    );
                }
            }
        }
        restored
    }
}
