//! Shopping cart service.

use std::collections::HashMap;
use std::sync::Arc;

use common::{Clock, ProductId, UserId};
use doc_store::DocumentStore;
use domain::{Cart, CartView, CheckoutPolicy, CouponResolver, Product, Repository};

use crate::catalog::ProductCatalog;
use crate::error::{LifecycleError, Result};

/// Cart operations for one shopper at a time.
///
/// Each mutation writes the cart at the version it read; a concurrent
/// write to the same cart fails with `Conflict` instead of being lost.
pub struct CartService<S: DocumentStore, C> {
    carts: Repository<S, Cart>,
    catalog: Arc<C>,
    coupons: Arc<dyn CouponResolver>,
    policy: Arc<CheckoutPolicy>,
    clock: Arc<dyn Clock>,
}

impl<S: DocumentStore + Clone, C> Clone for CartService<S, C> {
    fn clone(&self) -> Self {
        Self {
            carts: self.carts.clone(),
            catalog: Arc::clone(&self.catalog),
            coupons: Arc::clone(&self.coupons),
            policy: Arc::clone(&self.policy),
            clock: Arc::clone(&self.clock),
        }
    }
}

fn record_mutation(operation: &'static str) {
    metrics::counter!("cart_mutations_total", "operation" => operation).increment(1);
}

impl<S, C> CartService<S, C>
where
    S: DocumentStore,
    C: ProductCatalog,
{
    pub fn new(
        store: S,
        catalog: Arc<C>,
        coupons: Arc<dyn CouponResolver>,
        policy: Arc<CheckoutPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            carts: Repository::new(store),
            catalog,
            coupons,
            policy,
            clock,
        }
    }

    async fn load(&self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self.carts.load(&user_id.to_string()).await?)
    }

    async fn products_for(&self, cart: &Cart) -> Result<HashMap<ProductId, Product>> {
        let ids: Vec<ProductId> = cart.items().iter().map(|item| item.product_id).collect();
        self.catalog.get_many(&ids).await
    }

    /// Joins a cart with live catalog data.
    pub async fn view(&self, cart: &Cart) -> Result<CartView> {
        let products = self.products_for(cart).await?;
        Ok(CartView::compute(
            cart,
            &products,
            &self.policy,
            self.clock.now(),
        ))
    }

    /// Returns the shopper's cart, empty if none was ever stored.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<CartView> {
        let cart = self.load(user_id).await?.unwrap_or_else(|| Cart::new(user_id));
        self.view(&cart).await
    }

    /// Total units in the cart, without catalog lookups.
    pub async fn count(&self, user_id: UserId) -> Result<u32> {
        Ok(self
            .load(user_id)
            .await?
            .map_or(0, |cart| cart.item_count()))
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartView> {
        if quantity < 1 {
            return Err(LifecycleError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }
        let product = self
            .catalog
            .get(product_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("Product"))?;

        let now = self.clock.now();
        let result = self
            .carts
            .execute_or_init(
                &user_id.to_string(),
                || Cart::new(user_id),
                |cart| cart.add_item(&product, quantity, now),
            )
            .await?;

        record_mutation("add");
        tracing::info!(%user_id, %product_id, quantity, "item added to cart");
        self.view(&result.aggregate).await
    }

    /// Sets a line's quantity; zero or less removes the line.
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartView> {
        if self.load(user_id).await?.is_none() {
            return Err(LifecycleError::not_found("Cart"));
        }
        let product = self.catalog.get(product_id).await?;

        let now = self.clock.now();
        let result = self
            .carts
            .execute(&user_id.to_string(), |cart| {
                cart.update_quantity(product_id, product.as_ref(), quantity, now)
            })
            .await?;

        record_mutation("update");
        self.view(&result.aggregate).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, product_id: ProductId) -> Result<CartView> {
        if self.load(user_id).await?.is_none() {
            return Err(LifecycleError::not_found("Cart"));
        }
        let result = self
            .carts
            .execute(&user_id.to_string(), |cart| cart.remove_item(product_id))
            .await?;

        record_mutation("remove");
        self.view(&result.aggregate).await
    }

    /// Empties the cart and drops its coupon.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<CartView> {
        let Some(_) = self.load(user_id).await? else {
            return self.view(&Cart::new(user_id)).await;
        };
        let result = self
            .carts
            .execute(&user_id.to_string(), |cart| cart.clear())
            .await?;

        record_mutation("clear");
        self.view(&result.aggregate).await
    }

    /// Applies a coupon against the subtotal of the cart's valid lines.
    #[tracing::instrument(skip(self))]
    pub async fn apply_coupon(&self, user_id: UserId, code: &str) -> Result<CartView> {
        let cart = self.load(user_id).await?.ok_or(LifecycleError::EmptyCart)?;
        let products = self.products_for(&cart).await?;
        let subtotal = CartView::valid_subtotal(&cart, &products);

        let result = self
            .carts
            .execute(&user_id.to_string(), |cart| {
                cart.apply_coupon(code, subtotal, self.coupons.as_ref())
            })
            .await?;

        record_mutation("apply_coupon");
        tracing::info!(%user_id, code, %subtotal, "coupon applied");
        Ok(CartView::compute(
            &result.aggregate,
            &products,
            &self.policy,
            self.clock.now(),
        ))
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_coupon(&self, user_id: UserId) -> Result<CartView> {
        let Some(_) = self.load(user_id).await? else {
            return self.view(&Cart::new(user_id)).await;
        };
        let result = self
            .carts
            .execute(&user_id.to_string(), |cart| cart.remove_coupon())
            .await?;

        record_mutation("remove_coupon");
        self.view(&result.aggregate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StoreProductCatalog;
    use chrono::{TimeZone, Utc};
    use common::FixedClock;
    use doc_store::InMemoryDocumentStore;
    use domain::{Money, StaticCouponTable};

    struct Harness {
        service: CartService<InMemoryDocumentStore, StoreProductCatalog<InMemoryDocumentStore>>,
        catalog: Arc<StoreProductCatalog<InMemoryDocumentStore>>,
    }

    fn harness() -> Harness {
        let store = InMemoryDocumentStore::new();
        let catalog = Arc::new(StoreProductCatalog::new(store.clone()));
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 2, 2, 12, 0, 0).unwrap());
        let service = CartService::new(
            store,
            Arc::clone(&catalog),
            Arc::new(StaticCouponTable::standard()),
            Arc::new(CheckoutPolicy::default()),
            Arc::new(clock),
        );
        Harness { service, catalog }
    }

    async fn product(h: &Harness, name: &str, cents: i64, stock: u32) -> Product {
        h.catalog
            .upsert(Product::new(ProductId::new(), name.to_uppercase(), name, Money::from_cents(cents), stock))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_cart_view() {
        let h = harness();
        let view = h.service.get_cart(UserId::new()).await.unwrap();
        assert!(view.items.is_empty());
        assert_eq!(view.subtotal, Money::zero());
        assert_eq!(view.delivery_fee, Money::from_cents(499));
    }

    #[tokio::test]
    async fn test_add_merges_and_counts() {
        let h = harness();
        let user = UserId::new();
        let eggs = product(&h, "Eggs", 299, 10).await;

        h.service.add_item(user, eggs.id, 2).await.unwrap();
        let view = h.service.add_item(user, eggs.id, 3).await.unwrap();

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, 5);
        assert_eq!(h.service.count(user).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_add_errors() {
        let h = harness();
        let user = UserId::new();
        let eggs = product(&h, "Eggs", 299, 3).await;

        assert!(matches!(
            h.service.add_item(user, eggs.id, 0).await,
            Err(LifecycleError::Validation(_))
        ));
        assert!(matches!(
            h.service.add_item(user, ProductId::new(), 1).await,
            Err(LifecycleError::NotFound { entity: "Product" })
        ));
        assert!(matches!(
            h.service.add_item(user, eggs.id, 4).await,
            Err(LifecycleError::InsufficientStock { available: 3, requested: 4, .. })
        ));

        let mut retired = eggs.clone().inactive();
        retired.id = ProductId::new();
        let retired = h.catalog.upsert(retired).await.unwrap();
        assert!(matches!(
            h.service.add_item(user, retired.id, 1).await,
            Err(LifecycleError::ProductUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let h = harness();
        let user = UserId::new();
        let tea = product(&h, "Tea", 450, 6).await;
        let jam = product(&h, "Jam", 380, 6).await;

        assert!(matches!(
            h.service.update_quantity(user, tea.id, 2).await,
            Err(LifecycleError::NotFound { entity: "Cart" })
        ));

        h.service.add_item(user, tea.id, 1).await.unwrap();
        assert!(matches!(
            h.service.update_quantity(user, jam.id, 2).await,
            Err(LifecycleError::NotFound { entity: "Cart item" })
        ));
        assert!(matches!(
            h.service.update_quantity(user, tea.id, 7).await,
            Err(LifecycleError::InsufficientStock { .. })
        ));

        let view = h.service.update_quantity(user, tea.id, 4).await.unwrap();
        assert_eq!(view.total_items, 4);

        let view = h.service.update_quantity(user, tea.id, 0).await.unwrap();
        assert!(view.items.is_empty());

        assert!(matches!(
            h.service.remove_item(user, tea.id).await,
            Err(LifecycleError::NotFound { entity: "Cart item" })
        ));
    }

    #[tokio::test]
    async fn test_coupon_flow() {
        let h = harness();
        let user = UserId::new();
        let cheese = product(&h, "Cheese", 1500, 10).await;

        assert!(matches!(
            h.service.apply_coupon(user, "FRESH20").await,
            Err(LifecycleError::EmptyCart)
        ));

        h.service.add_item(user, cheese.id, 1).await.unwrap();
        assert!(matches!(
            h.service.apply_coupon(user, "SAVE10").await,
            Err(LifecycleError::CouponMinimumNotMet { .. })
        ));
        assert!(matches!(
            h.service.apply_coupon(user, "NOPE").await,
            Err(LifecycleError::InvalidCoupon { code }) if code == "NOPE"
        ));

        h.service.add_item(user, cheese.id, 1).await.unwrap();
        let view = h.service.apply_coupon(user, "fresh20").await.unwrap();
        assert_eq!(view.coupon.as_ref().unwrap().code, "FRESH20");
        assert_eq!(view.discount, Money::from_dollars(6));

        let view = h.service.remove_coupon(user).await.unwrap();
        assert!(view.coupon.is_none());
        assert_eq!(view.discount, Money::zero());
    }

    #[tokio::test]
    async fn test_clear_drops_lines_and_coupon() {
        let h = harness();
        let user = UserId::new();
        let olive = product(&h, "Olive oil", 2500, 5).await;
        h.service.add_item(user, olive.id, 2).await.unwrap();
        h.service.apply_coupon(user, "FIRST15").await.unwrap();

        let view = h.service.clear(user).await.unwrap();
        assert!(view.items.is_empty());
        assert!(view.coupon.is_none());
        assert_eq!(h.service.count(user).await.unwrap(), 0);

        // Clearing a cart that never existed is fine.
        assert!(h.service.clear(UserId::new()).await.is_ok());
    }
}
