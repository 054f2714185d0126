//! Order lifecycle: checkout, status changes, cancellation and reorder.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{Clock, OrderId, UserId};
use doc_store::{Document, DocumentStore, PutOptions};
use domain::{
    Aggregate, Cart, CheckoutPolicy, Order, OrderLineItem, OrderNumber, OrderStatus, PlaceOrder,
    Product, Repository,
};
use domain::order::MAX_CANCEL_REASON_LEN;

use crate::actor::Actor;
use crate::catalog::ProductCatalog;
use crate::checkout::{
    CheckoutRequest, CheckoutSummary, ORDER_NUMBER_ATTEMPTS, ORDER_NUMBERS_COLLECTION,
    ReorderOutcome, STEP_CLEAR_CART, STEP_PLACE_ORDER, STEP_RESERVE_STOCK, STEP_VALIDATE_CART,
};
use crate::error::{LifecycleError, Result};
use crate::inventory::{self, InventoryGate, StockLine};
use crate::listing::{DEFAULT_ADMIN_PAGE_SIZE, DEFAULT_OWN_PAGE_SIZE, ListQuery, Page};

/// Orchestrates order creation and every later change to an order.
///
/// Checkout is a short saga over separate document writes:
/// 1. Validate the cart against live stock
/// 2. Place the order (pending)
/// 3. Reserve stock line by line
/// 4. Clear the cart
///
/// If step 3 fails, the lines already reserved are released and the order
/// is cancelled before the error is returned; the cart is left as it was.
pub struct OrderLifecycle<S: DocumentStore, C> {
    store: S,
    orders: Repository<S, Order>,
    carts: Repository<S, Cart>,
    catalog: Arc<C>,
    inventory: InventoryGate<C>,
    policy: Arc<CheckoutPolicy>,
    clock: Arc<dyn Clock>,
}

impl<S: DocumentStore + Clone, C> Clone for OrderLifecycle<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            orders: self.orders.clone(),
            carts: self.carts.clone(),
            catalog: Arc::clone(&self.catalog),
            inventory: self.inventory.clone(),
            policy: Arc::clone(&self.policy),
            clock: Arc::clone(&self.clock),
        }
    }
}

fn checkout_failed(step: &'static str, error: &LifecycleError) {
    metrics::counter!("checkout_failures_total", "step" => step, "code" => error.code())
        .increment(1);
}

impl<S, C> OrderLifecycle<S, C>
where
    S: DocumentStore + Clone,
    C: ProductCatalog,
{
    pub fn new(
        store: S,
        catalog: Arc<C>,
        policy: Arc<CheckoutPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orders: Repository::new(store.clone()),
            carts: Repository::new(store.clone()),
            store,
            inventory: InventoryGate::new(Arc::clone(&catalog)),
            catalog,
            policy,
            clock,
        }
    }

    /// Turns the shopper's cart into a pending order.
    #[tracing::instrument(skip(self, request), fields(saga = "checkout"))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
    ) -> Result<CheckoutSummary> {
        let started = Instant::now();
        let now = self.clock.now();

        // 1. Validate the cart against live stock
        tracing::info!(step = STEP_VALIDATE_CART, "checkout step started");
        let lines = self
            .priced_lines(user_id, now)
            .await
            .inspect_err(|e| checkout_failed(STEP_VALIDATE_CART, e))?;
        let cart = lines.cart;

        // 2. Place the order
        tracing::info!(step = STEP_PLACE_ORDER, "checkout step started");
        let order = self
            .place(user_id, &cart, lines.items, request, now)
            .await
            .inspect_err(|e| checkout_failed(STEP_PLACE_ORDER, e))?;
        let order_key = order.key();

        // 3. Reserve stock
        tracing::info!(step = STEP_RESERVE_STOCK, "checkout step started");
        let stock_lines: Vec<StockLine> = order.items().iter().map(StockLine::from).collect();
        if let Err(error) = self.inventory.reserve_all(&stock_lines).await {
            checkout_failed(STEP_RESERVE_STOCK, &error);
            let reason = rollback_reason(&error);
            match self
                .orders
                .execute(&order_key, |o| o.cancel(Some(reason), now))
                .await
            {
                Ok(_) => tracing::warn!(order_id = %order.id(), %error, "checkout compensated, order cancelled"),
                Err(cancel_error) => tracing::error!(
                    order_id = %order.id(),
                    %error,
                    %cancel_error,
                    "checkout compensation could not cancel the order"
                ),
            }
            return Err(error);
        }

        // 4. Clear the cart
        tracing::info!(step = STEP_CLEAR_CART, "checkout step started");
        if let Err(error) = self
            .carts
            .execute(&user_id.to_string(), |cart| cart.clear())
            .await
        {
            tracing::warn!(%user_id, order_id = %order.id(), %error, "order placed but cart not cleared");
        }

        let duration = started.elapsed().as_secs_f64();
        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("checkout_duration_seconds").record(duration);
        tracing::info!(
            order_id = %order.id(),
            order_number = %order.order_number(),
            total = %order.total_amount(),
            duration,
            "order placed"
        );

        Ok(CheckoutSummary::from(&order))
    }

    async fn priced_lines(&self, user_id: UserId, now: DateTime<Utc>) -> Result<PricedCart> {
        let cart = self
            .carts
            .load(&user_id.to_string())
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or(LifecycleError::EmptyCart)?;

        let ids: Vec<_> = cart.items().iter().map(|item| item.product_id).collect();
        let products = self.catalog.get_many(&ids).await?;

        let items = cart
            .items()
            .iter()
            .map(|item| {
                let product = inventory::check(products.get(&item.product_id), item.quantity)?;
                Ok(line_item(product, item.quantity, now))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PricedCart { cart, items })
    }

    async fn place(
        &self,
        user_id: UserId,
        cart: &Cart,
        items: Vec<OrderLineItem>,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<Order> {
        let shipping_address = request.shipping_address.normalized()?;
        let order_id = OrderId::new();
        let order_number = self
            .reserve_order_number(order_id, || {
                OrderNumber::generate(&self.policy.order_number_prefix, now)
            })
            .await?;

        let cmd = PlaceOrder::new(
            order_number,
            user_id,
            items,
            shipping_address,
            request.payment_method,
        )
        .with_coupon(cart.coupon().cloned())
        .with_delivery_slot(request.delivery_slot)
        .with_notes(request.notes);
        let cmd = PlaceOrder { order_id, ..cmd };

        let result = self
            .orders
            .create(|order| order.place(cmd, &self.policy, now))
            .await?;
        Ok(result.aggregate)
    }

    /// Claims an unused order number for `order_id`, drawing a new one on
    /// collision.
    async fn reserve_order_number(
        &self,
        order_id: OrderId,
        mut generate: impl FnMut() -> OrderNumber,
    ) -> Result<OrderNumber> {
        for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
            let number = generate();
            let write = Document::builder()
                .collection(ORDER_NUMBERS_COLLECTION)
                .key(number.as_str())
                .body(&serde_json::json!({ "order_id": order_id }))?
                .build()?;

            match self.store.put(write, PutOptions::expect_new()).await {
                Ok(_) => return Ok(number),
                Err(e) if e.is_conflict() => {
                    tracing::debug!(%number, attempt, "order number taken, drawing another");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(LifecycleError::Conflict(
            "could not allocate a unique order number".to_string(),
        ))
    }

    async fn load_for(&self, actor: &Actor, order_id: OrderId) -> Result<Order> {
        let order = self
            .orders
            .load(&order_id.to_string())
            .await?
            .ok_or_else(|| LifecycleError::not_found("Order"))?;
        if !actor.can_access(&order) {
            return Err(LifecycleError::forbidden("access this order"));
        }
        Ok(order)
    }

    /// Returns an order to its owner or an administrator.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, actor: &Actor, order_id: OrderId) -> Result<Order> {
        self.load_for(actor, order_id).await
    }

    /// The shopper's own orders, newest first unless asked otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn list_my_orders(&self, user_id: UserId, query: &ListQuery) -> Result<Page<Order>> {
        let request = query.page_request(DEFAULT_OWN_PAGE_SIZE)?;
        let filters = vec![("user_id", serde_json::Value::String(user_id.to_string()))];
        let doc_query = query.to_document_query(request, filters);

        let total = self.orders.count(doc_query.clone()).await?;
        let items = self.orders.find(doc_query).await?;
        Ok(Page::new(items, request, total))
    }

    /// Every order, for administrators.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_orders(&self, actor: &Actor, query: &ListQuery) -> Result<Page<Order>> {
        if !actor.is_admin() {
            return Err(LifecycleError::forbidden("list all orders"));
        }
        let request = query.page_request(DEFAULT_ADMIN_PAGE_SIZE)?;
        let doc_query = query.to_document_query(request, Vec::new());

        let total = self.orders.count(doc_query.clone()).await?;
        let items = self.orders.find(doc_query).await?;
        Ok(Page::new(items, request, total))
    }

    /// Moves an order along the status graph. Administrators only.
    ///
    /// A `cancelled` target is checked against the status graph, then goes
    /// through [`OrderLifecycle::cancel_order`] so that stock is restored.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        order_id: OrderId,
        status: OrderStatus,
        note: Option<String>,
    ) -> Result<Order> {
        if !actor.is_admin() {
            return Err(LifecycleError::forbidden("update order status"));
        }
        if status == OrderStatus::Cancelled {
            let current = self.load_for(actor, order_id).await?;
            if !current.status().can_transition_to(status) {
                return Err(LifecycleError::InvalidTransition {
                    from: current.status(),
                    to: status,
                });
            }
            return self.cancel_order(actor, order_id, note).await;
        }

        let now = self.clock.now();
        let result = self
            .orders
            .execute(&order_id.to_string(), |order| {
                order.transition(status, note, now)
            })
            .await?;

        metrics::counter!("order_status_transitions_total", "to" => status.as_str()).increment(1);
        tracing::info!(%order_id, %status, "order status updated");
        Ok(result.aggregate)
    }

    /// Cancels an order and returns its stock. Owner or administrator.
    ///
    /// The cancellation is stored first; stock restoration afterwards is
    /// best effort per line.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        actor: &Actor,
        order_id: OrderId,
        reason: Option<String>,
    ) -> Result<Order> {
        let current = self.load_for(actor, order_id).await?;
        let now = self.clock.now();
        let result = self
            .orders
            .execute(&current.key(), |order| order.cancel(reason, now))
            .await?;
        let order = result.aggregate;

        let lines: Vec<StockLine> = order.items().iter().map(StockLine::from).collect();
        let restored = self.inventory.release_all(&lines).await;

        metrics::counter!("orders_cancelled_total").increment(1);
        metrics::counter!("order_status_transitions_total", "to" => OrderStatus::Cancelled.as_str())
            .increment(1);
        tracing::info!(%order_id, restored, lines = lines.len(), "order cancelled");
        Ok(order)
    }

    /// Copies a past order's lines back into the owner's cart at today's
    /// prices, capped at live stock.
    #[tracing::instrument(skip(self))]
    pub async fn reorder(&self, user_id: UserId, order_id: OrderId) -> Result<ReorderOutcome> {
        let order = self
            .orders
            .load(&order_id.to_string())
            .await?
            .ok_or_else(|| LifecycleError::not_found("Order"))?;
        if !order.is_owned_by(user_id) {
            return Err(LifecycleError::forbidden("reorder this order"));
        }

        let ids: Vec<_> = order.items().iter().map(|line| line.product_id).collect();
        let products = self.catalog.get_many(&ids).await?;

        let mut available: Vec<(Product, u32)> = Vec::new();
        let mut unavailable_items = Vec::new();
        for line in order.items() {
            match products.get(&line.product_id) {
                Some(product) if product.is_active && product.stock > 0 => {
                    available.push((product.clone(), line.quantity));
                }
                _ => unavailable_items.push(line.name.clone()),
            }
        }

        if !available.is_empty() {
            let now = self.clock.now();
            self.carts
                .execute_or_init(
                    &user_id.to_string(),
                    || Cart::new(user_id),
                    |cart| cart.merge_reordered(&available, now),
                )
                .await?;
            metrics::counter!("cart_mutations_total", "operation" => "reorder").increment(1);
        }

        tracing::info!(
            %order_id,
            added = available.len(),
            unavailable = unavailable_items.len(),
            "order copied to cart"
        );
        Ok(ReorderOutcome {
            added_count: available.len(),
            unavailable_items,
        })
    }
}

/// Cancellation reason recorded when stock reservation fails, cut to the
/// length an order accepts.
fn rollback_reason(error: &LifecycleError) -> String {
    format!("Stock reservation failed: {error}")
        .chars()
        .take(MAX_CANCEL_REASON_LEN)
        .collect()
}

struct PricedCart {
    cart: Cart,
    items: Vec<OrderLineItem>,
}

/// Freezes a product into an order line at its price right now.
fn line_item(product: &Product, quantity: u32, now: DateTime<Utc>) -> OrderLineItem {
    OrderLineItem {
        product_id: product.id,
        name: product.name.clone(),
        sku: product.sku.clone(),
        price: product.effective_price(now),
        quantity,
        image: product.image.clone(),
    }
}
