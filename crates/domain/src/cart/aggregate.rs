//! Cart aggregate implementation.

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use doc_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::product::Product;
use crate::Money;

use super::{CartError, CartEvent, CouponResolver};

/// One product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,

    /// Unit price when the line was last added or updated.
    pub price_at_add: Money,
}

impl CartItem {
    pub fn line_total(&self) -> Money {
        self.price_at_add.multiply(self.quantity)
    }
}

/// A coupon code accepted for the cart and the discount it granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount: Money,
}

/// A shopper's cart. There is exactly one per user, keyed by user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    user_id: UserId,

    items: Vec<CartItem>,

    #[serde(default)]
    coupon: Option<AppliedCoupon>,

    #[serde(skip)]
    version: Version,
}

impl Aggregate for Cart {
    type Event = CartEvent;
    type Error = CartError;

    fn collection() -> &'static str {
        "carts"
    }

    fn key(&self) -> String {
        self.user_id.to_string()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            CartEvent::ItemAdded {
                product_id,
                quantity,
                price_at_add,
            } => match self.line_mut(product_id) {
                Some(line) => {
                    line.quantity += quantity;
                    line.price_at_add = price_at_add;
                }
                None => self.items.push(CartItem {
                    product_id,
                    quantity,
                    price_at_add,
                }),
            },
            CartEvent::QuantityUpdated {
                product_id,
                quantity,
                price_at_add,
            } => {
                if let Some(line) = self.line_mut(product_id) {
                    line.quantity = quantity;
                    line.price_at_add = price_at_add;
                }
            }
            CartEvent::ItemRemoved { product_id } => {
                self.items.retain(|item| item.product_id != product_id);
            }
            CartEvent::Cleared => {
                self.items.clear();
                self.coupon = None;
            }
            CartEvent::CouponApplied(coupon) => self.coupon = Some(coupon),
            CartEvent::CouponRemoved => self.coupon = None,
        }
    }
}

// Query methods
impl Cart {
    /// Creates an empty, never-stored cart for a user.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            coupon: None,
            version: Version::initial(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|item| item.product_id == product_id)
    }

    pub fn coupon(&self) -> Option<&AppliedCoupon> {
        self.coupon.as_ref()
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn positive_quantity(quantity: i64) -> Result<u32, CartError> {
    if quantity < 1 {
        return Err(CartError::InvalidQuantity { quantity });
    }
    u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity { quantity })
}

fn insufficient(product: &Product, requested: u32) -> CartError {
    CartError::InsufficientStock {
        product_id: product.id,
        name: product.name.clone(),
        available: product.stock,
        requested,
    }
}

// Command methods (return events)
impl Cart {
    /// Adds `quantity` units of a product at its current price.
    ///
    /// Merging into an existing line sums the quantities and refreshes the
    /// line's price. The merged quantity must be in stock.
    pub fn add_item(
        &self,
        product: &Product,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<CartEvent>, CartError> {
        let quantity = positive_quantity(quantity)?;

        if !product.is_active {
            return Err(CartError::ProductUnavailable {
                name: product.name.clone(),
            });
        }

        let existing = self.line(product.id).map_or(0, |line| line.quantity);
        let wanted = existing.saturating_add(quantity);
        if product.stock < wanted {
            return Err(insufficient(product, wanted));
        }

        Ok(vec![CartEvent::ItemAdded {
            product_id: product.id,
            quantity,
            price_at_add: product.effective_price(now),
        }])
    }

    /// Sets a line's quantity, removing the line when `quantity <= 0`.
    ///
    /// `product` is the live catalog entry, `None` if it no longer exists.
    pub fn update_quantity(
        &self,
        product_id: ProductId,
        product: Option<&Product>,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<CartEvent>, CartError> {
        if self.line(product_id).is_none() {
            return Err(CartError::ItemNotFound { product_id });
        }

        if quantity <= 0 {
            return Ok(vec![CartEvent::ItemRemoved { product_id }]);
        }

        let product = product.ok_or(CartError::ProductNotFound { product_id })?;
        let quantity = positive_quantity(quantity)?;
        if quantity > product.stock {
            return Err(insufficient(product, quantity));
        }

        Ok(vec![CartEvent::QuantityUpdated {
            product_id,
            quantity,
            price_at_add: product.effective_price(now),
        }])
    }

    pub fn remove_item(&self, product_id: ProductId) -> Result<Vec<CartEvent>, CartError> {
        if self.line(product_id).is_none() {
            return Err(CartError::ItemNotFound { product_id });
        }
        Ok(vec![CartEvent::ItemRemoved { product_id }])
    }

    /// Empties the cart and drops the coupon. A no-op on an empty cart.
    pub fn clear(&self) -> Result<Vec<CartEvent>, CartError> {
        if self.items.is_empty() && self.coupon.is_none() {
            return Ok(vec![]);
        }
        Ok(vec![CartEvent::Cleared])
    }

    /// Applies a coupon code against the given subtotal.
    pub fn apply_coupon(
        &self,
        code: &str,
        subtotal: Money,
        resolver: &dyn CouponResolver,
    ) -> Result<Vec<CartEvent>, CartError> {
        if self.items.is_empty() {
            return Err(CartError::EmptyCart);
        }
        let applied = resolver.resolve(code, subtotal)?;
        Ok(vec![CartEvent::CouponApplied(applied)])
    }

    pub fn remove_coupon(&self) -> Result<Vec<CartEvent>, CartError> {
        if self.coupon.is_none() {
            return Ok(vec![]);
        }
        Ok(vec![CartEvent::CouponRemoved])
    }

    /// Adds lines from a past order, capped at what is in stock.
    ///
    /// Each entry is a live product and the quantity originally ordered.
    /// Callers filter out unavailable products first; any that slip through
    /// with zero stock or inactive are skipped.
    pub fn merge_reordered(
        &self,
        lines: &[(Product, u32)],
        now: DateTime<Utc>,
    ) -> Result<Vec<CartEvent>, CartError> {
        let mut scratch = self.clone();
        let mut events = Vec::new();

        for (product, ordered) in lines {
            if !product.is_active || product.stock == 0 || *ordered == 0 {
                continue;
            }
            let price_at_add = product.effective_price(now);
            let adding = (*ordered).min(product.stock);

            let event = match scratch.line(product.id) {
                Some(line) => CartEvent::QuantityUpdated {
                    product_id: product.id,
                    quantity: line.quantity.saturating_add(adding).min(product.stock),
                    price_at_add,
                },
                None => CartEvent::ItemAdded {
                    product_id: product.id,
                    quantity: adding,
                    price_at_add,
                },
            };
            scratch.apply(event.clone());
            events.push(event);
        }

        Ok(events)
    }
}
