//! Derived cart totals. Never stored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{ProductId, UserId};
use serde::Serialize;

use crate::policy::CheckoutPolicy;
use crate::product::Product;
use crate::Money;

use super::{AppliedCoupon, Cart};

/// A cart line joined with its live catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub image: Option<String>,
    /// Base catalog price.
    pub price: Money,
    /// Price a shopper would pay right now.
    pub current_price: Money,
    pub price_at_add: Money,
    pub quantity: u32,
    pub stock: u32,
    pub is_active: bool,
    /// Active and enough stock for the line's quantity.
    pub in_stock: bool,
    pub line_total: Money,
}

/// The cart as presented to the shopper, with computed totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub user_id: UserId,
    pub items: Vec<CartLineView>,
    pub total_items: u32,
    pub subtotal: Money,
    pub coupon: Option<AppliedCoupon>,
    pub discount: Money,
    pub delivery_fee: Money,
    pub amount_to_free_delivery: Money,
    pub estimated_total: Money,
}

impl CartView {
    /// Subtotal at add-time prices over lines whose product still exists
    /// and is active.
    pub fn valid_subtotal(cart: &Cart, products: &HashMap<ProductId, Product>) -> Money {
        cart.items()
            .iter()
            .filter(|item| {
                products
                    .get(&item.product_id)
                    .is_some_and(|product| product.is_active)
            })
            .map(|item| item.line_total())
            .sum()
    }

    /// Joins `cart` with live `products` and computes its totals.
    ///
    /// Lines whose product has disappeared from the catalog stay stored in
    /// the cart but are not shown.
    pub fn compute(
        cart: &Cart,
        products: &HashMap<ProductId, Product>,
        policy: &CheckoutPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        let items: Vec<CartLineView> = cart
            .items()
            .iter()
            .filter_map(|item| {
                let product = products.get(&item.product_id)?;
                Some(CartLineView {
                    product_id: item.product_id,
                    name: product.name.clone(),
                    sku: product.sku.clone(),
                    image: product.image.clone(),
                    price: product.price,
                    current_price: product.effective_price(now),
                    price_at_add: item.price_at_add,
                    quantity: item.quantity,
                    stock: product.stock,
                    is_active: product.is_active,
                    in_stock: product.can_supply(item.quantity),
                    line_total: item.line_total(),
                })
            })
            .collect();

        let subtotal = Self::valid_subtotal(cart, products);
        let discount = cart.coupon().map_or(Money::zero(), |c| c.discount);
        let delivery_fee = policy.delivery_fee_for(subtotal);

        Self {
            user_id: cart.user_id(),
            items,
            total_items: cart.item_count(),
            subtotal,
            coupon: cart.coupon().cloned(),
            discount,
            delivery_fee,
            amount_to_free_delivery: policy.amount_to_free_delivery(subtotal),
            estimated_total: subtotal.saturating_sub(discount) + delivery_fee,
        }
    }
}
