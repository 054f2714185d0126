//! Cart domain events.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::Money;

use super::AppliedCoupon;

/// Events that can occur on a cart aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    /// Units were added; merges with an existing line for the product.
    ItemAdded {
        product_id: ProductId,
        quantity: u32,
        price_at_add: Money,
    },

    /// A line's quantity was set outright.
    QuantityUpdated {
        product_id: ProductId,
        quantity: u32,
        price_at_add: Money,
    },

    /// A line was dropped.
    ItemRemoved { product_id: ProductId },

    /// Every line and the coupon were dropped.
    Cleared,

    CouponApplied(AppliedCoupon),

    CouponRemoved,
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::ItemAdded { .. } => "CartItemAdded",
            CartEvent::QuantityUpdated { .. } => "CartQuantityUpdated",
            CartEvent::ItemRemoved { .. } => "CartItemRemoved",
            CartEvent::Cleared => "CartCleared",
            CartEvent::CouponApplied(_) => "CouponApplied",
            CartEvent::CouponRemoved => "CouponRemoved",
        }
    }
}
