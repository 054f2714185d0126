//! Checkout request and result types.

use chrono::{DateTime, Utc};
use common::OrderId;
use domain::{DeliverySlot, Money, Order, OrderNumber, OrderStatus, PaymentMethod, ShippingAddress};
use serde::{Deserialize, Serialize};

/// Collection holding one document per issued order number.
pub const ORDER_NUMBERS_COLLECTION: &str = "order_numbers";

/// Attempts at drawing an unused order number.
pub const ORDER_NUMBER_ATTEMPTS: usize = 5;

pub(crate) const STEP_VALIDATE_CART: &str = "validate_cart";
pub(crate) const STEP_PLACE_ORDER: &str = "place_order";
pub(crate) const STEP_RESERVE_STOCK: &str = "reserve_stock";
pub(crate) const STEP_CLEAR_CART: &str = "clear_cart";

/// What the shopper submits at checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub delivery_slot: Option<DeliverySlot>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckoutRequest {
    pub fn new(shipping_address: ShippingAddress, payment_method: PaymentMethod) -> Self {
        Self {
            shipping_address,
            payment_method,
            delivery_slot: None,
            notes: None,
        }
    }
}

/// What checkout hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSummary {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub estimated_delivery: Option<DateTime<Utc>>,
}

impl From<&Order> for CheckoutSummary {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id(),
            order_number: order.order_number().clone(),
            total_amount: order.total_amount(),
            status: order.status(),
            estimated_delivery: order.estimated_delivery(),
        }
    }
}

/// Result of copying a past order back into the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReorderOutcome {
    /// Lines merged into the cart.
    pub added_count: usize,
    /// Names of lines that could not be added.
    pub unavailable_items: Vec<String>,
}
