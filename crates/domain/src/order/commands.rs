//! Order commands.

use common::{OrderId, UserId};

use crate::cart::AppliedCoupon;

use super::{DeliverySlot, OrderLineItem, OrderNumber, PaymentMethod, ShippingAddress};

/// Command to place an order from already priced lines.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    /// Lines priced at checkout time.
    pub items: Vec<OrderLineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    /// Coupon carried over from the cart.
    pub coupon: Option<AppliedCoupon>,
    pub delivery_slot: Option<DeliverySlot>,
    pub notes: Option<String>,
}

impl PlaceOrder {
    /// Creates a PlaceOrder command with a fresh order id and no extras.
    pub fn new(
        order_number: OrderNumber,
        user_id: UserId,
        items: Vec<OrderLineItem>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            order_number,
            user_id,
            items,
            shipping_address,
            payment_method,
            coupon: None,
            delivery_slot: None,
            notes: None,
        }
    }

    pub fn with_coupon(mut self, coupon: Option<AppliedCoupon>) -> Self {
        self.coupon = coupon;
        self
    }

    pub fn with_delivery_slot(mut self, slot: Option<DeliverySlot>) -> Self {
        self.delivery_slot = slot;
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}
