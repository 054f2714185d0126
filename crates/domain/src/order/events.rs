//! Order domain events.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{
    DeliverySlot, OrderLineItem, OrderNumber, OrderStatus, OrderTotals, PaymentMethod,
    ShippingAddress,
};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was placed from a cart.
    OrderPlaced(OrderPlacedData),

    /// Order moved along the fulfilment chain.
    StatusChanged(StatusChangedData),

    /// Payment was marked as received.
    PaymentSettled(PaymentSettledData),

    /// Order was handed to the shopper.
    DeliveryRecorded(DeliveryRecordedData),

    /// Order was cancelled.
    OrderCancelled(OrderCancelledData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::StatusChanged(_) => "StatusChanged",
            OrderEvent::PaymentSettled(_) => "PaymentSettled",
            OrderEvent::DeliveryRecorded(_) => "DeliveryRecorded",
            OrderEvent::OrderCancelled(_) => "OrderCancelled",
        }
    }
}

/// Data for OrderPlaced event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub items: Vec<OrderLineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub totals: OrderTotals,
    pub coupon_code: Option<String>,
    pub estimated_delivery: DateTime<Utc>,
    pub delivery_slot: Option<DeliverySlot>,
    pub notes: Option<String>,
    pub placed_at: DateTime<Utc>,
}

/// Data for StatusChanged event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangedData {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub note: String,
    pub changed_at: DateTime<Utc>,
}

/// Data for PaymentSettled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettledData {
    pub paid_at: DateTime<Utc>,
}

/// Data for DeliveryRecorded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecordedData {
    pub delivered_at: DateTime<Utc>,
}

/// Data for OrderCancelled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledData {
    /// Status the order was in when cancelled.
    pub from: OrderStatus,
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = OrderEvent::StatusChanged(StatusChangedData {
            from: OrderStatus::Pending,
            to: OrderStatus::Confirmed,
            note: "Status updated to confirmed".to_string(),
            changed_at: Utc::now(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StatusChanged");
        assert_eq!(json["data"]["to"], "confirmed");

        let back: OrderEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.event_type(), "StatusChanged");
    }
}
