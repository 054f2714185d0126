//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use doc_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::policy::CheckoutPolicy;
use crate::Money;

use super::{
    DeliverySlot, MAX_CANCEL_REASON_LEN, MAX_NOTES_LEN, MAX_STATUS_NOTE_LEN, OrderError,
    OrderEvent, OrderLineItem, OrderNumber, OrderStatus, OrderTotals, PaymentDetails,
    PaymentMethod, PaymentStatus, PlaceOrder, ShippingAddress, StatusHistoryEntry,
    events::{
        DeliveryRecordedData, OrderCancelledData, OrderPlacedData, PaymentSettledData,
        StatusChangedData,
    },
};

const PLACED_NOTE: &str = "Order placed";
const DEFAULT_CANCEL_REASON: &str = "Cancelled by user";

/// Order aggregate root.
///
/// Line items, address and totals are fixed when the order is placed.
/// After that the order only moves through the status graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    user_id: UserId,
    items: Vec<OrderLineItem>,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    #[serde(default)]
    payment_details: PaymentDetails,
    totals: OrderTotals,
    coupon_code: Option<String>,
    status: OrderStatus,
    status_history: Vec<StatusHistoryEntry>,
    estimated_delivery: Option<DateTime<Utc>>,
    actual_delivery: Option<DateTime<Utc>>,
    delivery_slot: Option<DeliverySlot>,
    notes: Option<String>,
    cancel_reason: Option<String>,
    created_at: DateTime<Utc>,

    #[serde(skip)]
    version: Version,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn collection() -> &'static str {
        "orders"
    }

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_placed(data),
            OrderEvent::StatusChanged(data) => {
                self.status = data.to;
                self.status_history.push(StatusHistoryEntry {
                    status: data.to,
                    timestamp: data.changed_at,
                    note: data.note,
                });
            }
            OrderEvent::PaymentSettled(data) => {
                self.payment_status = PaymentStatus::Paid;
                self.payment_details.paid_at = Some(data.paid_at);
            }
            OrderEvent::DeliveryRecorded(data) => {
                self.actual_delivery = Some(data.delivered_at);
            }
            OrderEvent::OrderCancelled(data) => {
                self.status = OrderStatus::Cancelled;
                self.status_history.push(StatusHistoryEntry {
                    status: OrderStatus::Cancelled,
                    timestamp: data.cancelled_at,
                    note: data.reason.clone(),
                });
                self.cancel_reason = Some(data.reason);
            }
        }
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[OrderLineItem] {
        &self.items
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn payment_details(&self) -> &PaymentDetails {
        &self.payment_details
    }

    pub fn totals(&self) -> &OrderTotals {
        &self.totals
    }

    pub fn total_amount(&self) -> Money {
        self.totals.total
    }

    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Append-only history, oldest first. Never empty once placed.
    pub fn status_history(&self) -> &[StatusHistoryEntry] {
        &self.status_history
    }

    pub fn estimated_delivery(&self) -> Option<DateTime<Utc>> {
        self.estimated_delivery
    }

    pub fn actual_delivery(&self) -> Option<DateTime<Utc>> {
        self.actual_delivery
    }

    pub fn delivery_slot(&self) -> Option<&DeliverySlot> {
        self.delivery_slot.as_ref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Sum of line quantities.
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn delivery_progress(&self) -> u8 {
        self.status.delivery_progress()
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    pub fn is_placed(&self) -> bool {
        !self.status_history.is_empty()
    }
}

fn check_len(field: &'static str, text: &str, max: usize) -> Result<(), OrderError> {
    if text.chars().count() > max {
        return Err(OrderError::TextTooLong { field, max });
    }
    Ok(())
}

/// Trims optional free text, treating blank as absent.
fn trimmed(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

// Command methods
impl Order {
    /// Places the order: validates the command, prices the lines and seeds
    /// the status history.
    pub fn place(
        &self,
        cmd: PlaceOrder,
        policy: &CheckoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.is_placed() {
            return Err(OrderError::AlreadyPlaced);
        }
        if cmd.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        if let Some(line) = cmd.items.iter().find(|line| line.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                quantity: line.quantity,
            });
        }

        let shipping_address = cmd.shipping_address.normalized()?;
        let notes = trimmed(cmd.notes);
        if let Some(notes) = &notes {
            check_len("notes", notes, MAX_NOTES_LEN)?;
        }

        let discount = cmd.coupon.as_ref().map_or(Money::zero(), |c| c.discount);
        let totals = OrderTotals::compute(&cmd.items, discount, policy);

        Ok(vec![OrderEvent::OrderPlaced(OrderPlacedData {
            order_id: cmd.order_id,
            order_number: cmd.order_number,
            user_id: cmd.user_id,
            items: cmd.items,
            shipping_address,
            payment_method: cmd.payment_method,
            totals,
            coupon_code: cmd.coupon.map(|c| c.code),
            estimated_delivery: policy.estimated_delivery(now),
            delivery_slot: cmd.delivery_slot,
            notes,
            placed_at: now,
        })])
    }

    /// Moves the order to `to`.
    ///
    /// A `cancelled` target is handled by [`Order::cancel`], with the note
    /// used as the reason.
    pub fn transition(
        &self,
        to: OrderStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.status.can_transition_to(to) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        if to == OrderStatus::Cancelled {
            return self.cancel(note, now);
        }

        let note = trimmed(note).unwrap_or_else(|| format!("Status updated to {to}"));
        check_len("note", &note, MAX_STATUS_NOTE_LEN)?;

        let mut events = vec![OrderEvent::StatusChanged(StatusChangedData {
            from: self.status,
            to,
            note,
            changed_at: now,
        })];

        let unpaid = self.payment_status != PaymentStatus::Paid;
        match to {
            OrderStatus::Confirmed if unpaid && self.payment_method.settles_on_confirmation() => {
                events.push(OrderEvent::PaymentSettled(PaymentSettledData { paid_at: now }));
            }
            OrderStatus::Delivered => {
                events.push(OrderEvent::DeliveryRecorded(DeliveryRecordedData {
                    delivered_at: now,
                }));
                if unpaid && self.payment_method.is_cash_on_delivery() {
                    events.push(OrderEvent::PaymentSettled(PaymentSettledData { paid_at: now }));
                }
            }
            _ => {}
        }

        Ok(events)
    }

    /// Cancels the order. Allowed until it is out for delivery.
    pub fn cancel(
        &self,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.status.can_cancel() {
            return Err(OrderError::UncancellableState {
                status: self.status,
            });
        }

        let reason = trimmed(reason).unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());
        check_len("reason", &reason, MAX_CANCEL_REASON_LEN)?;

        Ok(vec![OrderEvent::OrderCancelled(OrderCancelledData {
            from: self.status,
            reason,
            cancelled_at: now,
        })])
    }
}

// Event application
impl Order {
    fn apply_placed(&mut self, data: OrderPlacedData) {
        self.id = data.order_id;
        self.order_number = data.order_number;
        self.user_id = data.user_id;
        self.items = data.items;
        self.shipping_address = data.shipping_address;
        self.payment_method = data.payment_method;
        self.payment_status = PaymentStatus::Pending;
        self.payment_details = PaymentDetails::default();
        self.totals = data.totals;
        self.coupon_code = data.coupon_code;
        self.status = OrderStatus::Pending;
        self.status_history = vec![StatusHistoryEntry {
            status: OrderStatus::Pending,
            timestamp: data.placed_at,
            note: PLACED_NOTE.to_string(),
        }];
        self.estimated_delivery = Some(data.estimated_delivery);
        self.actual_delivery = None;
        self.delivery_slot = data.delivery_slot;
        self.notes = data.notes;
        self.cancel_reason = None;
        self.created_at = data.placed_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::AppliedCoupon;
    use chrono::{Duration, TimeZone};
    use common::ProductId;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 30, 0).unwrap()
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Grace Hopper".to_string(),
            phone: "555-0101".to_string(),
            street: "12 Harbor Rd".to_string(),
            city: "Arlington".to_string(),
            state: "VA".to_string(),
            zip_code: "22201".to_string(),
            country: "USA".to_string(),
        }
    }

    fn line(name: &str, price_cents: i64, quantity: u32) -> OrderLineItem {
        OrderLineItem {
            product_id: ProductId::new(),
            name: name.to_string(),
            sku: name.to_uppercase(),
            price: Money::from_cents(price_cents),
            quantity,
            image: None,
        }
    }

    fn place(method: PaymentMethod) -> Order {
        let cmd = PlaceOrder::new(
            OrderNumber::generate("FC", now()),
            UserId::new(),
            vec![line("Apples", 10_000, 2), line("Pears", 4000, 1)],
            address(),
            method,
        );
        let mut order = Order::default();
        let events = order.place(cmd, &CheckoutPolicy::default(), now()).unwrap();
        order.apply_events(events);
        order
    }

    fn advance(order: &mut Order, to: OrderStatus) {
        let events = order.transition(to, None, now()).unwrap();
        order.apply_events(events);
    }

    #[test]
    fn test_place_order() {
        let order = place(PaymentMethod::Card);

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        assert_eq!(order.status_history().len(), 1);
        assert_eq!(order.status_history()[0].note, "Order placed");
        assert_eq!(order.total_items(), 3);
        assert_eq!(order.estimated_delivery(), Some(now() + Duration::days(2)));

        let totals = order.totals();
        assert_eq!(totals.subtotal, Money::from_dollars(240));
        assert_eq!(totals.delivery_fee, Money::zero());
        assert_eq!(totals.tax, Money::from_cents(1920));
        assert_eq!(totals.total, Money::from_cents(25_920));
    }

    #[test]
    fn test_place_twice_fails() {
        let order = place(PaymentMethod::Cod);
        let cmd = PlaceOrder::new(
            OrderNumber::generate("FC", now()),
            UserId::new(),
            vec![line("Kale", 300, 1)],
            address(),
            PaymentMethod::Cod,
        );
        assert!(matches!(
            order.place(cmd, &CheckoutPolicy::default(), now()),
            Err(OrderError::AlreadyPlaced)
        ));
    }

    #[test]
    fn test_place_validation() {
        let order = Order::default();
        let policy = CheckoutPolicy::default();
        let base = PlaceOrder::new(
            OrderNumber::generate("FC", now()),
            UserId::new(),
            vec![],
            address(),
            PaymentMethod::Cod,
        );

        assert!(matches!(
            order.place(base.clone(), &policy, now()),
            Err(OrderError::NoItems)
        ));

        let mut zero_qty = base.clone();
        zero_qty.items = vec![line("Kale", 300, 0)];
        assert!(matches!(
            order.place(zero_qty, &policy, now()),
            Err(OrderError::InvalidQuantity { quantity: 0 })
        ));

        let mut long_notes = base.clone().with_notes(Some("x".repeat(501)));
        long_notes.items = vec![line("Kale", 300, 1)];
        assert!(matches!(
            order.place(long_notes, &policy, now()),
            Err(OrderError::TextTooLong { field: "notes", max: 500 })
        ));

        let mut no_phone = base;
        no_phone.items = vec![line("Kale", 300, 1)];
        no_phone.shipping_address.phone = "  ".to_string();
        assert!(matches!(
            order.place(no_phone, &policy, now()),
            Err(OrderError::InvalidAddress { field: "phone" })
        ));
    }

    #[test]
    fn test_coupon_discount_capped_and_recorded() {
        let cmd = PlaceOrder::new(
            OrderNumber::generate("FC", now()),
            UserId::new(),
            vec![line("Gum", 500, 1)],
            address(),
            PaymentMethod::Cod,
        )
        .with_coupon(Some(AppliedCoupon {
            code: "SAVE10".to_string(),
            discount: Money::from_dollars(10),
        }));

        let mut order = Order::default();
        let events = order.place(cmd, &CheckoutPolicy::default(), now()).unwrap();
        order.apply_events(events);

        let totals = order.totals();
        assert_eq!(totals.discount, Money::from_cents(500));
        assert_eq!(
            totals.total,
            totals.subtotal + totals.delivery_fee + totals.tax - totals.discount
        );
        assert_eq!(order.coupon_code(), Some("SAVE10"));
    }

    #[test]
    fn test_transition_closure() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let mut order = place(PaymentMethod::Cod);
                order.status = from;
                let before = order.status_history().len();

                match order.transition(to, None, now()) {
                    Ok(events) => {
                        assert!(from.can_transition_to(to), "{from} -> {to} should fail");
                        order.apply_events(events);
                        assert_eq!(order.status(), to);
                        assert_eq!(order.status_history().len(), before + 1);
                    }
                    Err(OrderError::InvalidTransition { from: f, to: t }) => {
                        assert!(!from.can_transition_to(to), "{from} -> {to} should pass");
                        assert_eq!((f, t), (from, to));
                        assert_eq!(order.status(), from);
                    }
                    Err(other) => panic!("unexpected error {other}"),
                }
            }
        }
    }

    #[test]
    fn test_full_chain() {
        let mut order = place(PaymentMethod::Cod);
        for to in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::OutForDelivery,
        ] {
            advance(&mut order, to);
            assert!(order.actual_delivery().is_none());
        }
        assert_eq!(order.payment_status(), PaymentStatus::Pending);

        advance(&mut order, OrderStatus::Delivered);
        assert_eq!(order.status_history().len(), 6);
        assert_eq!(order.actual_delivery(), Some(now()));
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
        assert_eq!(order.delivery_progress(), 100);
        assert_eq!(
            order.status_history()[1].note,
            "Status updated to confirmed"
        );
    }

    #[test]
    fn test_prepaid_settles_on_confirmation() {
        let mut order = place(PaymentMethod::Upi);
        advance(&mut order, OrderStatus::Confirmed);
        assert_eq!(order.payment_status(), PaymentStatus::Paid);
        assert_eq!(order.payment_details().paid_at, Some(now()));
    }

    #[test]
    fn test_supplied_note_is_recorded() {
        let mut order = place(PaymentMethod::Card);
        let events = order
            .transition(OrderStatus::Confirmed, Some("Picked by store 4".to_string()), now())
            .unwrap();
        order.apply_events(events);
        assert_eq!(order.status_history()[1].note, "Picked by store 4");

        let too_long = order.transition(OrderStatus::Processing, Some("n".repeat(201)), now());
        assert!(matches!(too_long, Err(OrderError::TextTooLong { field: "note", .. })));
    }

    #[test]
    fn test_cancel_from_shipped_then_again() {
        let mut order = place(PaymentMethod::Cod);
        for to in [OrderStatus::Confirmed, OrderStatus::Processing, OrderStatus::Shipped] {
            advance(&mut order, to);
        }
        let before = order.status_history().len();

        let events = order.cancel(None, now()).unwrap();
        order.apply_events(events);
        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.status_history().len(), before + 1);
        assert_eq!(order.cancel_reason(), Some("Cancelled by user"));

        assert!(matches!(
            order.cancel(Some("again".to_string()), now()),
            Err(OrderError::UncancellableState {
                status: OrderStatus::Cancelled
            })
        ));
    }

    #[test]
    fn test_cannot_cancel_out_for_delivery() {
        let mut order = place(PaymentMethod::Cod);
        for to in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::OutForDelivery,
        ] {
            advance(&mut order, to);
        }
        assert!(matches!(
            order.cancel(None, now()),
            Err(OrderError::UncancellableState { .. })
        ));
    }

    #[test]
    fn test_transition_to_cancelled_uses_note_as_reason() {
        let order = place(PaymentMethod::Cod);
        let events = order
            .transition(OrderStatus::Cancelled, Some("Out of stock at store".to_string()), now())
            .unwrap();
        assert!(matches!(
            &events[..],
            [OrderEvent::OrderCancelled(data)] if data.reason == "Out of stock at store"
        ));
    }

    #[test]
    fn test_document_round_trip_keeps_state() {
        let mut order = place(PaymentMethod::Wallet);
        advance(&mut order, OrderStatus::Confirmed);

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], "confirmed");
        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back.status_history(), order.status_history());
        assert_eq!(back.totals(), order.totals());
    }
}
