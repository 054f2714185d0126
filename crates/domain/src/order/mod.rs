//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod number;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use commands::PlaceOrder;
pub use events::{
    DeliveryRecordedData, OrderCancelledData, OrderEvent, OrderPlacedData, PaymentSettledData,
    StatusChangedData,
};
pub use number::OrderNumber;
pub use state::{OrderStatus, UnknownStatus};
pub use value_objects::{
    DeliverySlot, OrderLineItem, OrderTotals, PaymentDetails, PaymentMethod, PaymentStatus,
    ShippingAddress, StatusHistoryEntry,
};

use thiserror::Error;

/// Longest accepted customer note.
pub const MAX_NOTES_LEN: usize = 500;
/// Longest accepted status note.
pub const MAX_STATUS_NOTE_LEN: usize = 200;
/// Longest accepted cancellation reason.
pub const MAX_CANCEL_REASON_LEN: usize = 300;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Requested transition is not an edge of the status graph.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Order is past the point where it can be cancelled.
    #[error("Order cannot be cancelled in {status} status")]
    UncancellableState { status: OrderStatus },

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// A required shipping address field is blank.
    #[error("Shipping address {field} is required")]
    InvalidAddress { field: &'static str },

    /// Free text exceeds its limit.
    #[error("{field} cannot exceed {max} characters")]
    TextTooLong { field: &'static str, max: usize },

    /// Order is already placed.
    #[error("Order already placed")]
    AlreadyPlaced,

    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatus),
}
