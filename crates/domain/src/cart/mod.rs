//! Shopping cart aggregate and related types.

mod aggregate;
mod coupon;
mod events;
mod view;

pub use aggregate::{AppliedCoupon, Cart, CartItem};
pub use coupon::{Coupon, CouponError, CouponKind, CouponResolver, StaticCouponTable};
pub use events::CartEvent;
pub use view::{CartLineView, CartView};

use common::ProductId;
use thiserror::Error;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity outside the accepted range.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: i64 },

    /// Product referenced by a cart operation does not exist.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: ProductId },

    /// Product exists but is not for sale.
    #[error("{name} is currently unavailable")]
    ProductUnavailable { name: String },

    /// Not enough stock for the requested quantity.
    #[error("Insufficient stock for {name}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        available: u32,
        requested: u32,
    },

    /// Product is not in the cart.
    #[error("Item not found in cart: {product_id}")]
    ItemNotFound { product_id: ProductId },

    /// Operation requires a non-empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Coupon could not be applied.
    #[error(transparent)]
    Coupon(#[from] CouponError),
}
