//! Lifecycle error types.

use common::ProductId;
use doc_store::StoreError;
use domain::{CartError, CouponError, DomainError, Money, OrderError, OrderStatus, ProductError};
use thiserror::Error;

/// Errors surfaced by the cart and order services.
///
/// Every variant maps to one machine-readable code, see [`LifecycleError::code`].
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The requested entity does not exist.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// The caller may not perform this operation.
    #[error("Not authorized to {action}")]
    Forbidden { action: &'static str },

    /// Not enough stock for the requested quantity.
    #[error("Insufficient stock for \"{name}\". Only {available} available.")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        available: u32,
        requested: u32,
    },

    /// Product was removed or deactivated.
    #[error("Product \"{name}\" is no longer available")]
    ProductUnavailable { name: String },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid coupon code: {code}")]
    InvalidCoupon { code: String },

    #[error("Minimum order of {minimum} required for coupon {code}")]
    CouponMinimumNotMet { code: String, minimum: Money },

    /// Requested status change is not allowed.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Order is past the point where it can be cancelled.
    #[error("Order cannot be cancelled in {status} status")]
    UncancellableState { status: OrderStatus },

    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// A concurrent request changed the same data first.
    #[error("Conflicting update, please retry: {0}")]
    Conflict(String),

    /// Anything the caller cannot act on.
    #[error("Internal error: {0}")]
    Internal(#[source] DomainError),
}

impl LifecycleError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::NotFound { .. } => "NOT_FOUND",
            LifecycleError::Forbidden { .. } => "FORBIDDEN",
            LifecycleError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            LifecycleError::ProductUnavailable { .. } => "PRODUCT_UNAVAILABLE",
            LifecycleError::EmptyCart => "EMPTY_CART",
            LifecycleError::InvalidCoupon { .. } => "INVALID_COUPON",
            LifecycleError::CouponMinimumNotMet { .. } => "COUPON_MINIMUM_NOT_MET",
            LifecycleError::InvalidTransition { .. } => "INVALID_TRANSITION",
            LifecycleError::UncancellableState { .. } => "UNCANCELLABLE_STATE",
            LifecycleError::Validation(_) => "VALIDATION_ERROR",
            LifecycleError::Conflict(_) => "CONFLICT",
            LifecycleError::Internal(_) => "SERVER_ERROR",
        }
    }

    pub(crate) fn not_found(entity: &'static str) -> Self {
        LifecycleError::NotFound { entity }
    }

    pub(crate) fn forbidden(action: &'static str) -> Self {
        LifecycleError::Forbidden { action }
    }
}

fn entity_name(collection: &str) -> &'static str {
    match collection {
        "orders" => "Order",
        "carts" => "Cart",
        "products" => "Product",
        _ => "Document",
    }
}

impl From<DomainError> for LifecycleError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Store(e) if e.is_conflict() => LifecycleError::Conflict(e.to_string()),
            DomainError::NotFound { collection, .. } => LifecycleError::not_found(entity_name(collection)),
            DomainError::Product(e) => e.into(),
            DomainError::Cart(e) => e.into(),
            DomainError::Order(e) => e.into(),
            other => LifecycleError::Internal(other),
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(error: StoreError) -> Self {
        DomainError::Store(error).into()
    }
}

impl From<ProductError> for LifecycleError {
    fn from(error: ProductError) -> Self {
        match error {
            ProductError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            } => LifecycleError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            },
            other => LifecycleError::Validation(other.to_string()),
        }
    }
}

impl From<CartError> for LifecycleError {
    fn from(error: CartError) -> Self {
        match error {
            CartError::InvalidQuantity { .. } => LifecycleError::Validation(error.to_string()),
            CartError::ProductNotFound { .. } => LifecycleError::not_found("Product"),
            CartError::ProductUnavailable { name } => LifecycleError::ProductUnavailable { name },
            CartError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            } => LifecycleError::InsufficientStock {
                product_id,
                name,
                available,
                requested,
            },
            CartError::ItemNotFound { .. } => LifecycleError::not_found("Cart item"),
            CartError::EmptyCart => LifecycleError::EmptyCart,
            CartError::Coupon(CouponError::Invalid { code }) => {
                LifecycleError::InvalidCoupon { code }
            }
            CartError::Coupon(CouponError::MinimumNotMet { code, minimum, .. }) => {
                LifecycleError::CouponMinimumNotMet { code, minimum }
            }
        }
    }
}

impl From<OrderError> for LifecycleError {
    fn from(error: OrderError) -> Self {
        match error {
            OrderError::InvalidTransition { from, to } => {
                LifecycleError::InvalidTransition { from, to }
            }
            OrderError::UncancellableState { status } => {
                LifecycleError::UncancellableState { status }
            }
            OrderError::NoItems => LifecycleError::EmptyCart,
            OrderError::AlreadyPlaced => LifecycleError::Conflict(error.to_string()),
            OrderError::InvalidQuantity { .. }
            | OrderError::InvalidAddress { .. }
            | OrderError::TextTooLong { .. }
            | OrderError::UnknownStatus(_) => LifecycleError::Validation(error.to_string()),
        }
    }
}

/// Convenience type alias for lifecycle results.
pub type Result<T> = std::result::Result<T, LifecycleError>;
