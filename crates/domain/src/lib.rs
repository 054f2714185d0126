//! Domain layer for the grocery order engine.
//!
//! This crate provides:
//! - Aggregate trait and a Repository that persists aggregates as versioned documents
//! - Money and the unit price resolver
//! - Product, Cart and Order aggregates
//! - The order status state machine

pub mod aggregate;
pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod policy;
pub mod pricing;
pub mod product;
pub mod repository;

pub use aggregate::{Aggregate, DomainEvent};
pub use cart::{
    AppliedCoupon, Cart, CartError, CartEvent, CartItem, CartLineView, CartView, Coupon,
    CouponError, CouponKind, CouponResolver, StaticCouponTable,
};
pub use error::DomainError;
pub use money::Money;
pub use order::{
    DeliverySlot, Order, OrderError, OrderEvent, OrderLineItem, OrderNumber, OrderStatus,
    OrderTotals, PaymentMethod, PaymentStatus, PlaceOrder, ShippingAddress, StatusHistoryEntry,
};
pub use policy::CheckoutPolicy;
pub use pricing::{Discount, resolve_unit_price};
pub use product::{Product, ProductError, ProductEvent};
pub use repository::{CommandResult, DEFAULT_MAX_ATTEMPTS, Repository};
