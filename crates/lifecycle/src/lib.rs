//! Cart and order lifecycle services.
//!
//! This crate provides:
//! - `CartService` for cart mutations and the priced cart view
//! - `OrderLifecycle` for checkout, status changes, cancellation and reorder
//! - `InventoryGate` for stock reservation with compensation on failure
//!
//! Checkout runs as a short saga:
//! 1. Validate the cart against live stock
//! 2. Place the order
//! 3. Reserve stock
//! 4. Clear the cart
//!
//! If reservation fails, reserved lines are released and the order is
//! cancelled before the error reaches the caller.

pub mod actor;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod inventory;
pub mod listing;
pub mod orders;

pub use actor::{Actor, Role};
pub use cart::CartService;
pub use catalog::{ProductCatalog, StoreProductCatalog};
pub use checkout::{CheckoutRequest, CheckoutSummary, ReorderOutcome};
pub use error::{LifecycleError, Result};
pub use inventory::{InventoryGate, StockLine};
pub use listing::{ListQuery, OrderSort, Page};
pub use orders::OrderLifecycle;
