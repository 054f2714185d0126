//! Shared types used across the grocery order engine crates.

pub mod clock;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use types::{OrderId, ProductId, UserId};
