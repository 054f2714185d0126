//! Effective unit price resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Money;

/// A percentage discount, optionally bounded by an expiry instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    /// Percentage off the base price, 0 to 100.
    #[serde(default)]
    pub percentage: u8,

    /// Last instant at which the discount applies. `None` means no expiry.
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

impl Discount {
    /// No discount.
    pub fn none() -> Self {
        Self::default()
    }

    /// A discount of `percentage`% with an optional expiry.
    pub fn new(percentage: u8, valid_until: Option<DateTime<Utc>>) -> Self {
        Self {
            percentage,
            valid_until,
        }
    }

    /// Returns true if the discount reduces the price at `now`.
    ///
    /// The expiry instant itself is still inside the window.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.percentage > 0 && self.valid_until.is_none_or(|until| now <= until)
    }
}

/// Resolves the price a shopper pays for one unit at `now`.
pub fn resolve_unit_price(base: Money, discount: &Discount, now: DateTime<Utc>) -> Money {
    if discount.is_active(now) {
        base.less_percentage(discount.percentage)
    } else {
        base
    }
}
