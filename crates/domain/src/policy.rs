//! Checkout constants: delivery fee, tax and delivery estimate.

use chrono::{DateTime, Duration, Utc};

use crate::Money;

/// Storefront-wide checkout settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPolicy {
    /// Subtotal at or above which delivery is free.
    pub free_delivery_threshold: Money,

    /// Flat delivery fee below the threshold.
    pub delivery_fee: Money,

    /// Tax rate on the subtotal, in basis points (800 = 8%).
    pub tax_rate_bps: u32,

    /// Days between placing an order and its estimated delivery.
    pub delivery_lead_days: i64,

    /// Prefix of human-readable order numbers.
    pub order_number_prefix: String,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            free_delivery_threshold: Money::from_dollars(50),
            delivery_fee: Money::from_cents(499),
            tax_rate_bps: 800,
            delivery_lead_days: 2,
            order_number_prefix: "FC".to_string(),
        }
    }
}

impl CheckoutPolicy {
    pub fn delivery_fee_for(&self, subtotal: Money) -> Money {
        if subtotal >= self.free_delivery_threshold {
            Money::zero()
        } else {
            self.delivery_fee
        }
    }

    /// How much more the shopper must spend for free delivery.
    pub fn amount_to_free_delivery(&self, subtotal: Money) -> Money {
        self.free_delivery_threshold.saturating_sub(subtotal)
    }

    pub fn tax_for(&self, subtotal: Money) -> Money {
        subtotal.basis_points(self.tax_rate_bps)
    }

    pub fn estimated_delivery(&self, placed_at: DateTime<Utc>) -> DateTime<Utc> {
        placed_at + Duration::days(self.delivery_lead_days)
    }
}
