//! Coupon code resolution.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Money;

use super::AppliedCoupon;

/// Errors raised when resolving a coupon code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("Invalid coupon code: {code}")]
    Invalid { code: String },

    #[error("Coupon {code} requires a minimum order of {minimum} (cart subtotal is {subtotal})")]
    MinimumNotMet {
        code: String,
        minimum: Money,
        subtotal: Money,
    },
}

/// How a coupon reduces the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CouponKind {
    /// Percentage of the subtotal.
    Percentage(u8),
    /// Fixed amount, never more than the subtotal.
    Fixed(Money),
}

/// A redeemable coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub kind: CouponKind,
    /// Smallest subtotal the coupon may be applied to.
    pub minimum_subtotal: Money,
}

impl Coupon {
    pub fn percentage(code: &str, percent: u8, minimum_subtotal: Money) -> Self {
        Self {
            code: normalize(code),
            kind: CouponKind::Percentage(percent),
            minimum_subtotal,
        }
    }

    pub fn fixed(code: &str, amount: Money, minimum_subtotal: Money) -> Self {
        Self {
            code: normalize(code),
            kind: CouponKind::Fixed(amount),
            minimum_subtotal,
        }
    }

    /// Discount this coupon grants on `subtotal`.
    pub fn discount_for(&self, subtotal: Money) -> Money {
        match self.kind {
            CouponKind::Percentage(percent) => subtotal.percentage(percent.min(100)),
            CouponKind::Fixed(amount) => amount.min(subtotal).max(Money::zero()),
        }
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Turns a coupon code into a discount for a given cart subtotal.
pub trait CouponResolver: Send + Sync {
    fn resolve(&self, code: &str, subtotal: Money) -> Result<AppliedCoupon, CouponError>;
}

/// Coupon table held in memory. Codes match case-insensitively.
#[derive(Debug, Clone)]
pub struct StaticCouponTable {
    coupons: HashMap<String, Coupon>,
}

impl StaticCouponTable {
    pub fn new(coupons: impl IntoIterator<Item = Coupon>) -> Self {
        Self {
            coupons: coupons
                .into_iter()
                .map(|c| (c.code.clone(), c))
                .collect(),
        }
    }

    /// The storefront's standing promotions.
    pub fn standard() -> Self {
        Self::new([
            Coupon::percentage("FRESH20", 20, Money::from_dollars(30)),
            Coupon::fixed("SAVE10", Money::from_dollars(10), Money::from_dollars(50)),
            Coupon::percentage("FIRST15", 15, Money::from_dollars(20)),
        ])
    }

    pub fn get(&self, code: &str) -> Option<&Coupon> {
        self.coupons.get(&normalize(code))
    }
}

impl Default for StaticCouponTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl CouponResolver for StaticCouponTable {
    fn resolve(&self, code: &str, subtotal: Money) -> Result<AppliedCoupon, CouponError> {
        let coupon = self.get(code).ok_or_else(|| CouponError::Invalid {
            code: normalize(code),
        })?;

        if subtotal < coupon.minimum_subtotal {
            return Err(CouponError::MinimumNotMet {
                code: coupon.code.clone(),
                minimum: coupon.minimum_subtotal,
                subtotal,
            });
        }

        Ok(AppliedCoupon {
            code: coupon.code.clone(),
            discount: coupon.discount_for(subtotal),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_coupon() {
        let table = StaticCouponTable::standard();
        let applied = table.resolve("fresh20", Money::from_dollars(40)).unwrap();
        assert_eq!(applied.code, "FRESH20");
        assert_eq!(applied.discount, Money::from_dollars(8));
    }

    #[test]
    fn test_fixed_coupon() {
        let table = StaticCouponTable::standard();
        let applied = table.resolve(" SAVE10 ", Money::from_dollars(75)).unwrap();
        assert_eq!(applied.discount, Money::from_dollars(10));
    }

    #[test]
    fn test_minimum_is_inclusive() {
        let table = StaticCouponTable::standard();
        assert!(table.resolve("FIRST15", Money::from_dollars(20)).is_ok());

        let err = table.resolve("FIRST15", Money::from_cents(1999)).unwrap_err();
        assert_eq!(
            err,
            CouponError::MinimumNotMet {
                code: "FIRST15".to_string(),
                minimum: Money::from_dollars(20),
                subtotal: Money::from_cents(1999),
            }
        );
    }

    #[test]
    fn test_unknown_code() {
        let table = StaticCouponTable::standard();
        assert!(matches!(
            table.resolve("bogus", Money::from_dollars(100)),
            Err(CouponError::Invalid { code }) if code == "BOGUS"
        ));
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let coupon = Coupon::fixed("BIG", Money::from_dollars(25), Money::zero());
        assert_eq!(coupon.discount_for(Money::from_dollars(10)), Money::from_dollars(10));
    }
}
