//! Money amounts in integer cents.

use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
///
/// Serialized as a bare integer number of cents.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

/// Divides rounding half away from zero.
fn div_round(numerator: i64, denominator: i64) -> i64 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        -((-numerator + half) / denominator)
    }
}

impl Money {
    /// Creates a new Money amount from cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from a whole dollar value.
    pub const fn from_dollars(dollars: i64) -> Self {
        Self {
            cents: dollars * 100,
        }
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * i64::from(quantity),
        }
    }

    /// Returns `percent`% of this amount, rounded half-up to the cent.
    pub fn percentage(&self, percent: u8) -> Money {
        Money {
            cents: div_round(self.cents * i64::from(percent), 100),
        }
    }

    /// Returns this amount reduced by `percent`%, rounded half-up to the cent.
    ///
    /// Percentages above 100 are treated as 100.
    pub fn less_percentage(&self, percent: u8) -> Money {
        let kept = 100 - i64::from(percent.min(100));
        Money {
            cents: div_round(self.cents * kept, 100),
        }
    }

    /// Applies a rate in basis points (1/100 of a percent), rounded half-up.
    pub fn basis_points(&self, bps: u32) -> Money {
        Money {
            cents: div_round(self.cents * i64::from(bps), 10_000),
        }
    }

    /// Subtracts, flooring the result at zero.
    pub fn saturating_sub(&self, other: Money) -> Money {
        Money {
            cents: (self.cents - other.cents).max(0),
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.cents -= rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.cents(), 1234);
        assert_eq!(money.dollars(), 12);
        assert_eq!(money.cents_part(), 34);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 15% of 9.99 = 1.4985
        assert_eq!(Money::from_cents(999).percentage(15).cents(), 150);
        // 20% of 0.03 = 0.006
        assert_eq!(Money::from_cents(3).percentage(20).cents(), 1);
        assert_eq!(Money::from_cents(2).percentage(20).cents(), 0);
    }

    #[test]
    fn test_less_percentage() {
        assert_eq!(Money::from_dollars(50).less_percentage(20).cents(), 4000);
        // 3.33 * 0.85 = 2.8305
        assert_eq!(Money::from_cents(333).less_percentage(15).cents(), 283);
        assert_eq!(Money::from_cents(333).less_percentage(100).cents(), 0);
        assert_eq!(Money::from_cents(333).less_percentage(250).cents(), 0);
    }

    #[test]
    fn test_basis_points() {
        // 8% of 240.00
        assert_eq!(Money::from_dollars(240).basis_points(800).cents(), 1920);
        // 19.99 * 0.08 = 1.5992
        assert_eq!(Money::from_cents(1999).basis_points(800).cents(), 160);
    }

    #[test]
    fn test_saturating_sub() {
        let a = Money::from_cents(500);
        assert_eq!(a.saturating_sub(Money::from_cents(200)).cents(), 300);
        assert_eq!(a.saturating_sub(Money::from_cents(900)), Money::zero());
    }

    #[test]
    fn test_money_sum_and_multiply() {
        let total: Money = [Money::from_cents(100), Money::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total.cents(), 350);
        assert_eq!(Money::from_cents(999).multiply(3).cents(), 2997);
    }

    #[test]
    fn test_money_serializes_as_cents() {
        let json = serde_json::to_value(Money::from_cents(499)).unwrap();
        assert_eq!(json, serde_json::json!(499));
    }
}
