//! Value objects for the order domain.

use chrono::{DateTime, NaiveDate, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::policy::CheckoutPolicy;
use crate::Money;

use super::{OrderError, OrderStatus};

/// How the shopper pays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Upi,
    /// Cash on delivery.
    #[default]
    Cod,
    Wallet,
}

impl PaymentMethod {
    /// Prepaid methods are treated as settled once the order is confirmed;
    /// no payment gateway is involved.
    pub fn settles_on_confirmation(&self) -> bool {
        !matches!(self, PaymentMethod::Cod)
    }

    pub fn is_cash_on_delivery(&self) -> bool {
        matches!(self, PaymentMethod::Cod)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub transaction_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

fn default_country() -> String {
    "USA".to_string()
}

/// Where the order is delivered. Copied onto the order at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

impl ShippingAddress {
    /// Trims every field and checks the required ones are present.
    pub fn normalized(self) -> Result<Self, OrderError> {
        fn required(field: &'static str, value: String) -> Result<String, OrderError> {
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(OrderError::InvalidAddress { field });
            }
            Ok(value)
        }

        let country = self.country.trim().to_string();
        Ok(Self {
            full_name: required("full_name", self.full_name)?,
            phone: required("phone", self.phone)?,
            street: required("street", self.street)?,
            city: required("city", self.city)?,
            state: required("state", self.state)?,
            zip_code: required("zip_code", self.zip_code)?,
            country: if country.is_empty() {
                default_country()
            } else {
                country
            },
        })
    }
}

/// Delivery window requested by the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySlot {
    pub date: NaiveDate,
    pub time_slot: String,
}

/// Immutable copy of a product line taken when the order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    /// Unit price resolved at checkout.
    pub price: Money,
    pub quantity: u32,
    pub image: Option<String>,
}

impl OrderLineItem {
    /// Returns the total price for this line (quantity * price).
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// One entry of the append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub note: String,
}

/// Monetary breakdown, computed once at checkout.
///
/// `total == subtotal + delivery_fee + tax - discount` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Prices a set of lines. The discount is capped at the subtotal.
    pub fn compute(lines: &[OrderLineItem], discount: Money, policy: &CheckoutPolicy) -> Self {
        let subtotal: Money = lines.iter().map(OrderLineItem::line_total).sum();
        let discount = discount.max(Money::zero()).min(subtotal);
        let delivery_fee = policy.delivery_fee_for(subtotal);
        let tax = policy.tax_for(subtotal);

        Self {
            subtotal,
            delivery_fee,
            tax,
            discount,
            total: subtotal + delivery_fee + tax - discount,
        }
    }
}
