//! Catalog product as seen by the order engine.
//!
//! Products are owned by the catalog; the engine reads their price and
//! availability and is the only writer of their stock level.

use chrono::{DateTime, Utc};
use common::ProductId;
use doc_store::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{Aggregate, DomainEvent};
use crate::pricing::{Discount, resolve_unit_price};
use crate::Money;

/// Errors that can occur during product operations.
#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Insufficient stock for {name}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        available: u32,
        requested: u32,
    },

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    #[error("Invalid discount percentage: {percentage} (must be between 0 and 100)")]
    InvalidDiscount { percentage: u8 },

    #[error("Invalid price: {price}")]
    InvalidPrice { price: Money },

    #[error("Product {field} is required")]
    MissingField { field: &'static str },

    #[error("Product name cannot exceed {max} characters")]
    NameTooLong { max: usize },
}

/// Longest accepted product name.
pub const MAX_NAME_LEN: usize = 100;

/// Events that can occur on a product's stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    StockReserved { quantity: u32 },
    StockReleased { quantity: u32 },
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::StockReserved { .. } => "StockReserved",
            ProductEvent::StockReleased { .. } => "StockReleased",
        }
    }
}

fn active_by_default() -> bool {
    true
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,

    /// Primary image URL.
    #[serde(default)]
    pub image: Option<String>,

    /// Base price before any discount.
    pub price: Money,

    /// Units on hand.
    pub stock: u32,

    #[serde(default)]
    pub discount: Discount,

    #[serde(default = "active_by_default")]
    pub is_active: bool,

    #[serde(skip)]
    version: Version,
}

impl Product {
    /// Creates an active product with no discount.
    pub fn new(
        id: ProductId,
        sku: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        stock: u32,
    ) -> Self {
        Self {
            id,
            sku: sku.into(),
            name: name.into(),
            image: None,
            price,
            stock,
            discount: Discount::none(),
            is_active: true,
            version: Version::initial(),
        }
    }

    pub fn with_discount(mut self, discount: Discount) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Checks the catalog invariants before the product is stored.
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() {
            return Err(ProductError::MissingField { field: "name" });
        }
        if self.name.trim().chars().count() > MAX_NAME_LEN {
            return Err(ProductError::NameTooLong { max: MAX_NAME_LEN });
        }
        if self.sku.trim().is_empty() {
            return Err(ProductError::MissingField { field: "sku" });
        }
        if self.price.is_negative() {
            return Err(ProductError::InvalidPrice { price: self.price });
        }
        if self.discount.percentage > 100 {
            return Err(ProductError::InvalidDiscount {
                percentage: self.discount.percentage,
            });
        }
        Ok(())
    }

    /// Price of one unit at `now`, after any running discount.
    pub fn effective_price(&self, now: DateTime<Utc>) -> Money {
        resolve_unit_price(self.price, &self.discount, now)
    }

    /// Returns true if the product can be bought in `quantity` right now.
    pub fn can_supply(&self, quantity: u32) -> bool {
        self.is_active && self.stock >= quantity
    }

    fn insufficient(&self, requested: u32) -> ProductError {
        ProductError::InsufficientStock {
            product_id: self.id,
            name: self.name.clone(),
            available: self.stock,
            requested,
        }
    }

    /// Takes `quantity` units out of stock.
    pub fn reserve(&self, quantity: u32) -> Result<Vec<ProductEvent>, ProductError> {
        if quantity == 0 {
            return Err(ProductError::InvalidQuantity { quantity });
        }
        if self.stock < quantity {
            return Err(self.insufficient(quantity));
        }
        Ok(vec![ProductEvent::StockReserved { quantity }])
    }

    /// Puts `quantity` units back into stock.
    pub fn release(&self, quantity: u32) -> Result<Vec<ProductEvent>, ProductError> {
        if quantity == 0 {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::StockReleased { quantity }])
    }
}

impl Aggregate for Product {
    type Event = ProductEvent;
    type Error = ProductError;

    fn collection() -> &'static str {
        "products"
    }

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ProductEvent::StockReserved { quantity } => {
                self.stock = self.stock.saturating_sub(quantity);
            }
            ProductEvent::StockReleased { quantity } => {
                self.stock = self.stock.saturating_add(quantity);
            }
        }
    }
}
