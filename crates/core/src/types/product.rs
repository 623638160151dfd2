//! Catalog product rows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A purchasable catalog item.
///
/// Mirrors the remote `products` table: rows keyed by integer identifier,
/// listed in identifier order. Created by admin writes or seed data; mutated
/// by admin edits or by the stock decrement on checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price in dollars; never negative.
    pub price: Decimal,
    /// Enum-like category slug (e.g., "booster", "etb").
    pub category: String,
    /// Units available; never negative. The gateway floors decrements at zero.
    pub stock: u32,
    /// Optional promotional badge ("HOT", "RARE", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    pub image: String,
    pub description: String,
}

impl Product {
    /// True when the item can currently be added to a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Insert payload for a new product (the remote store assigns the id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    pub image: String,
    pub description: String,
}

/// Result of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    /// Units remaining after the decrement (floored at zero server-side).
    pub remaining: u32,
}

impl StockLevel {
    /// True when the decrement exhausted the product.
    #[must_use]
    pub const fn sold_out(&self) -> bool {
        self.remaining == 0
    }
}
