//! Shared helpers for CardVault integration tests.
//!
//! Scenario tests run entire flows (storefront and admin side by side)
//! against a shared [`MemoryGateway`], which mirrors the remote store's
//! observable behavior including change fan-out and the floored stock
//! decrement.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use cardvault_client::gateway::{Gateway, MemoryGateway};
use cardvault_client::notify::{Notifier, NoticeStream};
use cardvault_core::{NewProduct, Product};
use rust_decimal::Decimal;

/// A fresh shared gateway plus a notifier pair.
#[must_use]
pub fn test_env() -> (Arc<MemoryGateway>, Notifier, NoticeStream) {
    let gateway = Arc::new(MemoryGateway::new());
    let (notifier, notices) = Notifier::channel();
    (gateway, notifier, notices)
}

/// Insert a product through the gateway and return the committed row.
///
/// # Panics
///
/// Panics if the insert fails; test fixtures never simulate outages here.
#[allow(clippy::unwrap_used)]
pub async fn stock_product(
    gateway: &MemoryGateway,
    name: &str,
    price_cents: i64,
    stock: u32,
) -> Product {
    gateway
        .insert_product(NewProduct {
            name: name.to_string(),
            price: Decimal::new(price_cents, 2),
            category: "booster".to_string(),
            stock,
            badge: None,
            image: "/img/test.webp".to_string(),
            description: "fixture".to_string(),
        })
        .await
        .unwrap()
}
