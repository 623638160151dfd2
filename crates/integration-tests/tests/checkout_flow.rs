//! Checkout flows: cart totals policy plus the conditional stock commit
//! under contention.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use cardvault_client::cart::{CartEngine, CartPolicy};
use cardvault_client::gateway::Gateway;
use cardvault_client::notify::Notifier;
use cardvault_integration_tests::{stock_product, test_env};
use rust_decimal::Decimal;

#[tokio::test]
async fn test_full_checkout_updates_remote_stock() {
    let (gateway, notifier, _notices) = test_env();
    let box_row = stock_product(&gateway, "Surging Sparks Booster Box", 22000, 12).await;

    let mut cart = CartEngine::new(Arc::clone(&gateway), notifier, CartPolicy::default());
    cart.add(&box_row, 2);

    let totals = cart.totals();
    // $440 subtotal clears the free-shipping threshold.
    assert_eq!(totals.subtotal, Decimal::new(440, 0));
    assert_eq!(totals.shipping, Decimal::ZERO);

    let summary = cart.checkout_commit().await;
    assert!(summary.all_committed());
    assert!(cart.is_empty());

    let remote = gateway.list_products().await.unwrap();
    assert_eq!(remote[0].stock, 10);
}

#[tokio::test]
async fn test_competing_checkouts_floor_stock_at_zero() {
    let (gateway, notifier_a, _notices_a) = test_env();
    let (notifier_b, _notices_b) = Notifier::channel();
    let scarce = stock_product(&gateway, "Rebel Clash Booster Box", 35000, 3).await;

    let mut first = CartEngine::new(Arc::clone(&gateway), notifier_a, CartPolicy::default());
    let mut second = CartEngine::new(Arc::clone(&gateway), notifier_b, CartPolicy::default());
    first.add(&scarce, 2);
    second.add(&scarce, 2);

    let first_summary = first.checkout_commit().await;
    let second_summary = second.checkout_commit().await;

    // Both commits succeed; the second is floored rather than going negative.
    assert_eq!(first_summary.committed, vec![(scarce.id, 1)]);
    assert_eq!(second_summary.committed, vec![(scarce.id, 0)]);

    let remote = gateway.list_products().await.unwrap();
    assert_eq!(remote[0].stock, 0);
    assert!(!remote[0].in_stock());
}

#[tokio::test]
async fn test_outage_during_checkout_clears_cart_and_reports_failures() {
    let (gateway, notifier, mut notices) = test_env();
    let box_row = stock_product(&gateway, "Twilight Masquerade Booster Box", 23000, 14).await;

    let mut cart = CartEngine::new(Arc::clone(&gateway), notifier, CartPolicy::default());
    cart.add(&box_row, 1);
    let _ = notices.drain();

    // Failures are reported but the pass still finishes and clears the
    // cart; the buyer re-adds what did not commit.
    gateway.set_fail_writes(true);
    let summary = cart.checkout_commit().await;
    assert!(!summary.all_committed());
    assert_eq!(summary.failed, vec![box_row.id]);
    assert!(cart.is_empty());
    assert!(!notices.drain().is_empty());

    // Stock untouched, a fresh add commits once the store is back.
    gateway.set_fail_writes(false);
    assert_eq!(gateway.list_products().await.unwrap()[0].stock, 14);

    cart.add(&box_row, 1);
    let retry = cart.checkout_commit().await;
    assert!(retry.all_committed());
    assert_eq!(gateway.list_products().await.unwrap()[0].stock, 13);
}

#[tokio::test]
async fn test_bulk_order_discount_and_shipping_interplay() {
    let (gateway, notifier, _notices) = test_env();
    let single = stock_product(&gateway, "Common Single", 800, 100).await;

    let mut cart = CartEngine::new(Arc::clone(&gateway), notifier, CartPolicy::default());
    cart.add(&single, 20);

    // 20 x $8 = $160, 10% off leaves $144: discounted but below the
    // free-shipping threshold, so the fee still applies.
    let totals = cart.totals();
    assert_eq!(totals.discount, Decimal::new(16, 0));
    assert_eq!(totals.shipping, Decimal::new(999, 2));
    assert_eq!(totals.total, Decimal::new(15399, 2));
}
