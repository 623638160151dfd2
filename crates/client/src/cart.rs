//! The cart engine.
//!
//! Lines hold a snapshot of the product at add time, so a cart renders
//! stably even while the catalog re-syncs underneath it; call
//! [`CartEngine::refresh_snapshots`] after a catalog merge to reconcile.
//! Totals apply a bulk discount before the shipping check, so a big enough
//! order earns free shipping on its discounted price.

use std::sync::Arc;

use cardvault_core::{Product, ProductId, round_cents};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::gateway::Gateway;
use crate::notify::Notifier;

/// Pricing policy applied by [`CartEngine::totals`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartPolicy {
    /// Fraction taken off the subtotal once the item count qualifies.
    pub discount_rate: Decimal,
    /// Total item count at which the discount starts applying.
    pub discount_min_items: u32,
    /// Discounted subtotal at or above which shipping is free.
    pub free_shipping_threshold: Decimal,
    /// Flat shipping fee below the threshold.
    pub shipping_fee: Decimal,
}

impl Default for CartPolicy {
    fn default() -> Self {
        Self {
            discount_rate: Decimal::new(10, 2),
            discount_min_items: 20,
            free_shipping_threshold: Decimal::new(150, 0),
            shipping_fee: Decimal::new(999, 2),
        }
    }
}

/// One cart line: a product snapshot and a quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Computed cart totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartTotals {
    pub item_count: u32,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Outcome of a checkout commit.
#[derive(Debug, Clone, Default)]
pub struct CheckoutSummary {
    /// Lines whose stock decrement committed, with the remaining stock.
    pub committed: Vec<(ProductId, u32)>,
    /// Lines whose decrement failed and were not retried.
    pub failed: Vec<ProductId>,
}

impl CheckoutSummary {
    #[must_use]
    pub fn all_committed(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Client-side cart state and the checkout commit.
#[derive(Debug)]
pub struct CartEngine<G> {
    gateway: Arc<G>,
    notifier: Notifier,
    policy: CartPolicy,
    lines: Vec<CartLine>,
}

impl<G: Gateway> CartEngine<G> {
    #[must_use]
    pub const fn new(gateway: Arc<G>, notifier: Notifier, policy: CartPolicy) -> Self {
        Self {
            gateway,
            notifier,
            policy,
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add `quantity` units, merging with an existing line for the same
    /// product. An add that would push the line past the snapshot's stock
    /// is rejected whole and the cart is left unchanged.
    pub fn add(&mut self, product: &Product, quantity: u32) {
        if !product.in_stock() {
            self.notifier.warn(format!("{} is sold out", product.name));
            return;
        }
        let quantity = quantity.max(1);
        let existing = self
            .lines
            .iter()
            .find(|l| l.product.id == product.id)
            .map_or(0, |l| l.quantity);
        if existing.saturating_add(quantity) > product.stock {
            self.notifier
                .warn(format!("Only {} of {} available", product.stock, product.name));
            return;
        }
        match self.lines.iter_mut().find(|l| l.product.id == product.id) {
            Some(line) => {
                line.quantity += quantity;
                line.product = product.clone();
            }
            None => {
                self.lines.push(CartLine {
                    product: product.clone(),
                    quantity,
                });
            }
        }
        self.notifier.success("Added to cart");
    }

    /// Adjust a line's quantity by `delta`, floored at one. A change that
    /// would exceed the snapshot's stock is rejected and the old quantity
    /// kept. Use [`CartEngine::remove`] to drop a line entirely.
    pub fn change_quantity(&mut self, id: ProductId, delta: i64) {
        let Some(line) = self.lines.iter_mut().find(|l| l.product.id == id) else {
            return;
        };
        let wanted = i64::from(line.quantity).saturating_add(delta).max(1);
        if wanted > i64::from(line.product.stock) {
            self.notifier.warn(format!(
                "Only {} of {} available",
                line.product.stock, line.product.name
            ));
            return;
        }
        line.quantity = u32::try_from(wanted).unwrap_or(1);
    }

    pub fn remove(&mut self, id: ProductId) {
        self.lines.retain(|l| l.product.id != id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Compute totals under the configured policy.
    ///
    /// An empty cart is all zeros; shipping is never charged on nothing.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        let item_count: u32 = self.lines.iter().map(|l| l.quantity).sum();
        let subtotal: Decimal = self.lines.iter().map(CartLine::line_total).sum();

        let discount = if item_count >= self.policy.discount_min_items {
            round_cents(subtotal * self.policy.discount_rate)
        } else {
            Decimal::ZERO
        };
        let discounted = subtotal - discount;

        let shipping = if self.lines.is_empty() || discounted >= self.policy.free_shipping_threshold
        {
            Decimal::ZERO
        } else {
            self.policy.shipping_fee
        };

        CartTotals {
            item_count,
            subtotal,
            discount,
            shipping,
            total: discounted + shipping,
        }
    }

    /// Re-point line snapshots at the current catalog rows: refreshed
    /// prices, quantities clamped to current stock, vanished or sold-out
    /// products dropped.
    pub fn refresh_snapshots(&mut self, catalog: &[Product]) {
        let mut dropped = Vec::new();
        self.lines.retain_mut(|line| {
            match catalog.iter().find(|p| p.id == line.product.id) {
                Some(current) if current.in_stock() => {
                    line.product = current.clone();
                    line.quantity = line.quantity.min(current.stock);
                    true
                }
                _ => {
                    dropped.push(line.product.name.clone());
                    false
                }
            }
        });
        for name in dropped {
            self.notifier.warn(format!("{name} is no longer available"));
        }
    }

    /// Commit the cart: one atomic stock decrement per line.
    ///
    /// Decrements are independent, so a partial failure leaves earlier
    /// lines committed; failures are reported, not rolled back. The cart
    /// is cleared after the full pass regardless of per-line outcomes, so
    /// a failed line is gone from the cart and must be re-added.
    #[instrument(skip(self))]
    pub async fn checkout_commit(&mut self) -> CheckoutSummary {
        let mut summary = CheckoutSummary::default();
        for line in &self.lines {
            match self
                .gateway
                .decrement_stock(line.product.id, line.quantity)
                .await
            {
                Ok(level) => {
                    if level.sold_out() {
                        self.notifier
                            .info(format!("{} is now sold out", line.product.name));
                    }
                    summary.committed.push((level.product_id, level.remaining));
                }
                Err(e) => {
                    warn!(product = %line.product.id, error = %e, "stock decrement failed");
                    summary.failed.push(line.product.id);
                }
            }
        }
        if summary.all_committed() {
            info!(lines = summary.committed.len(), "checkout committed");
            self.notifier.success("Order placed");
        } else {
            self.notifier
                .error("Some items could not be reserved, please re-add them");
        }
        self.lines.clear();
        summary
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use crate::notify::NoticeStream;
    use cardvault_core::{NewProduct, Severity};

    fn engine() -> (CartEngine<MemoryGateway>, Arc<MemoryGateway>, NoticeStream) {
        let gateway = Arc::new(MemoryGateway::new());
        let (notifier, notices) = Notifier::channel();
        (
            CartEngine::new(Arc::clone(&gateway), notifier, CartPolicy::default()),
            gateway,
            notices,
        )
    }

    fn product(id: i64, price_cents: i64, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Box {id}"),
            price: Decimal::new(price_cents, 2),
            category: "booster".to_string(),
            stock,
            badge: None,
            image: "/img/box.webp".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn test_add_merges_lines() {
        let (mut cart, _, _) = engine();
        let box1 = product(1, 2000, 10);
        cart.add(&box1, 2);
        cart.add(&box1, 3);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
    }

    #[test]
    fn test_add_over_stock_rejected_cart_unchanged() {
        let (mut cart, _, mut notices) = engine();
        cart.add(&product(1, 2000, 3), 10);
        assert!(cart.is_empty());
        assert_eq!(notices.drain()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_merge_add_over_stock_keeps_old_quantity() {
        let (mut cart, _, _) = engine();
        let box1 = product(1, 2000, 3);
        cart.add(&box1, 2);
        cart.add(&box1, 5);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_add_sold_out_rejected() {
        let (mut cart, _, _) = engine();
        cart.add(&product(1, 2000, 0), 1);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_change_quantity_floors_at_one() {
        let (mut cart, _, _) = engine();
        cart.add(&product(1, 2000, 10), 2);
        cart.change_quantity(ProductId::new(1), -5);
        assert_eq!(cart.lines()[0].quantity, 1);
    }

    #[test]
    fn test_change_quantity_over_stock_keeps_old_quantity() {
        let (mut cart, _, mut notices) = engine();
        cart.add(&product(1, 2000, 4), 2);
        let _ = notices.drain();

        cart.change_quantity(ProductId::new(1), 10);
        assert_eq!(cart.lines()[0].quantity, 2);
        assert_eq!(notices.drain()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_empty_cart_totals_are_zero() {
        let (cart, _, _) = engine();
        let totals = cart.totals();
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_small_cart_pays_shipping_no_discount() {
        let (mut cart, _, _) = engine();
        cart.add(&product(1, 2000, 10), 2);

        let totals = cart.totals();
        assert_eq!(totals.subtotal, Decimal::new(4000, 2));
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.shipping, Decimal::new(999, 2));
        assert_eq!(totals.total, Decimal::new(4999, 2));
    }

    #[test]
    fn test_shipping_waived_at_threshold() {
        let (mut cart, _, _) = engine();
        // Exactly $150 after no discount.
        cart.add(&product(1, 7500, 10), 2);

        let totals = cart.totals();
        assert_eq!(totals.subtotal, Decimal::new(150, 0));
        assert_eq!(totals.shipping, Decimal::ZERO);
    }

    #[test]
    fn test_bulk_discount_applies_before_shipping_check() {
        let (mut cart, _, _) = engine();
        // 20 items at $8.00: subtotal $160, 10% off leaves $144, under the
        // free-shipping threshold, so shipping is charged.
        cart.add(&product(1, 800, 50), 20);

        let totals = cart.totals();
        assert_eq!(totals.item_count, 20);
        assert_eq!(totals.subtotal, Decimal::new(160, 0));
        assert_eq!(totals.discount, Decimal::new(16, 0));
        assert_eq!(totals.shipping, Decimal::new(999, 2));
        assert_eq!(totals.total, Decimal::new(15399, 2));
    }

    #[test]
    fn test_bulk_discount_can_earn_free_shipping() {
        let (mut cart, _, _) = engine();
        // 20 items at $10.00: subtotal $200, 10% off leaves $180.
        cart.add(&product(1, 1000, 50), 20);

        let totals = cart.totals();
        assert_eq!(totals.discount, Decimal::new(20, 0));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(180, 0));
    }

    #[test]
    fn test_discounted_bulk_order_totals_exactly() {
        let (mut cart, _, _) = engine();
        // 21 items at $10.00: subtotal $210, 10% off leaves $189, over the
        // free-shipping threshold.
        cart.add(&product(1, 1000, 50), 21);

        let totals = cart.totals();
        assert_eq!(totals.subtotal, Decimal::new(210, 0));
        assert_eq!(totals.discount, Decimal::new(21, 0));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(18900, 2));
    }

    #[test]
    fn test_remove_absent_line_is_noop() {
        let (mut cart, _, _) = engine();
        cart.add(&product(1, 2000, 10), 1);

        cart.remove(ProductId::new(99));
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_refresh_snapshots_drops_vanished_and_clamps() {
        let (mut cart, _, _) = engine();
        cart.add(&product(1, 2000, 10), 8);
        cart.add(&product(2, 3000, 5), 2);

        // Product 1 restocked lower, product 2 gone.
        cart.refresh_snapshots(&[product(1, 2000, 3)]);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_checkout_commits_and_clears() {
        let (mut cart, gateway, _) = engine();
        let row = gateway
            .insert_product(NewProduct {
                name: "Box".to_string(),
                price: Decimal::new(2000, 2),
                category: "booster".to_string(),
                stock: 10,
                badge: None,
                image: String::new(),
                description: String::new(),
            })
            .await
            .unwrap();
        cart.add(&row, 4);

        let summary = cart.checkout_commit().await;
        assert!(summary.all_committed());
        assert_eq!(summary.committed, vec![(row.id, 6)]);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_checkout_failure_still_clears_cart() {
        let (mut cart, gateway, mut notices) = engine();
        let row = gateway
            .insert_product(NewProduct {
                name: "Box".to_string(),
                price: Decimal::new(2000, 2),
                category: "booster".to_string(),
                stock: 10,
                badge: None,
                image: String::new(),
                description: String::new(),
            })
            .await
            .unwrap();
        cart.add(&row, 1);
        // Drain the add notice before the checkout runs.
        let _ = notices.drain();

        gateway.set_fail_writes(true);
        let summary = cart.checkout_commit().await;
        assert!(!summary.all_committed());
        assert_eq!(summary.failed, vec![row.id]);
        assert!(cart.is_empty());
        assert_eq!(notices.drain()[0].severity, Severity::Error);
    }
}
