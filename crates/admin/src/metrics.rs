//! Dashboard headline numbers.

use cardvault_core::{Product, SessionId, Visitor};
use rust_decimal::Decimal;

/// The admin dashboard's headline metrics, computed from already-loaded
/// state; nothing here touches the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardMetrics {
    /// Retail value of everything on the shelf.
    pub inventory_value: Decimal,
    pub product_count: usize,
    pub visitor_count: usize,
    pub open_chat_count: usize,
}

impl DashboardMetrics {
    #[must_use]
    pub fn compute(
        products: &[Product],
        visitors: &[Visitor],
        chat_sessions: &[SessionId],
    ) -> Self {
        let inventory_value = products
            .iter()
            .map(|p| p.price * Decimal::from(p.stock))
            .sum();
        Self {
            inventory_value,
            product_count: products.len(),
            visitor_count: visitors.len(),
            open_chat_count: chat_sessions.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardvault_core::ProductId;

    fn product(price_cents: i64, stock: u32) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Box".to_string(),
            price: Decimal::new(price_cents, 2),
            category: "booster".to_string(),
            stock,
            badge: None,
            image: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn test_inventory_value_sums_price_times_stock() {
        let products = vec![product(22000, 2), product(3500, 10)];
        let metrics = DashboardMetrics::compute(&products, &[], &[]);
        // 2 x $220 + 10 x $35 = $790
        assert_eq!(metrics.inventory_value, Decimal::new(790, 0));
        assert_eq!(metrics.product_count, 2);
    }

    #[test]
    fn test_empty_state_is_all_zero() {
        let metrics = DashboardMetrics::compute(&[], &[], &[]);
        assert_eq!(metrics.inventory_value, Decimal::ZERO);
        assert_eq!(metrics.visitor_count, 0);
        assert_eq!(metrics.open_chat_count, 0);
    }
}
