//! The favorites set.
//!
//! Run-local only: favorites are a browsing aid, not an account feature,
//! so they reset with the session and never touch the gateway.

use std::collections::HashSet;

use cardvault_core::ProductId;

#[derive(Debug, Default)]
pub struct FavoriteSet {
    ids: HashSet<ProductId>,
}

impl FavoriteSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership; returns true when the product is now a favorite.
    pub fn toggle(&mut self, id: ProductId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.ids.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}
