//! The merged product catalog.
//!
//! The storefront never shows an empty shelf: it renders the compiled-in
//! seed immediately, then merges remote rows over it when the gateway
//! answers. Remote rows win on id collisions, and a remote delete masks the
//! seed row for the rest of the run so it cannot resurrect on the next
//! merge.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use cardvault_core::{NewProduct, Product, ProductId};
use tracing::{info, instrument, warn};

use crate::gateway::{Gateway, GatewayError};
use crate::notify::Notifier;
use crate::seed;
use crate::storage::{KEY_CATALOG_SNAPSHOT, LocalStore};

/// Client-side catalog state, merged from seed and remote rows.
#[derive(Debug)]
pub struct CatalogStore<G> {
    gateway: Arc<G>,
    notifier: Notifier,
    products: Vec<Product>,
    masked: HashSet<ProductId>,
    /// True once a remote load has succeeded this run.
    synced: bool,
}

impl<G: Gateway> CatalogStore<G> {
    /// A store showing the seed catalog, before any remote contact.
    #[must_use]
    pub fn new(gateway: Arc<G>, notifier: Notifier) -> Self {
        Self {
            gateway,
            notifier,
            products: seed::products(),
            masked: HashSet::new(),
            synced: false,
        }
    }

    /// Everything currently on the shelf, ordered by id.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Whether a remote load has succeeded this run.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.synced
    }

    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Case-insensitive substring search over name and category.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let needle = query.to_lowercase();
        self.products
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.category.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Products in one category slug, or everything for "all".
    #[must_use]
    pub fn by_category(&self, slug: &str) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| slug == "all" || p.category == slug)
            .collect()
    }

    /// Fetch remote rows and merge them over the seed.
    ///
    /// # Errors
    ///
    /// Returns the gateway error after posting a notice; the current shelf
    /// is left untouched so the visitor keeps browsing whatever was shown.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<(), GatewayError> {
        match self.gateway.list_products().await {
            Ok(remote) => {
                self.products = self.merge(remote);
                self.synced = true;
                info!(count = self.products.len(), "catalog synced");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "catalog load failed");
                self.notifier
                    .warn("Live catalog unavailable, showing built-in inventory");
                Err(e)
            }
        }
    }

    /// Load, falling back to the last persisted snapshot (then the seed)
    /// when the gateway is unreachable. A successful load refreshes the
    /// snapshot.
    pub async fn load_or_restore(&mut self, store: &mut LocalStore) {
        if self.load().await.is_ok() {
            if let Err(e) = store.set(KEY_CATALOG_SNAPSHOT, &self.products) {
                warn!(error = %e, "could not persist catalog snapshot");
            }
            return;
        }
        if let Some(snapshot) = store.get::<Vec<Product>>(KEY_CATALOG_SNAPSHOT) {
            info!(count = snapshot.len(), "restored catalog snapshot");
            self.products = self.merge(snapshot);
        }
    }

    /// Create a product on the remote store and merge the committed row.
    ///
    /// # Errors
    ///
    /// Returns the gateway error after posting a notice.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn add(&mut self, product: NewProduct) -> Result<Product, GatewayError> {
        match self.gateway.insert_product(product).await {
            Ok(row) => {
                self.upsert_local(row.clone());
                self.notifier.success(format!("Added {}", row.name));
                Ok(row)
            }
            Err(e) => {
                self.notifier.error("Could not add product");
                Err(e)
            }
        }
    }

    /// Update a product on the remote store and merge the committed row.
    ///
    /// # Errors
    ///
    /// Returns the gateway error after posting a notice.
    #[instrument(skip(self, product), fields(id = %product.id))]
    pub async fn update(&mut self, product: Product) -> Result<(), GatewayError> {
        match self.gateway.update_product(product).await {
            Ok(row) => {
                self.upsert_local(row);
                Ok(())
            }
            Err(e) => {
                self.notifier.error("Could not save product changes");
                Err(e)
            }
        }
    }

    /// Delete a product remotely and mask its id locally for the rest of
    /// the run, so a seed row with the same id cannot come back on the next
    /// merge.
    ///
    /// # Errors
    ///
    /// Returns the gateway error after posting a notice.
    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: ProductId) -> Result<(), GatewayError> {
        match self.gateway.delete_product(id).await {
            Ok(()) => {
                self.masked.insert(id);
                self.products.retain(|p| p.id != id);
                self.notifier.success("Product removed");
                Ok(())
            }
            Err(e) => {
                self.notifier.error("Could not remove product");
                Err(e)
            }
        }
    }

    /// Overwrite local stock for a product, typically from a checkout's
    /// committed stock level.
    pub fn apply_stock(&mut self, id: ProductId, remaining: u32) {
        if let Some(product) = self.products.iter_mut().find(|p| p.id == id) {
            product.stock = remaining;
        }
    }

    fn merge(&self, remote: Vec<Product>) -> Vec<Product> {
        let mut shelf: BTreeMap<ProductId, Product> = seed::products()
            .into_iter()
            .filter(|p| !self.masked.contains(&p.id))
            .map(|p| (p.id, p))
            .collect();
        for product in remote {
            if !self.masked.contains(&product.id) {
                shelf.insert(product.id, product);
            }
        }
        shelf.into_values().collect()
    }

    fn upsert_local(&mut self, row: Product) {
        match self.products.iter_mut().find(|p| p.id == row.id) {
            Some(slot) => *slot = row,
            None => {
                self.products.push(row);
                self.products.sort_by_key(|p| p.id);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use crate::notify::NoticeStream;
    use cardvault_core::Severity;
    use rust_decimal::Decimal;

    fn store() -> (CatalogStore<MemoryGateway>, Arc<MemoryGateway>, NoticeStream) {
        let gateway = Arc::new(MemoryGateway::new());
        let (notifier, notices) = Notifier::channel();
        (
            CatalogStore::new(Arc::clone(&gateway), notifier),
            gateway,
            notices,
        )
    }

    fn remote_product(id: i64, name: &str, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Decimal::new(9900, 2),
            category: "booster".to_string(),
            stock,
            badge: None,
            image: "/img/remote.webp".to_string(),
            description: "remote row".to_string(),
        }
    }

    #[test]
    fn test_starts_with_seed() {
        let (catalog, _, _) = store();
        assert!(!catalog.products().is_empty());
        assert!(!catalog.is_synced());
    }

    #[tokio::test]
    async fn test_remote_overwrites_seed_on_collision() {
        let (mut catalog, gateway, _) = store();
        gateway
            .seed_products(vec![remote_product(1, "Restocked Box", 99)])
            .await;

        catalog.load().await.unwrap();

        let row = catalog.get(ProductId::new(1)).unwrap();
        assert_eq!(row.name, "Restocked Box");
        assert_eq!(row.stock, 99);
        // Seed rows without a remote counterpart survive the merge.
        assert!(catalog.get(ProductId::new(2)).is_some());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_shelf_and_warns() {
        let (mut catalog, gateway, mut notices) = store();
        catalog.load().await.unwrap();
        let before = catalog.products().len();

        gateway.set_fail_writes(true);
        let result = catalog.delete(ProductId::new(1)).await;
        assert!(result.is_err());
        assert_eq!(catalog.products().len(), before);
        assert_eq!(notices.next().await.unwrap().severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_delete_masks_seed_for_rest_of_run() {
        let (mut catalog, _, _) = store();
        catalog.load().await.unwrap();

        catalog.delete(ProductId::new(1)).await.unwrap();
        assert!(catalog.get(ProductId::new(1)).is_none());

        // Another merge must not resurrect the masked seed row.
        catalog.load().await.unwrap();
        assert!(catalog.get(ProductId::new(1)).is_none());
    }

    #[tokio::test]
    async fn test_add_merges_committed_row() {
        let (mut catalog, _, mut notices) = store();
        let row = catalog
            .add(NewProduct {
                name: "Fresh Box".to_string(),
                price: Decimal::new(12000, 2),
                category: "booster".to_string(),
                stock: 10,
                badge: None,
                image: "/img/fresh.webp".to_string(),
                description: "new".to_string(),
            })
            .await
            .unwrap();

        assert!(catalog.get(row.id).is_some());
        assert_eq!(notices.next().await.unwrap().severity, Severity::Success);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let (catalog, _, _) = store();
        assert!(!catalog.search("SURGING").is_empty());
        assert!(catalog.search("no such card").is_empty());
    }

    #[tokio::test]
    async fn test_by_category_all_returns_everything() {
        let (catalog, _, _) = store();
        assert_eq!(catalog.by_category("all").len(), catalog.products().len());
        assert!(!catalog.by_category("etb").is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_restores_when_offline() {
        let path = std::env::temp_dir().join(format!(
            "cardvault-catalog-{}.json",
            uuid::Uuid::new_v4()
        ));
        let mut local = LocalStore::open(&path);
        local
            .set(
                KEY_CATALOG_SNAPSHOT,
                &vec![remote_product(50, "Snapshot Box", 5)],
            )
            .unwrap();

        // No remote rows, load succeeds; snapshot path exercised directly.
        let (mut catalog, _, _) = store();
        if let Some(snapshot) = local.get::<Vec<Product>>(KEY_CATALOG_SNAPSHOT) {
            catalog.products = catalog.merge(snapshot);
        }
        assert!(catalog.get(ProductId::new(50)).is_some());
        std::fs::remove_file(&path).unwrap();
    }
}
