//! In-process gateway double.
//!
//! Backs tests and offline demos with the same observable behavior as the
//! real remote store: id assignment, upsert semantics, the floored stock
//! decrement, and live change fan-out to open subscriptions.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::{RwLock, broadcast, mpsc};

use cardvault_core::{
    Broadcast, BroadcastId, ChangeEvent, ChatMessage, MessageId, NewBroadcast, NewMessage,
    NewProduct, Product, ProductId, SessionId, StockLevel, Visitor, VisitorUpsert,
};

use super::{Gateway, GatewayError, Subscription};

const FANOUT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct Tables {
    products: Vec<Product>,
    next_product_id: i64,
    visitors: HashMap<SessionId, Visitor>,
    messages: Vec<ChatMessage>,
    next_message_id: i64,
    next_broadcast_id: i64,
}

/// An in-memory stand-in for the remote store.
///
/// Cheap to clone; clones share the same tables, so one handle can seed
/// state while another observes it through the [`Gateway`] surface.
#[derive(Debug, Clone)]
pub struct MemoryGateway {
    tables: Arc<RwLock<Tables>>,
    fail_writes: Arc<AtomicBool>,
    message_feed: broadcast::Sender<ChangeEvent<ChatMessage>>,
    visitor_feed: broadcast::Sender<ChangeEvent<Visitor>>,
    broadcast_feed: broadcast::Sender<ChangeEvent<Broadcast>>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables {
                next_product_id: 1,
                next_message_id: 1,
                next_broadcast_id: 1,
                ..Tables::default()
            })),
            fail_writes: Arc::new(AtomicBool::new(false)),
            message_feed: broadcast::channel(FANOUT_CAPACITY).0,
            visitor_feed: broadcast::channel(FANOUT_CAPACITY).0,
            broadcast_feed: broadcast::channel(FANOUT_CAPACITY).0,
        }
    }

    /// Simulate a connectivity outage: while set, every write fails with
    /// [`GatewayError::Unavailable`]. Reads keep working.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed products directly, preserving their ids.
    pub async fn seed_products(&self, products: Vec<Product>) {
        let mut tables = self.tables.write().await;
        for product in products {
            tables.next_product_id = tables.next_product_id.max(product.id.as_i64() + 1);
            tables.products.push(product);
        }
        tables.products.sort_by_key(|p| p.id);
    }

    fn check_writable(&self) -> Result<(), GatewayError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable(
                "simulated write outage".to_string(),
            ));
        }
        Ok(())
    }

    fn pump<T: Clone + Send + 'static>(
        mut source: broadcast::Receiver<ChangeEvent<T>>,
        filter: impl Fn(&ChangeEvent<T>) -> bool + Send + 'static,
    ) -> Subscription<T> {
        let (tx, rx) = mpsc::channel(FANOUT_CAPACITY);
        let pump = tokio::spawn(async move {
            // Lagged receivers skip ahead; feeds tolerate gaps.
            loop {
                match source.recv().await {
                    Ok(event) => {
                        if filter(&event) && tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Subscription::new(rx, Some(pump))
    }
}

impl Gateway for MemoryGateway {
    async fn list_products(&self) -> Result<Vec<Product>, GatewayError> {
        Ok(self.tables.read().await.products.clone())
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, GatewayError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let id = ProductId::new(tables.next_product_id);
        tables.next_product_id += 1;
        let row = Product {
            id,
            name: product.name,
            price: product.price,
            category: product.category,
            stock: product.stock,
            badge: product.badge,
            image: product.image,
            description: product.description,
        };
        tables.products.push(row.clone());
        Ok(row)
    }

    async fn update_product(&self, product: Product) -> Result<Product, GatewayError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let slot = tables
            .products
            .iter_mut()
            .find(|p| p.id == product.id)
            .ok_or(GatewayError::NotFound { entity: "product" })?;
        *slot = product.clone();
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), GatewayError> {
        self.check_writable()?;
        self.tables.write().await.products.retain(|p| p.id != id);
        Ok(())
    }

    async fn decrement_stock(
        &self,
        id: ProductId,
        quantity: u32,
    ) -> Result<StockLevel, GatewayError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(GatewayError::NotFound { entity: "product" })?;
        product.stock = product.stock.saturating_sub(quantity);
        Ok(StockLevel {
            product_id: id,
            remaining: product.stock,
        })
    }

    async fn upsert_visitor(&self, visitor: VisitorUpsert) -> Result<(), GatewayError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let event = match tables.visitors.get_mut(&visitor.session_id) {
            Some(existing) => {
                existing.last_active = visitor.last_active;
                if visitor.network_address.is_some() {
                    existing.network_address = visitor.network_address;
                }
                ChangeEvent::Update(existing.clone())
            }
            None => {
                let row = Visitor {
                    session_id: visitor.session_id.clone(),
                    nickname: None,
                    last_active: visitor.last_active,
                    location_city: None,
                    location_country: None,
                    latitude: None,
                    longitude: None,
                    network_address: visitor.network_address,
                };
                tables.visitors.insert(visitor.session_id, row.clone());
                ChangeEvent::Insert(row)
            }
        };
        drop(tables);
        let _ = self.visitor_feed.send(event);
        Ok(())
    }

    async fn list_visitors(&self) -> Result<Vec<Visitor>, GatewayError> {
        let tables = self.tables.read().await;
        let mut visitors: Vec<Visitor> = tables.visitors.values().cloned().collect();
        visitors.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        Ok(visitors)
    }

    async fn update_nickname(
        &self,
        session_id: &SessionId,
        nickname: Option<String>,
    ) -> Result<(), GatewayError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let visitor = tables
            .visitors
            .get_mut(session_id)
            .ok_or(GatewayError::NotFound { entity: "visitor" })?;
        visitor.nickname = nickname;
        let event = ChangeEvent::Update(visitor.clone());
        drop(tables);
        let _ = self.visitor_feed.send(event);
        Ok(())
    }

    async fn subscribe_visitors(&self) -> Result<Subscription<Visitor>, GatewayError> {
        Ok(Self::pump(self.visitor_feed.subscribe(), |_| true))
    }

    async fn list_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ChatMessage>, GatewayError> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| &m.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn list_unread_messages(&self) -> Result<Vec<ChatMessage>, GatewayError> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.unread_from_visitor())
            .cloned()
            .collect())
    }

    async fn list_chat_sessions(&self) -> Result<Vec<SessionId>, GatewayError> {
        let tables = self.tables.read().await;
        let mut seen = Vec::new();
        // Latest message first, one entry per session.
        for message in tables.messages.iter().rev() {
            if !seen.contains(&message.session_id) {
                seen.push(message.session_id.clone());
            }
        }
        Ok(seen)
    }

    async fn insert_message(&self, message: NewMessage) -> Result<ChatMessage, GatewayError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let id = MessageId::new(tables.next_message_id);
        tables.next_message_id += 1;
        let row = ChatMessage {
            id,
            session_id: message.session_id,
            sender: message.sender,
            text: message.text,
            created_at: Utc::now(),
            delivered: true,
            read: false,
            client_ref: message.client_ref,
        };
        tables.messages.push(row.clone());
        drop(tables);
        let _ = self.message_feed.send(ChangeEvent::Insert(row.clone()));
        Ok(row)
    }

    async fn mark_delivered_read(&self, id: MessageId) -> Result<(), GatewayError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let message = tables
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(GatewayError::NotFound { entity: "message" })?;
        message.delivered = true;
        message.read = true;
        let event = ChangeEvent::Update(message.clone());
        drop(tables);
        let _ = self.message_feed.send(event);
        Ok(())
    }

    async fn mark_session_read(&self, session_id: &SessionId) -> Result<u32, GatewayError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let mut flipped = 0;
        let mut events = Vec::new();
        for message in &mut tables.messages {
            if &message.session_id == session_id && message.unread_from_visitor() {
                message.read = true;
                message.delivered = true;
                flipped += 1;
                events.push(ChangeEvent::Update(message.clone()));
            }
        }
        drop(tables);
        for event in events {
            let _ = self.message_feed.send(event);
        }
        Ok(flipped)
    }

    async fn subscribe_messages(
        &self,
        session_id: Option<SessionId>,
    ) -> Result<Subscription<ChatMessage>, GatewayError> {
        Ok(Self::pump(self.message_feed.subscribe(), move |event| {
            session_id
                .as_ref()
                .is_none_or(|sid| &event.row().session_id == sid)
        }))
    }

    async fn publish_broadcast(&self, broadcast: NewBroadcast) -> Result<Broadcast, GatewayError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let id = BroadcastId::new(tables.next_broadcast_id);
        tables.next_broadcast_id += 1;
        drop(tables);
        let row = Broadcast {
            id,
            message: broadcast.message,
            severity: broadcast.severity,
            created_at: Utc::now(),
        };
        let _ = self.broadcast_feed.send(ChangeEvent::Insert(row.clone()));
        Ok(row)
    }

    async fn subscribe_broadcasts(&self) -> Result<Subscription<Broadcast>, GatewayError> {
        Ok(Self::pump(self.broadcast_feed.subscribe(), |_| true))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use cardvault_core::Severity;
    use rust_decimal::Decimal;

    fn new_product(name: &str, stock: u32) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price: Decimal::new(4999, 2),
            category: "Singles".to_string(),
            stock,
            badge: None,
            image: "/img/test.webp".to_string(),
            description: "test product".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let gateway = MemoryGateway::new();
        let a = gateway.insert_product(new_product("A", 1)).await.unwrap();
        let b = gateway.insert_product(new_product("B", 1)).await.unwrap();
        assert_eq!(a.id.as_i64() + 1, b.id.as_i64());
    }

    #[tokio::test]
    async fn test_decrement_floors_at_zero() {
        let gateway = MemoryGateway::new();
        let product = gateway.insert_product(new_product("A", 3)).await.unwrap();

        let level = gateway.decrement_stock(product.id, 5).await.unwrap();
        assert_eq!(level.remaining, 0);
        assert!(level.sold_out());
    }

    #[tokio::test]
    async fn test_upsert_preserves_nickname() {
        let gateway = MemoryGateway::new();
        let sid = SessionId::from("visitor-1");
        gateway
            .upsert_visitor(VisitorUpsert::heartbeat(sid.clone()))
            .await
            .unwrap();
        gateway
            .update_nickname(&sid, Some("Whale".to_string()))
            .await
            .unwrap();

        gateway
            .upsert_visitor(VisitorUpsert::heartbeat(sid.clone()))
            .await
            .unwrap();

        let visitors = gateway.list_visitors().await.unwrap();
        assert_eq!(visitors[0].nickname.as_deref(), Some("Whale"));
    }

    #[tokio::test]
    async fn test_message_feed_session_filter() {
        let gateway = MemoryGateway::new();
        let mine = SessionId::from("mine");
        let mut sub = gateway
            .subscribe_messages(Some(mine.clone()))
            .await
            .unwrap();

        gateway
            .insert_message(NewMessage::from_visitor(SessionId::from("other"), "not me"))
            .await
            .unwrap();
        gateway
            .insert_message(NewMessage::from_visitor(mine.clone(), "for me"))
            .await
            .unwrap();

        let event = sub.next().await.unwrap();
        assert_eq!(event.row().text, "for me");
    }

    #[tokio::test]
    async fn test_mark_session_read_counts_flips() {
        let gateway = MemoryGateway::new();
        let sid = SessionId::from("s1");
        gateway
            .insert_message(NewMessage::from_visitor(sid.clone(), "one"))
            .await
            .unwrap();
        gateway
            .insert_message(NewMessage::from_visitor(sid.clone(), "two"))
            .await
            .unwrap();
        gateway
            .insert_message(NewMessage::from_admin(sid.clone(), "reply"))
            .await
            .unwrap();

        assert_eq!(gateway.mark_session_read(&sid).await.unwrap(), 2);
        assert_eq!(gateway.mark_session_read(&sid).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fail_writes_blocks_writes_not_reads() {
        let gateway = MemoryGateway::new();
        gateway.insert_product(new_product("A", 1)).await.unwrap();

        gateway.set_fail_writes(true);
        let err = gateway
            .insert_product(new_product("B", 1))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(gateway.list_products().await.unwrap().len(), 1);

        gateway.set_fail_writes(false);
        gateway.insert_product(new_product("B", 1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_broadcast_fanout_reaches_all_subscribers() {
        let gateway = MemoryGateway::new();
        let mut a = gateway.subscribe_broadcasts().await.unwrap();
        let mut b = gateway.subscribe_broadcasts().await.unwrap();

        gateway
            .publish_broadcast(NewBroadcast::new("flash sale", Severity::Success))
            .await
            .unwrap();

        assert_eq!(a.next().await.unwrap().row().message, "flash sale");
        assert_eq!(b.next().await.unwrap().row().message, "flash sale");
    }
}
