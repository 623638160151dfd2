//! Remote store access.
//!
//! Everything that crosses the wire goes through the [`Gateway`] trait.
//! [`RestGateway`] talks to the real remote store; [`MemoryGateway`] is an
//! in-process double for tests and offline demos. Stores are generic over
//! the trait so the two are interchangeable.

mod memory;
mod rest;

pub use memory::MemoryGateway;
pub use rest::RestGateway;

use cardvault_core::{
    Broadcast, ChangeEvent, ChatMessage, MessageId, NewBroadcast, NewMessage, NewProduct, Product,
    ProductId, SessionId, StockLevel, Visitor, VisitorUpsert,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors from remote store operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote store error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse remote response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("remote store unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// True when the failure is transient and worth a quiet retry rather
    /// than a user-facing error.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Unavailable(_))
    }
}

/// A live change feed for one entity type.
///
/// Holds the receiving half of a bounded channel plus the pump task feeding
/// it. Dropping the subscription aborts the pump, so a feed never outlives
/// the store that opened it.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::Receiver<ChangeEvent<T>>,
    pump: Option<JoinHandle<()>>,
}

impl<T> Subscription<T> {
    /// Wrap a receiver whose sender lives inside `pump`.
    #[must_use]
    pub const fn new(rx: mpsc::Receiver<ChangeEvent<T>>, pump: Option<JoinHandle<()>>) -> Self {
        Self { rx, pump }
    }

    /// Wait for the next event. `None` once the feed has closed.
    pub async fn next(&mut self) -> Option<ChangeEvent<T>> {
        self.rx.recv().await
    }

    /// Take an already-queued event without waiting.
    pub fn try_next(&mut self) -> Option<ChangeEvent<T>> {
        self.rx.try_recv().ok()
    }

    /// Stop the feed. Queued events remain readable until drained.
    pub fn close(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.rx.close();
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// Remote store operations used by the storefront and the admin panel.
#[allow(async_fn_in_trait)]
pub trait Gateway {
    // --- products ---

    /// Fetch all products, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails.
    async fn list_products(&self) -> Result<Vec<Product>, GatewayError>;

    /// Insert a product; the store assigns the id.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, GatewayError>;

    /// Replace a product row by id.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails or the row is missing.
    async fn update_product(&self, product: Product) -> Result<Product, GatewayError>;

    /// Delete a product row.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails.
    async fn delete_product(&self, id: ProductId) -> Result<(), GatewayError>;

    /// Atomically decrement stock by `quantity`, flooring at zero.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails or the row is missing.
    async fn decrement_stock(
        &self,
        id: ProductId,
        quantity: u32,
    ) -> Result<StockLevel, GatewayError>;

    // --- visitors ---

    /// Insert-or-update a visitor row keyed by session id. Absent fields in
    /// the payload leave existing columns untouched.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails.
    async fn upsert_visitor(&self, visitor: VisitorUpsert) -> Result<(), GatewayError>;

    /// Fetch all visitors, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails.
    async fn list_visitors(&self) -> Result<Vec<Visitor>, GatewayError>;

    /// Set or clear a visitor's operator-assigned nickname.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails or the row is missing.
    async fn update_nickname(
        &self,
        session_id: &SessionId,
        nickname: Option<String>,
    ) -> Result<(), GatewayError>;

    /// Open a change feed over visitor rows.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the feed cannot be opened.
    async fn subscribe_visitors(&self) -> Result<Subscription<Visitor>, GatewayError>;

    // --- messages ---

    /// Fetch one session's transcript in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails.
    async fn list_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ChatMessage>, GatewayError>;

    /// Fetch every unread visitor message across all sessions.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails.
    async fn list_unread_messages(&self) -> Result<Vec<ChatMessage>, GatewayError>;

    /// Distinct session ids that have at least one message, most recent
    /// activity first.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails.
    async fn list_chat_sessions(&self) -> Result<Vec<SessionId>, GatewayError>;

    /// Insert a message and return the committed row.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails.
    async fn insert_message(&self, message: NewMessage) -> Result<ChatMessage, GatewayError>;

    /// Flip one message's delivered and read flags on.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails.
    async fn mark_delivered_read(&self, id: MessageId) -> Result<(), GatewayError>;

    /// Mark every unread visitor message in a session read. Returns how many
    /// rows actually flipped.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails.
    async fn mark_session_read(&self, session_id: &SessionId) -> Result<u32, GatewayError>;

    /// Open a message change feed, optionally filtered to one session.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the feed cannot be opened.
    async fn subscribe_messages(
        &self,
        session_id: Option<SessionId>,
    ) -> Result<Subscription<ChatMessage>, GatewayError>;

    // --- broadcasts ---

    /// Publish a broadcast to every connected client.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the remote call fails.
    async fn publish_broadcast(&self, broadcast: NewBroadcast) -> Result<Broadcast, GatewayError>;

    /// Open the broadcast feed. Only broadcasts published after the feed
    /// opens are delivered; there is no history.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the feed cannot be opened.
    async fn subscribe_broadcasts(&self) -> Result<Subscription<Broadcast>, GatewayError>;
}
