//! The visitor chat synchronizer.
//!
//! Owns one session's transcript as a state machine: `Idle` until opened,
//! `Loading` while history is fetched, `Live` while the change feed runs,
//! `Closed` after teardown. Sends are optimistic: the entry appears at once
//! under a client-generated correlation id, the insert goes out, and the
//! feed's echo (carrying the same correlation id) confirms the entry in
//! place. A failed insert rolls its entry straight back out.

use std::sync::Arc;
use std::time::Duration;

use cardvault_core::{
    ChangeEvent, ChatMessage, MessageId, NewMessage, Sender, SessionId, VisitorUpsert,
};
use chrono::{DateTime, Utc};
use rand::prelude::IndexedRandom;
use tracing::{debug, instrument, warn};

use crate::gateway::{Gateway, GatewayError, Subscription};
use crate::notify::Notifier;

/// Optimistic entries older than this are treated as lost.
pub const PENDING_WINDOW: Duration = Duration::from_secs(30);

/// Canned greeter lines; one opens every transcript.
const GREETER_LINES: &[&str] = &[
    "Hey collector! Ask us anything about a listing, grading, or shipping.",
    "Welcome to the vault. An operator will be with you shortly.",
    "Hi there! Questions about a box or a slab? Fire away.",
];

/// Lifecycle of a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    Loading,
    Live,
    Closed,
}

/// One transcript entry, optionally still awaiting its remote echo.
#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub message: ChatMessage,
    pending: Option<DateTime<Utc>>,
}

impl ChatEntry {
    /// True while the entry has not been confirmed by the change feed.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Synchronizes one visitor session's transcript with the remote store.
#[derive(Debug)]
pub struct ChatSynchronizer<G> {
    gateway: Arc<G>,
    notifier: Notifier,
    session_id: SessionId,
    state: ChatState,
    entries: Vec<ChatEntry>,
    subscription: Option<Subscription<ChatMessage>>,
    /// Locally minted ids for optimistic entries; always negative so they
    /// can never collide with store-assigned ids.
    next_local_id: i64,
}

impl<G: Gateway> ChatSynchronizer<G> {
    #[must_use]
    pub const fn new(gateway: Arc<G>, notifier: Notifier, session_id: SessionId) -> Self {
        Self {
            gateway,
            notifier,
            session_id,
            state: ChatState::Idle,
            entries: Vec::new(),
            subscription: None,
            next_local_id: -1,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ChatState {
        self.state
    }

    #[must_use]
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    /// Open the session: greeter line, history, then the live feed.
    ///
    /// # Errors
    ///
    /// Returns the gateway error if history or the feed cannot be fetched;
    /// the session stays usable in a degraded, greeter-only state.
    #[instrument(skip(self), fields(session = %self.session_id.short()))]
    pub async fn open(&mut self) -> Result<(), GatewayError> {
        self.state = ChatState::Loading;
        self.entries.clear();
        self.push_greeter();

        let history = match self.gateway.list_messages(&self.session_id).await {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "chat history fetch failed");
                self.notifier.warn("Chat is offline, messages may not send");
                self.state = ChatState::Live;
                return Err(e);
            }
        };
        for message in history {
            self.entries.push(ChatEntry {
                message,
                pending: None,
            });
        }

        match self
            .gateway
            .subscribe_messages(Some(self.session_id.clone()))
            .await
        {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.state = ChatState::Live;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "chat feed unavailable");
                self.state = ChatState::Live;
                Err(e)
            }
        }
    }

    /// Send a visitor message optimistically.
    ///
    /// The entry is visible before the insert resolves; a failed insert
    /// removes it again and surfaces a notice. No automatic retry.
    ///
    /// # Errors
    ///
    /// Returns the gateway error on a failed insert.
    #[instrument(skip(self, text), fields(session = %self.session_id.short()))]
    pub async fn send(&mut self, text: impl Into<String>) -> Result<(), GatewayError> {
        let new_message = NewMessage::from_visitor(self.session_id.clone(), text);
        let correlation = new_message.client_ref;

        let local = ChatMessage {
            id: MessageId::new(self.next_local_id),
            session_id: self.session_id.clone(),
            sender: Sender::Visitor,
            text: new_message.text.clone(),
            created_at: Utc::now(),
            delivered: false,
            read: false,
            client_ref: correlation,
        };
        self.next_local_id -= 1;
        self.entries.push(ChatEntry {
            message: local,
            pending: Some(Utc::now()),
        });

        // Presence row first, so an operator opening the panel mid-send
        // always finds the session listed.
        let _ = self
            .gateway
            .upsert_visitor(VisitorUpsert::heartbeat(self.session_id.clone()))
            .await;

        match self.gateway.insert_message(new_message).await {
            Ok(committed) => {
                self.confirm(committed);
                Ok(())
            }
            Err(e) => {
                self.entries
                    .retain(|entry| entry.message.client_ref != correlation || !entry.is_pending());
                warn!(error = %e, "message insert failed, rolled back");
                self.notifier.error("Message not sent, check your connection");
                Err(e)
            }
        }
    }

    /// Wait for the next feed event, apply it, then drain whatever queued
    /// behind it. Returns immediately when no feed is open or the feed has
    /// closed.
    pub async fn pump_wait(&mut self) {
        let event = match self.subscription.as_mut() {
            Some(subscription) => subscription.next().await,
            None => return,
        };
        if let Some(event) = event {
            self.apply_event(event);
        }
        self.pump();
    }

    /// Drain queued feed events into the transcript.
    pub fn pump(&mut self) {
        let mut events = Vec::new();
        if let Some(subscription) = self.subscription.as_mut() {
            while let Some(event) = subscription.try_next() {
                events.push(event);
            }
        }
        for event in events {
            self.apply_event(event);
        }
    }

    /// Apply one feed event.
    ///
    /// Inserts reconcile by correlation id first, then by canonical id (the
    /// commit response and the feed echo race; whichever lands second finds
    /// nothing to do). Updates patch flags in place without reordering.
    pub fn apply_event(&mut self, event: ChangeEvent<ChatMessage>) {
        match event {
            ChangeEvent::Insert(message) => {
                if message.client_ref.is_some()
                    && let Some(entry) = self.entries.iter_mut().find(|e| {
                        e.message.client_ref == message.client_ref
                    })
                {
                    entry.message = message;
                    entry.pending = None;
                    return;
                }
                if self.entries.iter().any(|e| e.message.id == message.id) {
                    return;
                }
                debug!(id = %message.id, "appending feed message");
                self.entries.push(ChatEntry {
                    message,
                    pending: None,
                });
            }
            ChangeEvent::Update(message) => {
                if let Some(entry) = self
                    .entries
                    .iter_mut()
                    .find(|e| e.message.id == message.id)
                {
                    entry.message.delivered = message.delivered;
                    entry.message.read = message.read;
                }
            }
        }
    }

    /// Discard optimistic entries older than [`PENDING_WINDOW`].
    pub fn expire_pending(&mut self, now: DateTime<Utc>) {
        let window = chrono::Duration::from_std(PENDING_WINDOW).unwrap_or(chrono::Duration::zero());
        let before = self.entries.len();
        self.entries
            .retain(|entry| match entry.pending {
                Some(queued_at) => now - queued_at <= window,
                None => true,
            });
        if self.entries.len() < before {
            self.notifier.warn("A message could not be delivered");
        }
    }

    /// Tear down the feed. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
        }
        self.state = ChatState::Closed;
    }

    fn confirm(&mut self, committed: ChatMessage) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.is_pending() && e.message.client_ref == committed.client_ref)
        {
            entry.message = committed;
            entry.pending = None;
        }
    }

    fn push_greeter(&mut self) {
        let text = GREETER_LINES
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or("Welcome to the vault. An operator will be with you shortly.");
        self.entries.push(ChatEntry {
            message: ChatMessage {
                id: MessageId::new(0),
                session_id: self.session_id.clone(),
                sender: Sender::Greeter,
                text: text.to_string(),
                created_at: Utc::now(),
                delivered: true,
                read: true,
                client_ref: None,
            },
            pending: None,
        });
    }
}

impl<G> Drop for ChatSynchronizer<G> {
    fn drop(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
        }
    }
}
