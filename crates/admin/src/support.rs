//! The support desk.
//!
//! Operators watch every chat session at once. Unread counters are owned
//! locally: they are seeded once from the store, then maintained purely by
//! the event flow, never re-queried. The invariant throughout is that the
//! global counter equals the sum of the per-session counters; both sides
//! move together in `record_unread` and `open_session` only.

use std::collections::HashMap;
use std::sync::Arc;

use cardvault_core::{ChangeEvent, ChatMessage, NewMessage, Sender, SessionId};
use cardvault_client::gateway::{Gateway, GatewayError};
use cardvault_client::notify::Notifier;
use tracing::{info, instrument, warn};

/// Unread visitor-message counters, global and per session.
#[derive(Debug, Default)]
pub struct UnreadCounters {
    total: u32,
    per_session: HashMap<SessionId, u32>,
}

impl UnreadCounters {
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn for_session(&self, session_id: &SessionId) -> u32 {
        self.per_session.get(session_id).copied().unwrap_or(0)
    }

    fn record(&mut self, session_id: &SessionId) {
        *self.per_session.entry(session_id.clone()).or_insert(0) += 1;
        self.total += 1;
    }

    /// Remove a session's entry and decrement the total by exactly that
    /// count, keeping the two sides in lockstep. Returns the count.
    fn clear_session(&mut self, session_id: &SessionId) -> u32 {
        let count = self.per_session.remove(session_id).unwrap_or(0);
        self.total = self.total.saturating_sub(count);
        count
    }
}

/// Operator-side chat state across all sessions.
#[derive(Debug)]
pub struct SupportDesk<G> {
    gateway: Arc<G>,
    notifier: Notifier,
    unread: UnreadCounters,
    /// The session the operator is looking at, with its transcript.
    open: Option<(SessionId, Vec<ChatMessage>)>,
}

impl<G: Gateway> SupportDesk<G> {
    #[must_use]
    pub fn new(gateway: Arc<G>, notifier: Notifier) -> Self {
        Self {
            gateway,
            notifier,
            unread: UnreadCounters::default(),
            open: None,
        }
    }

    #[must_use]
    pub const fn unread(&self) -> &UnreadCounters {
        &self.unread
    }

    #[must_use]
    pub fn open_session_id(&self) -> Option<&SessionId> {
        self.open.as_ref().map(|(sid, _)| sid)
    }

    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        self.open.as_ref().map_or(&[], |(_, transcript)| transcript)
    }

    /// Seed the counters from the store. Called once at panel start; from
    /// then on the counters move only with the event flow.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; counters stay at zero.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<(), GatewayError> {
        let unread = self.gateway.list_unread_messages().await?;
        self.unread = UnreadCounters::default();
        for message in &unread {
            self.unread.record(&message.session_id);
        }
        info!(total = self.unread.total(), "unread counters seeded");
        Ok(())
    }

    /// Apply one event from the all-sessions message feed.
    pub async fn handle_event(&mut self, event: ChangeEvent<ChatMessage>) {
        match event {
            ChangeEvent::Insert(message) => self.handle_incoming(message).await,
            ChangeEvent::Update(message) => {
                if let Some((sid, transcript)) = self.open.as_mut()
                    && *sid == message.session_id
                    && let Some(row) = transcript.iter_mut().find(|m| m.id == message.id)
                {
                    row.delivered = message.delivered;
                    row.read = message.read;
                }
            }
        }
    }

    /// Route an incoming message.
    ///
    /// A visitor message for the session on screen is read the moment it
    /// lands: it is marked remotely and appended, and the counters never
    /// move. Any other visitor message bumps both counters exactly once and
    /// raises an alert.
    pub async fn handle_incoming(&mut self, message: ChatMessage) {
        if message.sender != Sender::Visitor {
            if let Some((sid, transcript)) = self.open.as_mut()
                && *sid == message.session_id
                && !transcript.iter().any(|m| m.id == message.id)
            {
                transcript.push(message);
            }
            return;
        }

        let watching = self
            .open
            .as_ref()
            .is_some_and(|(sid, _)| *sid == message.session_id);

        if watching {
            if let Err(e) = self.gateway.mark_delivered_read(message.id).await {
                warn!(id = %message.id, error = %e, "read receipt failed");
            }
            if let Some((_, transcript)) = self.open.as_mut()
                && !transcript.iter().any(|m| m.id == message.id)
            {
                transcript.push(message);
            }
        } else {
            self.unread.record(&message.session_id);
            self.notifier.info(format!(
                "New message from {}",
                message.session_id.short()
            ));
        }
    }

    /// Open a session: fetch its transcript, bulk-mark its unread visitor
    /// messages read, and settle the counters by the session's tracked
    /// count. The settle is local, never a re-query, so the global and
    /// per-session sides move by the same amount even when the remote
    /// receipt fails.
    ///
    /// # Errors
    ///
    /// Returns the gateway error if the transcript cannot be fetched; the
    /// previously open session stays open.
    #[instrument(skip(self), fields(session = %session_id.short()))]
    pub async fn open_session(&mut self, session_id: SessionId) -> Result<(), GatewayError> {
        let mut transcript = self.gateway.list_messages(&session_id).await?;

        if let Err(e) = self.gateway.mark_session_read(&session_id).await {
            warn!(error = %e, "bulk read receipt failed");
        }
        for message in &mut transcript {
            if message.unread_from_visitor() {
                message.read = true;
                message.delivered = true;
            }
        }
        let settled = self.unread.clear_session(&session_id);
        info!(settled, "session opened");
        self.open = Some((session_id, transcript));
        Ok(())
    }

    /// Reply to the open session.
    ///
    /// # Errors
    ///
    /// Returns the gateway error after posting a notice; returns
    /// `GatewayError::NotFound` when no session is open.
    pub async fn reply(&mut self, text: impl Into<String>) -> Result<(), GatewayError> {
        let Some((session_id, _)) = self.open.as_ref() else {
            return Err(GatewayError::NotFound { entity: "session" });
        };
        let message = NewMessage::from_admin(session_id.clone(), text);
        match self.gateway.insert_message(message).await {
            Ok(committed) => {
                if let Some((_, transcript)) = self.open.as_mut()
                    && !transcript.iter().any(|m| m.id == committed.id)
                {
                    transcript.push(committed);
                }
                Ok(())
            }
            Err(e) => {
                self.notifier.error("Reply not sent");
                Err(e)
            }
        }
    }

    /// Close the open transcript without touching the counters.
    pub fn close_session(&mut self) {
        self.open = None;
    }

    /// All sessions with any message, most recent first.
    ///
    /// # Errors
    ///
    /// Returns the gateway error.
    pub async fn list_sessions(&self) -> Result<Vec<SessionId>, GatewayError> {
        self.gateway.list_chat_sessions().await
    }

    /// Test-visible check of the counter invariant.
    #[must_use]
    pub fn counters_consistent(&self) -> bool {
        self.unread.per_session.values().sum::<u32>() == self.unread.total
    }
}
