//! The visitor directory.
//!
//! Presence rows change constantly (every storefront heartbeat), so the
//! directory does not patch rows from events; any change just triggers a
//! wholesale refetch, already ordered by the store. Renames write remotely
//! first and patch locally only on success.

use std::sync::Arc;

use cardvault_core::{ChangeEvent, SessionId, Visitor};
use cardvault_client::gateway::{Gateway, GatewayError};
use cardvault_client::notify::Notifier;
use tracing::{instrument, warn};

/// Operator-side view of all visitor presence rows.
#[derive(Debug)]
pub struct VisitorDirectory<G> {
    gateway: Arc<G>,
    notifier: Notifier,
    visitors: Vec<Visitor>,
}

impl<G: Gateway> VisitorDirectory<G> {
    #[must_use]
    pub const fn new(gateway: Arc<G>, notifier: Notifier) -> Self {
        Self {
            gateway,
            notifier,
            visitors: Vec::new(),
        }
    }

    /// Rows as of the last refetch, most recently active first.
    #[must_use]
    pub fn visitors(&self) -> &[Visitor] {
        &self.visitors
    }

    #[must_use]
    pub fn get(&self, session_id: &SessionId) -> Option<&Visitor> {
        self.visitors.iter().find(|v| &v.session_id == session_id)
    }

    /// Wholesale refetch.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; the last-known rows stay on screen.
    #[instrument(skip(self))]
    pub async fn refetch(&mut self) -> Result<(), GatewayError> {
        match self.gateway.list_visitors().await {
            Ok(visitors) => {
                self.visitors = visitors;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "visitor refetch failed");
                Err(e)
            }
        }
    }

    /// Any presence event invalidates the whole list.
    pub async fn handle_event(&mut self, _event: ChangeEvent<Visitor>) {
        let _ = self.refetch().await;
    }

    /// Assign or clear an operator-facing nickname, remote first.
    ///
    /// # Errors
    ///
    /// Returns the gateway error after posting a notice; local state is
    /// untouched on failure.
    #[instrument(skip(self, nickname), fields(session = %session_id.short()))]
    pub async fn rename(
        &mut self,
        session_id: &SessionId,
        nickname: Option<String>,
    ) -> Result<(), GatewayError> {
        match self
            .gateway
            .update_nickname(session_id, nickname.clone())
            .await
        {
            Ok(()) => {
                if let Some(visitor) = self
                    .visitors
                    .iter_mut()
                    .find(|v| &v.session_id == session_id)
                {
                    visitor.nickname = nickname;
                }
                Ok(())
            }
            Err(e) => {
                self.notifier.error("Could not rename visitor");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cardvault_client::gateway::MemoryGateway;
    use cardvault_core::VisitorUpsert;

    fn directory() -> (VisitorDirectory<MemoryGateway>, Arc<MemoryGateway>) {
        let gateway = Arc::new(MemoryGateway::new());
        let (notifier, _stream) = Notifier::channel();
        (
            VisitorDirectory::new(Arc::clone(&gateway), notifier),
            gateway,
        )
    }

    #[tokio::test]
    async fn test_refetch_loads_rows() {
        let (mut directory, gateway) = directory();
        gateway
            .upsert_visitor(VisitorUpsert::heartbeat(SessionId::from("s1")))
            .await
            .unwrap();

        directory.refetch().await.unwrap();
        assert_eq!(directory.visitors().len(), 1);
    }

    #[tokio::test]
    async fn test_event_triggers_wholesale_refetch() {
        let (mut directory, gateway) = directory();
        let mut feed = gateway.subscribe_visitors().await.unwrap();
        gateway
            .upsert_visitor(VisitorUpsert::heartbeat(SessionId::from("s1")))
            .await
            .unwrap();

        let event = feed.next().await.unwrap();
        directory.handle_event(event).await;
        assert!(directory.get(&SessionId::from("s1")).is_some());
    }

    #[tokio::test]
    async fn test_rename_patches_locally_on_success() {
        let (mut directory, gateway) = directory();
        gateway
            .upsert_visitor(VisitorUpsert::heartbeat(SessionId::from("s1")))
            .await
            .unwrap();
        directory.refetch().await.unwrap();

        directory
            .rename(&SessionId::from("s1"), Some("Whale".to_string()))
            .await
            .unwrap();

        assert_eq!(
            directory
                .get(&SessionId::from("s1"))
                .unwrap()
                .display_name(),
            "Whale"
        );
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_local_state() {
        let (mut directory, gateway) = directory();
        gateway
            .upsert_visitor(VisitorUpsert::heartbeat(SessionId::from("s1")))
            .await
            .unwrap();
        directory.refetch().await.unwrap();

        gateway.set_fail_writes(true);
        let result = directory
            .rename(&SessionId::from("s1"), Some("Whale".to_string()))
            .await;

        assert!(result.is_err());
        assert!(directory.get(&SessionId::from("s1")).unwrap().nickname.is_none());
    }
}
