//! Broadcast publishing.

use std::sync::Arc;

use cardvault_core::{NewBroadcast, Severity};
use cardvault_client::gateway::{Gateway, GatewayError};
use cardvault_client::notify::Notifier;
use tracing::{info, instrument};

/// Publishes operator announcements to every connected client.
#[derive(Debug)]
pub struct Broadcaster<G> {
    gateway: Arc<G>,
    notifier: Notifier,
}

impl<G: Gateway> Broadcaster<G> {
    #[must_use]
    pub const fn new(gateway: Arc<G>, notifier: Notifier) -> Self {
        Self { gateway, notifier }
    }

    /// Publish once; delivery to clients is the store's fan-out.
    ///
    /// # Errors
    ///
    /// Returns the gateway error after posting a notice.
    #[instrument(skip(self, message))]
    pub async fn publish(
        &self,
        message: impl Into<String>,
        severity: Severity,
    ) -> Result<(), GatewayError> {
        let broadcast = NewBroadcast::new(message, severity);
        match self.gateway.publish_broadcast(broadcast).await {
            Ok(row) => {
                info!(id = %row.id, "broadcast published");
                self.notifier.success("Broadcast sent");
                Ok(())
            }
            Err(e) => {
                self.notifier.error("Broadcast failed");
                Err(e)
            }
        }
    }
}
