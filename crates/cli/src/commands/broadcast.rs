//! Broadcast publishing from the command line.

use cardvault_client::gateway::{Gateway, GatewayError, RestGateway};
use cardvault_core::{NewBroadcast, Severity};

/// Publish one announcement to every connected client.
///
/// # Errors
///
/// Returns `GatewayError` if the insert fails.
#[allow(clippy::print_stdout)]
pub async fn publish(
    gateway: &RestGateway,
    message: &str,
    severity: Severity,
) -> Result<(), GatewayError> {
    let row = gateway
        .publish_broadcast(NewBroadcast::new(message, severity))
        .await?;
    println!("Broadcast {} published", row.id);
    Ok(())
}
