//! Visitor presence inspection.

use cardvault_client::gateway::{Gateway, GatewayError, RestGateway};

/// Print every visitor row, most recently active first.
///
/// # Errors
///
/// Returns `GatewayError` if the remote call fails.
#[allow(clippy::print_stdout)]
pub async fn list(gateway: &RestGateway) -> Result<(), GatewayError> {
    let visitors = gateway.list_visitors().await?;
    println!("{:<12} {:<20} {:<24}", "SESSION", "NAME", "LAST ACTIVE");
    for visitor in &visitors {
        println!(
            "{:<12} {:<20} {:<24}",
            visitor.session_id.short(),
            visitor.display_name(),
            visitor.last_active.to_rfc3339()
        );
    }
    println!("{} visitors", visitors.len());
    Ok(())
}
