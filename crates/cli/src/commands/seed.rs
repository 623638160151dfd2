//! Seed the remote store with the built-in catalog.

use cardvault_client::gateway::{Gateway, GatewayError, RestGateway};
use cardvault_client::seed;
use cardvault_core::NewProduct;
use tracing::info;

/// Insert every seed product the remote store does not already carry,
/// matched by name. Existing rows are left alone.
///
/// # Errors
///
/// Returns `GatewayError` if any remote call fails.
#[allow(clippy::print_stdout)]
pub async fn push(gateway: &RestGateway) -> Result<(), GatewayError> {
    let existing = gateway.list_products().await?;
    let mut pushed = 0;
    let mut skipped = 0;

    for product in seed::products() {
        if existing.iter().any(|p| p.name == product.name) {
            skipped += 1;
            continue;
        }
        let row = gateway
            .insert_product(NewProduct {
                name: product.name,
                price: product.price,
                category: product.category,
                stock: product.stock,
                badge: product.badge,
                image: product.image,
                description: product.description,
            })
            .await?;
        info!(id = %row.id, name = %row.name, "seeded");
        pushed += 1;
    }

    println!("Seeded {pushed} products ({skipped} already present)");
    Ok(())
}
