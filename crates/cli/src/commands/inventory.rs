//! Inventory inspection and stock overrides.

use cardvault_client::gateway::{Gateway, GatewayError, RestGateway};
use cardvault_core::ProductId;

/// Print every remote product with price and stock.
///
/// # Errors
///
/// Returns `GatewayError` if the remote call fails.
#[allow(clippy::print_stdout)]
pub async fn list(gateway: &RestGateway) -> Result<(), GatewayError> {
    let products = gateway.list_products().await?;
    println!("{:<6} {:<42} {:>10} {:>6}", "ID", "NAME", "PRICE", "STOCK");
    for product in &products {
        println!(
            "{:<6} {:<42} {:>10} {:>6}",
            product.id,
            product.name,
            format!("${}", product.price),
            product.stock
        );
    }
    println!("{} products", products.len());
    Ok(())
}

/// Overwrite one product's stock count.
///
/// # Errors
///
/// Returns `GatewayError` if the product is missing or the write fails.
#[allow(clippy::print_stdout)]
pub async fn set_stock(gateway: &RestGateway, id: i64, stock: u32) -> Result<(), GatewayError> {
    let id = ProductId::new(id);
    let products = gateway.list_products().await?;
    let mut product = products
        .into_iter()
        .find(|p| p.id == id)
        .ok_or(GatewayError::NotFound { entity: "product" })?;

    product.stock = stock;
    let updated = gateway.update_product(product).await?;
    println!("{}: stock set to {}", updated.name, updated.stock);
    Ok(())
}
