//! Cart commands.

use atelier_core::{ProductId, Variant};
use atelier_storefront::models::ProductSnapshot;
use atelier_storefront::state::AppState;

use super::CommandError;

/// Print the cart lines and total.
#[allow(clippy::print_stdout)]
pub async fn show(state: &AppState) {
    let store = state.store();
    let lines = store.cart_items().await;
    if lines.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for line in &lines {
        let variant = line
            .variant
            .as_ref()
            .map(|v| format!(" ({v})"))
            .unwrap_or_default();
        println!(
            "{:>4} × {}{variant} [{}]  {}",
            line.quantity,
            line.name,
            line.product_id,
            line.line_total()
        );
    }
    println!(
        "{} items, total {}",
        store.cart_item_count().await,
        store.cart_total().await
    );
}

/// Add units of a product.
///
/// # Errors
///
/// Returns `CommandError::Store` if the store rejects or fails the change.
pub async fn add(
    state: &AppState,
    product: &ProductSnapshot,
    quantity: u32,
    variant: Option<&str>,
) -> Result<(), CommandError> {
    state
        .store()
        .add_to_cart(product, quantity, Variant::from_selection(variant))
        .await?;
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns `CommandError` for an invalid id or a failed change.
#[allow(clippy::print_stdout)]
pub async fn remove(state: &AppState, id: &str, variant: Option<&str>) -> Result<(), CommandError> {
    let id = ProductId::parse(id)?;
    let variant = Variant::from_selection(variant);
    if !state.store().remove_from_cart(&id, variant.as_ref()).await? {
        println!("No cart line for {id}.");
    }
    Ok(())
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns `CommandError` for an invalid id or a failed change.
#[allow(clippy::print_stdout)]
pub async fn update(
    state: &AppState,
    id: &str,
    quantity: i64,
    variant: Option<&str>,
) -> Result<(), CommandError> {
    let id = ProductId::parse(id)?;
    let variant = Variant::from_selection(variant);
    if state
        .store()
        .update_cart_quantity(&id, quantity, variant.as_ref())
        .await?
    {
        if quantity > 0 {
            println!("Quantity of {id} set to {quantity}.");
        }
    } else {
        println!("No cart line for {id}.");
    }
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns `CommandError::Store` if the change fails.
pub async fn clear(state: &AppState) -> Result<(), CommandError> {
    state.store().clear_cart().await?;
    Ok(())
}
