//! Favorites commands.

use atelier_core::ProductId;
use atelier_storefront::models::ProductSnapshot;
use atelier_storefront::state::AppState;

use super::CommandError;

/// Print the favorites.
#[allow(clippy::print_stdout)]
pub async fn list(state: &AppState) {
    let favorites = state.store().favorite_items().await;
    if favorites.is_empty() {
        println!("No favorites yet.");
        return;
    }
    for favorite in favorites {
        println!(
            "{} [{}]  {}  added {}",
            favorite.name,
            favorite.product_id,
            favorite.price,
            favorite.added_at.format("%Y-%m-%d")
        );
    }
}

/// Toggle a product's favorite state.
///
/// # Errors
///
/// Returns `CommandError::Store` if the change fails.
pub async fn toggle(state: &AppState, product: &ProductSnapshot) -> Result<(), CommandError> {
    state.store().toggle_favorite(product).await?;
    Ok(())
}

/// Remove a favorite.
///
/// # Errors
///
/// Returns `CommandError` for an invalid id or a failed change.
#[allow(clippy::print_stdout)]
pub async fn remove(state: &AppState, id: &str) -> Result<(), CommandError> {
    let id = ProductId::parse(id)?;
    if !state.store().remove_from_favorites(&id).await? {
        println!("{id} is not a favorite.");
    }
    Ok(())
}

/// Add one unit of a favorite to the cart.
///
/// # Errors
///
/// Returns `CommandError` for an invalid id or a failed change.
#[allow(clippy::print_stdout)]
pub async fn move_to_cart(state: &AppState, id: &str) -> Result<(), CommandError> {
    let id = ProductId::parse(id)?;
    if !state.store().move_favorite_to_cart(&id).await? {
        println!("{id} is not a favorite.");
    }
    Ok(())
}
