//! Favorites operations.

use chrono::Utc;
use tracing::instrument;

use atelier_core::{ProductId, UserId};

use super::{CartStore, Collections};
use crate::documents::{Collection, DocumentError, to_document};
use crate::error::{StoreError, add_breadcrumb};
use crate::models::{FavoriteItem, FavoritesDocument, ProductSnapshot};
use crate::notify::Notice;

const FAVORITES_SIGN_IN_PROMPT: &str = "Please login to save favorites";

impl CartStore {
    /// Add the product to favorites if absent, remove it if present.
    ///
    /// Returns whether the product is a favorite afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAuthenticated`] or [`StoreError::Persistence`].
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn toggle_favorite(&self, product: &ProductSnapshot) -> Result<bool, StoreError> {
        let mut state = self.lock().await;
        let uid = self.require_identity(&state, Some(FAVORITES_SIGN_IN_PROMPT))?;

        match find_favorite(&state, &product.id) {
            Some(index) => {
                self.remove_favorite(&mut state, &uid, index).await?;
                Ok(false)
            }
            None => {
                self.insert_favorite(&mut state, &uid, product).await?;
                Ok(true)
            }
        }
    }

    /// Save a product as a favorite.
    ///
    /// Returns `Ok(false)` without writing anything when it already is one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAuthenticated`] or [`StoreError::Persistence`].
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_favorites(&self, product: &ProductSnapshot) -> Result<bool, StoreError> {
        let mut state = self.lock().await;
        let uid = self.require_identity(&state, Some(FAVORITES_SIGN_IN_PROMPT))?;

        if find_favorite(&state, &product.id).is_some() {
            return Ok(false);
        }
        self.insert_favorite(&mut state, &uid, product).await?;
        Ok(true)
    }

    /// Remove a favorite.
    ///
    /// Returns `Ok(false)` without writing anything when it is not one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAuthenticated`] or [`StoreError::Persistence`].
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_favorites(&self, product_id: &ProductId) -> Result<bool, StoreError> {
        let mut state = self.lock().await;
        let uid = self.require_identity(&state, None)?;

        let Some(index) = find_favorite(&state, product_id) else {
            return Ok(false);
        };
        self.remove_favorite(&mut state, &uid, index).await?;
        Ok(true)
    }

    /// Add one unit of a favorite's product to the cart.
    ///
    /// The product stays in favorites. Returns `Ok(false)` when `product_id`
    /// is not a favorite.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAuthenticated`] or [`StoreError::Persistence`].
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn move_favorite_to_cart(&self, product_id: &ProductId) -> Result<bool, StoreError> {
        let mut state = self.lock().await;
        let uid = self.require_identity(&state, Some("Please login to add items to cart"))?;

        let Some(product) = state
            .favorites
            .iter()
            .find(|favorite| favorite.product_id == *product_id)
            .map(FavoriteItem::to_product)
        else {
            return Ok(false);
        };
        self.add_line(&mut state, &uid, &product, 1, None).await?;
        Ok(true)
    }

    /// Whether the product is a favorite.
    pub async fn is_favorite(&self, product_id: &ProductId) -> bool {
        find_favorite(&*self.lock().await, product_id).is_some()
    }

    /// Current favorites in the order they were added.
    pub async fn favorite_items(&self) -> Vec<FavoriteItem> {
        self.lock().await.favorites.clone()
    }

    async fn insert_favorite(
        &self,
        state: &mut Collections,
        uid: &UserId,
        product: &ProductSnapshot,
    ) -> Result<(), StoreError> {
        state.favorites.push(FavoriteItem::new(product, Utc::now()));
        add_breadcrumb(
            "favorites",
            "Added to favorites",
            Some(&[("product_id", product.id.as_str())]),
        );

        let written = self.write_favorites(state, uid).await;
        self.finish(
            state,
            written,
            Some(Notice::success(format!("{} added to favorites", product.name))),
            "Error updating favorites",
        )
    }

    async fn remove_favorite(
        &self,
        state: &mut Collections,
        uid: &UserId,
        index: usize,
    ) -> Result<(), StoreError> {
        let removed = state.favorites.remove(index);
        add_breadcrumb(
            "favorites",
            "Removed from favorites",
            Some(&[("product_id", removed.product_id.as_str())]),
        );

        let written = self.write_favorites(state, uid).await;
        self.finish(
            state,
            written,
            Some(Notice::info(format!("{} removed from favorites", removed.name))),
            "Error updating favorites",
        )
    }

    async fn write_favorites(&self, state: &Collections, uid: &UserId) -> Result<(), DocumentError> {
        let document = to_document(&FavoritesDocument::new(
            uid.clone(),
            state.favorites.clone(),
            Utc::now(),
        ))?;
        self.inner
            .documents
            .set_merge(Collection::Favorites, uid, document)
            .await
    }
}

fn find_favorite(state: &Collections, product_id: &ProductId) -> Option<usize> {
    state
        .favorites
        .iter()
        .position(|favorite| favorite.product_id == *product_id)
}

/// Keep the first favorite for each product.
pub(super) fn normalize_favorites(items: Vec<FavoriteItem>) -> Vec<FavoriteItem> {
    let mut kept: Vec<FavoriteItem> = Vec::with_capacity(items.len());
    for item in items {
        if !kept.iter().any(|seen| seen.product_id == item.product_id) {
            kept.push(item);
        }
    }
    kept
}
