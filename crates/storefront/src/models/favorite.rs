//! Favorite items and the persisted favorites document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::{Price, ProductId, UserId};

use super::ProductSnapshot;

/// A saved product. Unique by `product_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub image: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl FavoriteItem {
    /// Create a favorite from a product snapshot.
    #[must_use]
    pub fn new(product: &ProductSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            added_at: now,
        }
    }

    /// The product snapshot this favorite was created from.
    #[must_use]
    pub fn to_product(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.product_id.clone(),
            name: self.name.clone(),
            price: self.price,
            image: self.image.clone(),
        }
    }
}

/// Document stored under `favorites/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesDocument {
    pub user_id: UserId,
    #[serde(default)]
    pub items: Vec<FavoriteItem>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub item_count: usize,
}

impl FavoritesDocument {
    /// Build the full document for the given favorites.
    #[must_use]
    pub fn new(user_id: UserId, items: Vec<FavoriteItem>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            item_count: items.len(),
            items,
            updated_at: now,
        }
    }
}
