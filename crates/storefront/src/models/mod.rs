//! Domain models for the storefront.
//!
//! These types are what the store keeps in memory and what it writes to the
//! document store. Field names are serialized in camelCase to match the
//! documents already written by the web client.

pub mod cart;
pub mod favorite;
pub mod identity;
pub mod product;
pub mod profile;

pub use cart::{CartDocument, CartLineItem};
pub use favorite::{FavoriteItem, FavoritesDocument};
pub use identity::Identity;
pub use product::ProductSnapshot;
pub use profile::{LoginProfile, ProfileUpdate, SignUpProfile, UserProfile};
