//! Atelier storefront library.
//!
//! Keeps a signed-in shopper's cart and favorites in sync with a remote
//! per-user document store, driven by the identity provider's auth state.
//!
//! # Modules
//!
//! - [`state`] - Composition root wiring everything together
//! - [`services`] - Session tracker, cart store, accounts, profile sync
//! - [`documents`] - Document store capability and adapters
//! - [`identity`] - Identity provider capability and a local implementation
//! - [`notify`] - Observers, notices and the render snapshot
//! - [`models`] - Cart, favorites, identity and profile types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod documents;
pub mod error;
pub mod identity;
pub mod models;
pub mod notify;
pub mod services;
pub mod state;
