//! Presentation observers.
//!
//! The store never renders anything itself. After every state change it hands
//! a [`StoreSnapshot`] to each registered [`StoreObserver`], and user-visible
//! messages (toasts, sign-in prompts) go out as [`Notice`]s.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use atelier_core::{Price, ProductId};

use crate::models::{CartLineItem, FavoriteItem};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// The UI should open the sign-in dialog.
    pub prompt_sign_in: bool,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    /// Warning that asks the user to sign in.
    #[must_use]
    pub fn sign_in_required(message: impl Into<String>) -> Self {
        Self {
            prompt_sign_in: true,
            ..Self::warning(message)
        }
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            prompt_sign_in: false,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Render model handed to observers after every state change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub signed_in: bool,
    pub cart_items: Vec<CartLineItem>,
    /// Sum of line quantities (the cart badge).
    pub cart_count: u64,
    pub cart_total: Price,
    pub favorites: Vec<FavoriteItem>,
    /// Favorite product ids, for heart-icon state.
    pub favorite_ids: BTreeSet<ProductId>,
}

impl StoreSnapshot {
    /// Snapshot of the given collections.
    #[must_use]
    pub fn new(signed_in: bool, cart_items: &[CartLineItem], favorites: &[FavoriteItem]) -> Self {
        Self {
            signed_in,
            cart_items: cart_items.to_vec(),
            cart_count: cart_items.iter().map(|line| u64::from(line.quantity)).sum(),
            cart_total: cart_items.iter().map(CartLineItem::line_total).sum(),
            favorites: favorites.to_vec(),
            favorite_ids: favorites.iter().map(|f| f.product_id.clone()).collect(),
        }
    }
}

/// Receives store updates.
///
/// Called while the store holds its lock, so implementations must not call
/// back into the store.
pub trait StoreObserver: Send + Sync {
    /// The collections changed; re-render from the snapshot.
    fn refresh(&self, snapshot: &StoreSnapshot);

    /// Show a message to the user.
    fn notice(&self, _notice: &Notice) {}
}

/// Event published by [`BroadcastObserver`].
#[derive(Debug, Clone)]
pub enum StoreEvent {
    Refresh(Arc<StoreSnapshot>),
    Notice(Notice),
}

/// Observer that republishes every callback on a broadcast channel.
///
/// Lets any number of async consumers follow the store without implementing
/// [`StoreObserver`] themselves. Lagging receivers lose the oldest events.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    tx: broadcast::Sender<StoreEvent>,
}

impl BroadcastObserver {
    /// Create an observer buffering up to `capacity` events per receiver.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive all events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    fn publish(&self, event: StoreEvent) {
        // No receivers is fine.
        let _ = self.tx.send(event);
    }
}

impl StoreObserver for BroadcastObserver {
    fn refresh(&self, snapshot: &StoreSnapshot) {
        self.publish(StoreEvent::Refresh(Arc::new(snapshot.clone())));
    }

    fn notice(&self, notice: &Notice) {
        self.publish(StoreEvent::Notice(notice.clone()));
    }
}
