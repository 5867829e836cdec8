//! Integration tests for Atelier.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p atelier-integration-tests
//! ```
//!
//! No external services are needed: the tests wire the storefront to the
//! in-process identity provider and an in-memory (or temp-dir file) document
//! store through [`TestContext`].
//!
//! # Test Categories
//!
//! - `cart_sync` - Cart and favorites persistence across identity changes
//! - `session_lifecycle` - Provider readiness, sign-in flows, profiles

#![allow(clippy::unwrap_used)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::{self, error::TryRecvError};

use atelier_core::{Email, Price, ProductId, UserId};
use atelier_storefront::config::{RemoteConfig, RetryPolicy, StoreConfig};
use atelier_storefront::documents::{DocumentStore, MemoryDocumentStore};
use atelier_storefront::identity::LocalIdentityProvider;
use atelier_storefront::models::{Identity, ProductSnapshot};
use atelier_storefront::notify::{BroadcastObserver, Notice, StoreEvent, StoreObserver};
use atelier_storefront::state::AppState;

/// How long helpers wait for background identity handling.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Config with short retry delays.
#[must_use]
pub fn test_config() -> StoreConfig {
    StoreConfig {
        remote: RemoteConfig {
            timeout: Duration::from_secs(1),
            retry: RetryPolicy::fixed(2, Duration::from_millis(1)),
        },
        provider_retry: RetryPolicy::fixed(10, Duration::from_millis(5)),
        ..StoreConfig::default()
    }
}

/// A storefront wired to in-process collaborators.
pub struct TestContext {
    pub state: AppState,
    pub provider: Arc<LocalIdentityProvider>,
    pub documents: Arc<MemoryDocumentStore>,
    pub events: broadcast::Receiver<StoreEvent>,
}

impl TestContext {
    /// Signed-out storefront with an empty in-memory store.
    pub async fn new() -> Self {
        Self::build(None, Arc::new(MemoryDocumentStore::new())).await
    }

    /// Storefront whose provider restores a session for `uid` at startup.
    pub async fn with_session(uid: &str) -> Self {
        Self::with_session_and_documents(uid, Arc::new(MemoryDocumentStore::new())).await
    }

    /// Like [`Self::with_session`] on top of existing documents.
    pub async fn with_session_and_documents(uid: &str, documents: Arc<MemoryDocumentStore>) -> Self {
        Self::build(Some(identity(uid)), documents).await
    }

    async fn build(session: Option<Identity>, documents: Arc<MemoryDocumentStore>) -> Self {
        let provider = Arc::new(LocalIdentityProvider::ready());
        if let Some(identity) = session {
            provider.restore_session(identity).await;
        }

        let observer = BroadcastObserver::new(256);
        let events = observer.subscribe();
        let observers: Vec<Arc<dyn StoreObserver>> = vec![Arc::new(observer)];
        let store: Arc<dyn DocumentStore> = documents.clone();
        let state = AppState::initialize(test_config(), provider.clone(), store, observers)
            .await
            .unwrap();

        Self {
            state,
            provider,
            documents,
            events,
        }
    }

    /// Wait until the store has applied the identity `uid` (or sign-out).
    pub async fn settle_on(&self, uid: Option<&str>) {
        let store = self.state.store();
        wait_until(|| async move {
            store.identity().await.map(|i| i.uid.to_string()).as_deref() == uid
        })
        .await;
    }

    /// Drain the notices published so far.
    pub fn notices(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(StoreEvent::Notice(notice)) => notices.push(notice),
                Ok(StoreEvent::Refresh(_)) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return notices,
            }
        }
    }
}

/// Poll `condition` until it holds, failing after [`SETTLE_TIMEOUT`].
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(SETTLE_TIMEOUT, async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap();
}

/// A verified identity with a derived email.
#[must_use]
pub fn identity(uid: &str) -> Identity {
    Identity::new(
        UserId::parse(uid).unwrap(),
        Email::parse(&format!("{uid}@shop.example")).unwrap(),
        true,
    )
}

/// A catalog product named after its id.
#[must_use]
pub fn product(id: &str, cents: u32) -> ProductSnapshot {
    ProductSnapshot::new(
        ProductId::parse(id).unwrap(),
        format!("Product {id}"),
        Price::from_cents(cents),
    )
}

/// Parse a product id.
#[must_use]
pub fn pid(id: &str) -> ProductId {
    ProductId::parse(id).unwrap()
}
