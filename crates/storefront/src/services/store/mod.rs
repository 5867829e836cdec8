//! Cart and favorites store.
//!
//! Owns the signed-in user's cart lines and favorites, mirrors every mutation
//! to the document store and notifies observers after every state change.
//!
//! # Consistency model
//!
//! The collections live behind one async mutex that is held for the whole
//! mutate-then-persist sequence, so operations issued by one caller apply
//! and persist in order. Every write carries the entire collection. Two
//! independent stores writing the same user's documents are not coordinated:
//! the last write wins.
//!
//! A failed write leaves the in-memory change in place. Observers still get a
//! refresh, followed by an error notice, and the operation returns
//! [`StoreError::Persistence`].
//!
//! Operations are split by collection: `cart.rs` and `favorites.rs` each add
//! an `impl CartStore` block.

mod cart;
mod favorites;

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use tracing::instrument;

use atelier_core::UserId;

use crate::documents::{Collection, DocumentError, DocumentStore, from_document};
use crate::error::StoreError;
use crate::identity::IdentityWatch;
use crate::models::{CartLineItem, FavoriteItem, Identity};
use crate::notify::{Notice, StoreObserver, StoreSnapshot};

/// Handle to the cart and favorites of the current identity.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<Inner>,
}

struct Inner {
    documents: Arc<dyn DocumentStore>,
    state: Mutex<Collections>,
    observers: Vec<Arc<dyn StoreObserver>>,
}

/// Everything guarded by the store lock.
#[derive(Default)]
struct Collections {
    identity: Option<Identity>,
    cart: Vec<CartLineItem>,
    favorites: Vec<FavoriteItem>,
}

impl Collections {
    fn uid(&self) -> Option<UserId> {
        self.identity.as_ref().map(|identity| identity.uid.clone())
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot::new(self.identity.is_some(), &self.cart, &self.favorites)
    }
}

/// Lenient view of a stored collection document: only `items` matters.
///
/// Lines stay raw so that one unreadable line does not take the others down.
#[derive(Deserialize)]
struct StoredItems {
    #[serde(default)]
    items: Vec<Value>,
}

impl CartStore {
    /// Create an empty, signed-out store.
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStore>, observers: Vec<Arc<dyn StoreObserver>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                documents,
                state: Mutex::new(Collections::default()),
                observers,
            }),
        }
    }

    /// Apply an identity transition.
    ///
    /// With an identity, both documents are read concurrently and replace the
    /// collections wholesale; a document that is missing or cannot be read
    /// yields an empty collection. Without one, the collections are cleared
    /// without any remote call. Observers are refreshed either way.
    #[instrument(skip_all, fields(uid = identity.as_ref().map(|i| i.uid.as_str())))]
    pub async fn on_identity_changed(&self, identity: Option<Identity>) {
        let mut state = self.lock().await;

        match identity {
            None => {
                *state = Collections::default();
                tracing::debug!("signed out, collections cleared");
            }
            Some(identity) => {
                let (cart, favorites) = futures::join!(
                    self.load::<CartLineItem>(
                        Collection::Carts,
                        &identity.uid,
                        "Could not load your cart"
                    ),
                    self.load::<FavoriteItem>(
                        Collection::Favorites,
                        &identity.uid,
                        "Could not load your favorites"
                    ),
                );
                tracing::info!(
                    cart_lines = cart.len(),
                    favorites = favorites.len(),
                    "collections loaded"
                );
                *state = Collections {
                    identity: Some(identity),
                    cart: cart::normalize_lines(cart),
                    favorites: favorites::normalize_favorites(favorites),
                };
            }
        }

        self.refresh(&state);
    }

    /// Apply every identity published on `changes` until the feed closes.
    pub async fn follow(self, mut changes: IdentityWatch) {
        while changes.changed().await.is_ok() {
            let identity = changes.borrow_and_update().clone();
            self.on_identity_changed(identity).await;
        }
        tracing::debug!("identity feed closed, store stopped following");
    }

    /// The identity whose collections are loaded.
    pub async fn identity(&self) -> Option<Identity> {
        self.lock().await.identity.clone()
    }

    /// Current render model.
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.lock().await.snapshot()
    }

    async fn lock(&self) -> MutexGuard<'_, Collections> {
        self.inner.state.lock().await
    }

    async fn load<T: DeserializeOwned>(
        &self,
        collection: Collection,
        uid: &UserId,
        failure_message: &str,
    ) -> Vec<T> {
        let stored = match self.inner.documents.get(collection, uid).await {
            Ok(Some(document)) => from_document::<StoredItems>(collection, uid, document),
            Ok(None) => Ok(StoredItems { items: Vec::new() }),
            Err(e) => Err(e),
        };

        match stored {
            Ok(stored) => decode_lines(collection, uid, stored.items),
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                tracing::error!(
                    error = %e,
                    %collection,
                    sentry_event_id = %event_id,
                    "failed to load collection, starting empty"
                );
                self.notice(&Notice::warning(failure_message));
                Vec::new()
            }
        }
    }

    /// Current user id, or `NotAuthenticated`.
    ///
    /// `sign_in_prompt` is shown to the user when nobody is signed in.
    fn require_identity(
        &self,
        state: &Collections,
        sign_in_prompt: Option<&str>,
    ) -> Result<UserId, StoreError> {
        state.uid().ok_or_else(|| {
            if let Some(message) = sign_in_prompt {
                self.notice(&Notice::sign_in_required(message));
            }
            StoreError::NotAuthenticated
        })
    }

    /// Refresh observers after a mutation and report the write outcome.
    fn finish(
        &self,
        state: &Collections,
        written: Result<(), DocumentError>,
        success: Option<Notice>,
        failure_message: &str,
    ) -> Result<(), StoreError> {
        self.refresh(state);

        match written {
            Ok(()) => {
                if let Some(notice) = success {
                    self.notice(&notice);
                }
                Ok(())
            }
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                tracing::error!(
                    error = %e,
                    sentry_event_id = %event_id,
                    "failed to persist change"
                );
                self.notice(&Notice::error(failure_message));
                Err(StoreError::Persistence(e))
            }
        }
    }

    fn refresh(&self, state: &Collections) {
        if self.inner.observers.is_empty() {
            return;
        }
        let snapshot = state.snapshot();
        for observer in &self.inner.observers {
            observer.refresh(&snapshot);
        }
    }

    fn notice(&self, notice: &Notice) {
        tracing::debug!(level = %notice.level, message = %notice.message, "notice");
        for observer in &self.inner.observers {
            observer.notice(notice);
        }
    }
}

/// Decode stored lines one by one, skipping those that cannot be read.
fn decode_lines<T: DeserializeOwned>(
    collection: Collection,
    uid: &UserId,
    raw: Vec<Value>,
) -> Vec<T> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            serde_json::from_value(value)
                .map_err(|source| DocumentError::Malformed {
                    collection,
                    key: uid.to_string(),
                    source,
                })
                .inspect_err(|e| {
                    let event_id = sentry::capture_error(e);
                    tracing::warn!(
                        error = %e,
                        index,
                        sentry_event_id = %event_id,
                        "skipping unreadable stored line"
                    );
                })
                .ok()
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::Mutex as StdMutex;

    use serde_json::json;

    use atelier_core::{Email, Price, ProductId, Variant};

    use super::*;
    use crate::documents::{MemoryDocumentStore, to_document};
    use crate::models::ProductSnapshot;

    /// Observer that records everything it receives.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub(crate) refreshes: StdMutex<Vec<StoreSnapshot>>,
        pub(crate) notices: StdMutex<Vec<Notice>>,
    }

    impl Recorder {
        pub(crate) fn last_refresh(&self) -> StoreSnapshot {
            self.refreshes.lock().unwrap().last().cloned().unwrap()
        }

        pub(crate) fn refresh_count(&self) -> usize {
            self.refreshes.lock().unwrap().len()
        }

        pub(crate) fn messages(&self) -> Vec<String> {
            self.notices
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.message.clone())
                .collect()
        }

        pub(crate) fn last_notice(&self) -> Notice {
            self.notices.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl StoreObserver for Recorder {
        fn refresh(&self, snapshot: &StoreSnapshot) {
            self.refreshes.lock().unwrap().push(snapshot.clone());
        }

        fn notice(&self, notice: &Notice) {
            self.notices.lock().unwrap().push(notice.clone());
        }
    }

    pub(crate) fn identity(uid: &str) -> Identity {
        Identity::new(
            UserId::parse(uid).unwrap(),
            Email::parse(&format!("{uid}@shop.example")).unwrap(),
            true,
        )
    }

    pub(crate) fn product(id: &str, cents: u32) -> ProductSnapshot {
        ProductSnapshot::new(
            ProductId::parse(id).unwrap(),
            format!("Product {id}"),
            Price::from_cents(cents),
        )
    }

    pub(crate) fn store() -> (CartStore, Arc<MemoryDocumentStore>, Arc<Recorder>) {
        let documents = Arc::new(MemoryDocumentStore::new());
        let recorder = Arc::new(Recorder::default());
        let observers: Vec<Arc<dyn StoreObserver>> = vec![recorder.clone()];
        let store = CartStore::new(documents.clone(), observers);
        (store, documents, recorder)
    }

    pub(crate) async fn signed_in(
        uid: &str,
    ) -> (CartStore, Arc<MemoryDocumentStore>, Arc<Recorder>) {
        let (store, documents, recorder) = store();
        store.on_identity_changed(Some(identity(uid))).await;
        (store, documents, recorder)
    }

    #[tokio::test]
    async fn test_sign_in_with_no_documents_starts_empty() {
        let (store, documents, recorder) = signed_in("u1").await;

        assert_eq!(documents.read_count(), 2);
        let snapshot = recorder.last_refresh();
        assert!(snapshot.signed_in);
        assert!(snapshot.cart_items.is_empty());
        assert!(snapshot.favorites.is_empty());
        assert_eq!(store.identity().await.unwrap().uid.as_str(), "u1");
    }

    #[tokio::test]
    async fn test_sign_in_loads_stored_documents() {
        let (store, documents, _) = store();
        let uid = UserId::parse("u1").unwrap();
        documents
            .set_merge(
                Collection::Favorites,
                &uid,
                to_document(&json!({
                    "userId": "u1",
                    "items": [{
                        "productId": "p9",
                        "name": "Scarf",
                        "price": "15.00",
                        "addedAt": "2026-01-01T00:00:00Z"
                    }]
                }))
                .unwrap(),
            )
            .await
            .unwrap();

        store.on_identity_changed(Some(identity("u1"))).await;

        assert!(store.is_favorite(&ProductId::parse("p9").unwrap()).await);
        assert!(store.cart_items().await.is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_clears_without_remote_calls() {
        let (store, documents, recorder) = signed_in("u1").await;
        store.add_to_cart(&product("p1", 1000), 1, None).await.unwrap();
        let (reads, writes) = (documents.read_count(), documents.write_count());

        store.on_identity_changed(None).await;

        assert_eq!(documents.read_count(), reads);
        assert_eq!(documents.write_count(), writes);
        assert!(store.cart_items().await.is_empty());
        assert!(store.identity().await.is_none());
        assert!(!recorder.last_refresh().signed_in);
    }

    #[tokio::test]
    async fn test_failed_load_is_empty_with_warning() {
        let (store, documents, recorder) = store();
        documents.set_offline(true);

        store.on_identity_changed(Some(identity("u1"))).await;

        assert!(store.cart_items().await.is_empty());
        assert!(store.identity().await.is_some());
        let messages = recorder.messages();
        assert!(messages.contains(&"Could not load your cart".to_string()));
        assert!(messages.contains(&"Could not load your favorites".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_document_is_empty() {
        let (store, documents, recorder) = store();
        let uid = UserId::parse("u1").unwrap();
        documents
            .set_merge(Collection::Carts, &uid, to_document(&json!({"items": "broken"})).unwrap())
            .await
            .unwrap();

        store.on_identity_changed(Some(identity("u1"))).await;

        assert!(store.cart_items().await.is_empty());
        assert_eq!(recorder.last_notice().message, "Could not load your cart");
    }

    async fn seed(documents: &MemoryDocumentStore, collection: Collection, body: &Value) {
        let uid = UserId::parse("u1").unwrap();
        documents
            .set_merge(collection, &uid, to_document(body).unwrap())
            .await
            .unwrap();
    }

    fn line(id: &str, quantity: u32, variant: Option<&str>) -> Value {
        json!({
            "productId": id,
            "name": format!("Product {id}"),
            "unitPrice": "10.00",
            "quantity": quantity,
            "variant": variant,
            "addedAt": "2026-01-01T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_unreadable_line_does_not_drop_the_rest() {
        let (store, documents, _) = store();
        let mut bad = line("bad", 1, None);
        bad["unitPrice"] = json!("-1");
        let stored = json!({"items": [line("good", 2, None), bad]});
        seed(&documents, Collection::Carts, &stored).await;

        store.on_identity_changed(Some(identity("u1"))).await;
        let lines = store.cart_items().await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id.as_str(), "good");

        store.add_to_cart(&product("new", 500), 1, None).await.unwrap();

        let uid = UserId::parse("u1").unwrap();
        let stored = documents.snapshot(Collection::Carts, &uid).await.unwrap();
        let ids: Vec<&str> = stored["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["productId"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["good", "new"]);
        assert_eq!(stored["items"][0]["quantity"], 2);
    }

    #[tokio::test]
    async fn test_loads_web_client_cart_lines() {
        let (store, documents, _) = store();
        seed(
            &documents,
            Collection::Carts,
            &json!({"items": [{
                "productId": "robe",
                "name": "Silk Robe",
                "price": 120,
                "quantity": 1,
                "selectedSize": "M",
                "image": "",
                "addedAt": "2026-01-01T00:00:00Z"
            }]}),
        )
        .await;

        store.on_identity_changed(Some(identity("u1"))).await;

        let lines = store.cart_items().await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unit_price, Price::from_cents(12_000));
        assert_eq!(lines[0].variant.as_ref().unwrap().as_str(), "M");
    }

    #[tokio::test]
    async fn test_loaded_lines_are_normalized() {
        let (store, documents, _) = store();
        seed(
            &documents,
            Collection::Carts,
            &json!({"items": [
                line("p", 0, Some("")),
                line("p", 3, Some("")),
                line("p", 2, None),
                line("q", 1, Some(" M ")),
                line("q", 1, Some("M")),
            ]}),
        )
        .await;

        store.on_identity_changed(Some(identity("u1"))).await;

        let lines = store.cart_items().await;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_id.as_str(), "p");
        assert_eq!(lines[0].variant, None);
        assert_eq!(lines[0].quantity, 5);
        assert_eq!(lines[1].quantity, 2);

        let p = ProductId::parse("p").unwrap();
        store
            .add_to_cart(&product("p", 1000), 1, Variant::from_selection(Some("")))
            .await
            .unwrap();
        let lines = store.cart_items().await;
        assert_eq!(lines.len(), 2);
        assert!(lines[0].is_keyed_by(&p, None));
        assert_eq!(lines[0].quantity, 6);
    }

    #[tokio::test]
    async fn test_loaded_favorites_are_unique() {
        let (store, documents, _) = store();
        let favorite = json!({
            "productId": "p9",
            "name": "Scarf",
            "price": "15.00",
            "addedAt": "2026-01-01T00:00:00Z"
        });
        let stored = json!({"items": [favorite.clone(), favorite]});
        seed(&documents, Collection::Favorites, &stored).await;

        store.on_identity_changed(Some(identity("u1"))).await;

        assert_eq!(store.favorite_items().await.len(), 1);
    }

    #[tokio::test]
    async fn test_follow_applies_feed() {
        let (store, _, recorder) = store();
        let (tx, rx) = tokio::sync::watch::channel(None);
        let task = tokio::spawn(store.clone().follow(rx));

        tx.send(Some(identity("u1"))).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while store.identity().await.is_none() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        drop(tx);
        task.await.unwrap();
        assert!(recorder.last_refresh().signed_in);
    }
}
