//! Integration tests for cart and favorites synchronization.
//!
//! The storefront runs against the in-memory document store; every test
//! goes through `AppState`, so identity changes flow through the session
//! tracker exactly as they do in the CLI.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use atelier_core::{Price, UserId, Variant};
use atelier_integration_tests::{TestContext, identity, pid, product, test_config, wait_until};
use atelier_storefront::documents::{
    Collection, DocumentStore, FileDocumentStore, MemoryDocumentStore, from_document,
};
use atelier_storefront::error::StoreError;
use atelier_storefront::identity::LocalIdentityProvider;
use atelier_storefront::models::CartDocument;
use atelier_storefront::notify::NoticeLevel;
use atelier_storefront::state::AppState;

// =============================================================================
// Cart Semantics
// =============================================================================

#[tokio::test]
async fn test_duplicate_add_merges_into_one_line() {
    let ctx = TestContext::with_session("ana").await;
    let store = ctx.state.store();
    let robe = product("robe", 12_000);
    let medium = Variant::from_selection(Some("M"));

    store.add_to_cart(&robe, 1, medium.clone()).await.unwrap();
    store.add_to_cart(&robe, 2, medium.clone()).await.unwrap();

    let lines = store.cart_items().await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 3);
    assert_eq!(lines[0].variant, medium);
}

#[tokio::test]
async fn test_cart_total_and_count() {
    let ctx = TestContext::with_session("ana").await;
    let store = ctx.state.store();

    store.add_to_cart(&product("a", 1000), 2, None).await.unwrap();
    store.add_to_cart(&product("b", 500), 3, None).await.unwrap();

    assert_eq!(store.cart_total().await, Price::from_cents(3500));
    assert_eq!(store.cart_item_count().await, 5);
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.cart_total.to_string(), "$35.00");
    assert_eq!(snapshot.cart_count, 5);
}

#[tokio::test]
async fn test_remove_twice_second_is_false() {
    let ctx = TestContext::with_session("ana").await;
    let store = ctx.state.store();
    store.add_to_cart(&product("a", 1000), 1, None).await.unwrap();

    assert!(store.remove_from_cart(&pid("a"), None).await.unwrap());
    assert!(!store.remove_from_cart(&pid("a"), None).await.unwrap());
}

#[tokio::test]
async fn test_quantity_floor_removes_line() {
    let ctx = TestContext::with_session("ana").await;
    let store = ctx.state.store();
    store.add_to_cart(&product("a", 1000), 4, None).await.unwrap();

    assert!(store.update_cart_quantity(&pid("a"), -1, None).await.unwrap());
    assert!(store.cart_items().await.is_empty());
}

#[tokio::test]
async fn test_favorite_toggle_symmetry() {
    let ctx = TestContext::with_session("ana").await;
    let store = ctx.state.store();
    let scarf = product("scarf", 3500);

    assert!(store.toggle_favorite(&scarf).await.unwrap());
    assert!(!store.toggle_favorite(&scarf).await.unwrap());
    assert!(!store.is_favorite(&scarf.id).await);
    assert!(store.favorite_items().await.is_empty());
}

// =============================================================================
// Identity Guard
// =============================================================================

#[tokio::test]
async fn test_signed_out_mutations_are_rejected() {
    let mut ctx = TestContext::new().await;
    let store = ctx.state.store();

    let err = store.add_to_cart(&product("a", 100), 1, None).await.unwrap_err();
    assert!(matches!(err, StoreError::NotAuthenticated));
    let err = store.toggle_favorite(&product("a", 100)).await.unwrap_err();
    assert!(matches!(err, StoreError::NotAuthenticated));

    assert_eq!(ctx.documents.write_count(), 0);
    let notices = ctx.notices();
    assert_eq!(notices.len(), 2);
    assert!(notices.iter().all(|n| n.prompt_sign_in && n.level == NoticeLevel::Warning));
    assert_eq!(notices[0].message, "Please login to add items to cart");
    assert_eq!(notices[1].message, "Please login to save favorites");
}

#[tokio::test]
async fn test_sign_out_clears_without_writing() {
    let ctx = TestContext::with_session("ana").await;
    let store = ctx.state.store();
    store.add_to_cart(&product("a", 100), 1, None).await.unwrap();
    store.toggle_favorite(&product("b", 100)).await.unwrap();

    // Let the login profile write land first.
    let uid = UserId::parse("ana").unwrap();
    let documents = ctx.documents.clone();
    wait_until(|| {
        let documents = documents.clone();
        let uid = uid.clone();
        async move { documents.snapshot(Collection::Users, &uid).await.is_some() }
    })
    .await;
    let writes = ctx.documents.write_count();

    ctx.state.accounts().sign_out().await.unwrap();
    ctx.settle_on(None).await;

    assert!(store.cart_items().await.is_empty());
    assert!(store.favorite_items().await.is_empty());
    assert_eq!(store.cart_item_count().await, 0);
    assert_eq!(ctx.documents.write_count(), writes);
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_collections_survive_restart() {
    let documents = Arc::new(MemoryDocumentStore::new());
    {
        let ctx = TestContext::with_session_and_documents("ana", documents.clone()).await;
        let store = ctx.state.store();
        store
            .add_to_cart(&product("robe", 12_000), 2, Variant::from_selection(Some("L")))
            .await
            .unwrap();
        store.toggle_favorite(&product("scarf", 3500)).await.unwrap();
    }

    let ctx = TestContext::with_session_and_documents("ana", documents).await;
    let store = ctx.state.store();

    let lines = store.cart_items().await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 2);
    assert_eq!(lines[0].variant, Variant::from_selection(Some("L")));
    assert_eq!(lines[0].unit_price, Price::from_cents(12_000));
    assert!(store.is_favorite(&pid("scarf")).await);
}

#[tokio::test]
async fn test_cart_document_metadata() {
    let ctx = TestContext::with_session("ana").await;
    let store = ctx.state.store();
    store.add_to_cart(&product("a", 1000), 2, None).await.unwrap();
    store.add_to_cart(&product("b", 500), 3, None).await.unwrap();

    let uid = UserId::parse("ana").unwrap();
    let stored = ctx.documents.snapshot(Collection::Carts, &uid).await.unwrap();
    assert_eq!(stored["totalAmount"], "35.00");
    assert_eq!(stored["itemCount"], 2);

    let document: CartDocument = from_document(Collection::Carts, &uid, stored).unwrap();
    assert_eq!(document.user_id, uid);
    assert_eq!(document.items.len(), 2);
}

#[tokio::test]
async fn test_failed_write_keeps_change_and_notifies() {
    let mut ctx = TestContext::with_session("ana").await;
    ctx.notices();
    ctx.documents.set_offline(true);

    let err = ctx.state.store().add_to_cart(&product("a", 1000), 1, None).await.unwrap_err();

    assert!(matches!(err, StoreError::Persistence(_)));
    assert_eq!(ctx.state.store().cart_item_count().await, 1);
    let notices = ctx.notices();
    let last = notices.last().unwrap();
    assert_eq!(last.level, NoticeLevel::Error);
    assert_eq!(last.message, "Error adding to cart");

    ctx.documents.set_offline(false);
    ctx.state.store().add_to_cart(&product("b", 500), 1, None).await.unwrap();
    let uid = UserId::parse("ana").unwrap();
    let stored = ctx.documents.snapshot(Collection::Carts, &uid).await.unwrap();
    assert_eq!(stored["itemCount"], 2);
}

#[tokio::test]
async fn test_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();

    for expected_lines in [1, 2] {
        let provider = Arc::new(LocalIdentityProvider::ready());
        provider.restore_session(identity("ana")).await;
        let documents: Arc<dyn DocumentStore> = Arc::new(FileDocumentStore::new(dir.path()));
        let state = AppState::initialize(test_config(), provider, documents, Vec::new())
            .await
            .unwrap();

        let id = format!("p{expected_lines}");
        state
            .store()
            .add_to_cart(&product(&id, 100), 1, None)
            .await
            .unwrap();
        assert_eq!(state.store().cart_items().await.len(), expected_lines);
    }

    assert!(dir.path().join("carts").join("ana.json").exists());
}

// =============================================================================
// Identity Transitions
// =============================================================================

#[tokio::test]
async fn test_identity_switch_replaces_collections() {
    let ctx = TestContext::with_session("ana").await;
    let store = ctx.state.store();
    store.add_to_cart(&product("robe", 12_000), 1, None).await.unwrap();
    store.toggle_favorite(&product("scarf", 3500)).await.unwrap();

    ctx.provider.restore_session(identity("ben")).await;
    ctx.settle_on(Some("ben")).await;

    assert!(store.cart_items().await.is_empty());
    assert!(store.favorite_items().await.is_empty());
    store.add_to_cart(&product("hat", 4000), 1, None).await.unwrap();

    ctx.provider.restore_session(identity("ana")).await;
    ctx.settle_on(Some("ana")).await;

    let lines = store.cart_items().await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].product_id, pid("robe"));
    assert!(store.is_favorite(&pid("scarf")).await);
}

#[tokio::test]
async fn test_last_writer_wins_across_sessions() {
    let documents = Arc::new(MemoryDocumentStore::new());
    let first = TestContext::with_session_and_documents("ana", documents.clone()).await;
    let second = TestContext::with_session_and_documents("ana", documents.clone()).await;

    first
        .state
        .store()
        .add_to_cart(&product("a", 100), 1, None)
        .await
        .unwrap();
    second
        .state
        .store()
        .add_to_cart(&product("b", 100), 1, None)
        .await
        .unwrap();

    let uid = UserId::parse("ana").unwrap();
    let stored = documents.snapshot(Collection::Carts, &uid).await.unwrap();
    let document: CartDocument = from_document(Collection::Carts, &uid, stored).unwrap();
    assert_eq!(document.items.len(), 1);
    assert_eq!(document.items[0].product_id, pid("b"));
}
