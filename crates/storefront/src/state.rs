//! Application state shared across the storefront.

use std::sync::Arc;

use tokio::task::AbortHandle;

use crate::config::StoreConfig;
use crate::documents::{DocumentStore, ResilientDocumentStore};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::identity::{IdentityError, IdentityProvider};
use crate::notify::StoreObserver;
use crate::services::{AccountService, CartStore, ProfileSync, SessionTracker};

/// Error initializing the application state.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("identity provider unavailable: {0}")]
    Identity(#[from] IdentityError),
}

/// Application state shared across all callers.
///
/// This struct is cheaply cloneable via `Arc` and wires the session tracker,
/// the cart store and the account service to the same identity provider and
/// document store. Background tasks stop when the last clone is dropped.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StoreConfig,
    provider: Arc<dyn IdentityProvider>,
    documents: Arc<dyn DocumentStore>,
    tracker: SessionTracker,
    store: CartStore,
    accounts: AccountService,
    tasks: Vec<AbortHandle>,
}

impl Drop for AppStateInner {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl AppState {
    /// Connect to the identity provider and load the current user's data.
    ///
    /// Document store calls are wrapped with the timeout and retry from
    /// `config.remote`. Returns once the initial identity has been applied
    /// to the store and its login recorded; later identity changes are
    /// applied in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity provider does not become ready
    /// within `config.provider_retry`.
    pub async fn initialize(
        config: StoreConfig,
        provider: Arc<dyn IdentityProvider>,
        documents: Arc<dyn DocumentStore>,
        observers: Vec<Arc<dyn StoreObserver>>,
    ) -> Result<Self, InitError> {
        let documents: Arc<dyn DocumentStore> =
            Arc::new(ResilientDocumentStore::new(documents, config.remote));
        let tracker = SessionTracker::connect(provider.as_ref(), &config.provider_retry).await?;

        let store = CartStore::new(documents.clone(), observers);
        let mut changes = tracker.subscribe();
        let initial = changes.borrow_and_update().clone();
        store.on_identity_changed(initial).await;

        let profiles = ProfileSync::new(documents.clone());
        let mut logins = tracker.subscribe();
        if let Some(identity) = logins.borrow_and_update().clone() {
            if let Err(e) = profiles.record_login(&identity).await {
                tracing::warn!(uid = %identity.uid, error = %e, "failed to record login");
            }
        }

        let tasks = vec![
            tokio::spawn(store.clone().follow(changes)).abort_handle(),
            tokio::spawn(profiles.follow(logins)).abort_handle(),
            tracker
                .on_change(|identity| match identity {
                    Some(identity) => set_sentry_user(&identity.uid, Some(identity.email.as_str())),
                    None => clear_sentry_user(),
                })
                .abort_handle(),
        ];

        let accounts = AccountService::new(provider.clone(), documents.clone());
        tracing::info!(
            signed_in = tracker.current().is_some(),
            "storefront state initialized"
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                provider,
                documents,
                tracker,
                store,
                accounts,
                tasks,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Get a reference to the identity provider.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.inner.provider
    }

    /// Get a reference to the (resilient) document store.
    #[must_use]
    pub fn documents(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.documents
    }

    /// Get a reference to the session tracker.
    #[must_use]
    pub fn tracker(&self) -> &SessionTracker {
        &self.inner.tracker
    }

    /// Get a reference to the cart and favorites store.
    #[must_use]
    pub fn store(&self) -> &CartStore {
        &self.inner.store
    }

    /// Get a reference to the account service.
    #[must_use]
    pub fn accounts(&self) -> &AccountService {
        &self.inner.accounts
    }
}
