//! Login profile sync.
//!
//! Every time an identity becomes current, the user's profile document is
//! refreshed with the fields the identity provider owns (email, display
//! name, verification flag) and the login time.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use crate::documents::{Collection, DocumentError, DocumentStore, to_document};
use crate::identity::IdentityWatch;
use crate::models::{Identity, LoginProfile};

/// Writes login profiles to the `users` collection.
#[derive(Clone)]
pub struct ProfileSync {
    documents: Arc<dyn DocumentStore>,
}

impl ProfileSync {
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// Merge the login fields for `identity` into its profile.
    ///
    /// # Errors
    ///
    /// Returns the document store error if the write fails.
    #[instrument(skip_all, fields(uid = %identity.uid))]
    pub async fn record_login(&self, identity: &Identity) -> Result<(), DocumentError> {
        let profile = LoginProfile::from_identity(identity, Utc::now());
        self.documents
            .set_merge(Collection::Users, &identity.uid, to_document(&profile)?)
            .await
    }

    /// Record a login for every identity published on `changes` until the
    /// feed closes. Failures are logged and skipped.
    pub async fn follow(self, mut changes: IdentityWatch) {
        while changes.changed().await.is_ok() {
            let identity = changes.borrow_and_update().clone();
            if let Some(identity) = identity {
                if let Err(e) = self.record_login(&identity).await {
                    tracing::warn!(uid = %identity.uid, error = %e, "failed to record login");
                }
            }
        }
    }
}
