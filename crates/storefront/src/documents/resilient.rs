//! Timeout and bounded retry around a document store.
//!
//! The managed store gives no deadline of its own: a hung call would hold the
//! cart lock and the UI refresh indefinitely. Every call made through this
//! wrapper is bounded by `RemoteConfig::timeout`, and transient failures
//! (unavailable, timed out) are retried with exponential backoff. Permanent
//! failures are returned immediately.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use atelier_core::UserId;

use super::{Collection, Document, DocumentError, DocumentStore};
use crate::config::RemoteConfig;

/// A [`DocumentStore`] decorator adding timeouts and retries.
#[derive(Clone)]
pub struct ResilientDocumentStore {
    inner: Arc<dyn DocumentStore>,
    config: RemoteConfig,
}

impl ResilientDocumentStore {
    #[must_use]
    pub fn new(inner: Arc<dyn DocumentStore>, config: RemoteConfig) -> Self {
        Self { inner, config }
    }

    async fn call<T, F, Fut>(&self, op: &'static str, mut attempt_fn: F) -> Result<T, DocumentError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, DocumentError>> + Send,
        T: Send,
    {
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.config.timeout, attempt_fn()).await {
                Ok(result) => result,
                Err(_) => Err(DocumentError::Timeout(self.config.timeout)),
            };

            match result {
                Err(e) if e.is_transient() && self.config.retry.allows_retry(attempt) => {
                    let delay = self.config.retry.delay_after(attempt);
                    tracing::warn!(
                        op,
                        attempt,
                        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "document store call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl DocumentStore for ResilientDocumentStore {
    async fn get(
        &self,
        collection: Collection,
        key: &UserId,
    ) -> Result<Option<Document>, DocumentError> {
        self.call("get", || self.inner.get(collection, key)).await
    }

    async fn set_merge(
        &self,
        collection: Collection,
        key: &UserId,
        document: Document,
    ) -> Result<(), DocumentError> {
        self.call("set_merge", || {
            self.inner.set_merge(collection, key, document.clone())
        })
        .await
    }
}
