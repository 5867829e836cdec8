//! Session tracker.
//!
//! Bridges the identity provider's change feed into one current-identity
//! value that any number of subscribers can follow.

use tokio::task::JoinHandle;
use tracing::instrument;

use crate::config::RetryPolicy;
use crate::identity::{IdentityError, IdentityProvider, IdentityWatch};
use crate::models::Identity;

/// Current identity plus change notifications.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    changes: IdentityWatch,
}

impl SessionTracker {
    /// Attach to the provider's change feed.
    ///
    /// While the provider is still initializing, waits according to `retry`
    /// and tries again.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::ProviderUnavailable`] once the attempt budget
    /// is spent, or any other provider error immediately.
    #[instrument(skip_all, fields(max_attempts = retry.max_attempts))]
    pub async fn connect(
        provider: &dyn IdentityProvider,
        retry: &RetryPolicy,
    ) -> Result<Self, IdentityError> {
        let mut attempt = 1;
        loop {
            match provider.identity_changes() {
                Ok(changes) => {
                    tracing::info!(attempt, "attached to identity provider");
                    return Ok(Self { changes });
                }
                Err(IdentityError::ProviderUnavailable) if retry.allows_retry(attempt) => {
                    let delay = retry.delay_after(attempt);
                    tracing::debug!(
                        attempt,
                        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "identity provider not ready"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "could not attach to identity provider");
                    return Err(e);
                }
            }
        }
    }

    /// Follow identity changes.
    ///
    /// The first `changed()` on the returned receiver resolves immediately
    /// with the current identity; later ones resolve on every transition.
    #[must_use]
    pub fn subscribe(&self) -> IdentityWatch {
        let mut changes = self.changes.clone();
        changes.mark_changed();
        changes
    }

    /// The current identity, `None` while signed out.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.changes.borrow().clone()
    }

    /// Run `callback` with the current identity and again after every change.
    ///
    /// The task ends when the provider's feed closes.
    pub fn on_change<F>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(Option<Identity>) + Send + 'static,
    {
        let mut changes = self.subscribe();
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let identity = changes.borrow_and_update().clone();
                callback(identity);
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use secrecy::SecretString;
    use tokio::sync::mpsc;

    use atelier_core::Email;

    use super::*;
    use crate::identity::LocalIdentityProvider;

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::fixed(attempts, Duration::from_millis(100))
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_waits_for_provider() {
        let provider = Arc::new(LocalIdentityProvider::new());
        let ready = provider.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(350)).await;
            ready.mark_ready();
        });

        let tracker = SessionTracker::connect(provider.as_ref(), &policy(10))
            .await
            .unwrap();
        assert!(tracker.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_gives_up() {
        let provider = LocalIdentityProvider::new();
        let started = tokio::time::Instant::now();

        let err = SessionTracker::connect(&provider, &policy(3)).await.unwrap_err();

        assert!(matches!(err, IdentityError::ProviderUnavailable));
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(200) && waited < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_subscribers_see_current_then_changes() {
        let provider = LocalIdentityProvider::ready();
        let tracker = SessionTracker::connect(&provider, &RetryPolicy::NONE)
            .await
            .unwrap();

        let mut first = tracker.subscribe();
        let mut second = tracker.subscribe();
        for rx in [&mut first, &mut second] {
            rx.changed().await.unwrap();
            assert!(rx.borrow_and_update().is_none());
        }

        provider
            .sign_up(
                &Email::parse("kim@shop.example").unwrap(),
                &SecretString::from("correct horse".to_string()),
            )
            .await
            .unwrap();

        for rx in [&mut first, &mut second] {
            rx.changed().await.unwrap();
            assert!(rx.borrow_and_update().is_some());
        }
        assert!(tracker.current().is_some());
    }

    #[tokio::test]
    async fn test_on_change_callback() {
        let provider = LocalIdentityProvider::ready();
        let tracker = SessionTracker::connect(&provider, &RetryPolicy::NONE)
            .await
            .unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        tracker.on_change(move |identity| {
            let _ = tx.send(identity.map(|i| i.email.to_string()));
        });

        assert_eq!(rx.recv().await.unwrap(), None);
        provider
            .sign_up(
                &Email::parse("kim@shop.example").unwrap(),
                &SecretString::from("correct horse".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().as_deref(), Some("kim@shop.example"));
    }
}
