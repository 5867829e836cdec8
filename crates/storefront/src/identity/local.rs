//! In-process identity provider.
//!
//! Accounts live in memory and passwords are hashed with Argon2id. Outgoing
//! mail (verification, password reset) is recorded instead of sent. The
//! provider starts out "initializing" so callers exercise the same readiness
//! handling they need against a hosted service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, watch};
use tracing::instrument;
use uuid::Uuid;

use atelier_core::{Email, UserId};

use super::{IdentityError, IdentityProvider, IdentityWatch, SocialProvider};
use crate::models::Identity;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Kind of mail the provider would have sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    Verification,
    PasswordReset,
}

/// A recorded outgoing mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub to: Email,
    pub kind: MailKind,
}

struct Account {
    identity: Identity,
    // None for accounts created through a social provider.
    password_hash: Option<String>,
}

#[derive(Default)]
struct Accounts {
    by_email: HashMap<Email, Account>,
    social: HashMap<SocialProvider, Email>,
}

/// Identity provider that keeps everything in process memory.
pub struct LocalIdentityProvider {
    ready: AtomicBool,
    current: watch::Sender<Option<Identity>>,
    accounts: Mutex<Accounts>,
    outbox: Mutex<Vec<OutboundMail>>,
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdentityProvider {
    /// Create a provider that is still initializing.
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            ready: AtomicBool::new(false),
            current,
            accounts: Mutex::new(Accounts::default()),
            outbox: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that is ready immediately.
    #[must_use]
    pub fn ready() -> Self {
        let provider = Self::new();
        provider.mark_ready();
        provider
    }

    /// Finish initialization; the change feed becomes available.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    /// Restore a persisted session for `identity`, registering the account
    /// if the provider has not seen it yet.
    pub async fn restore_session(&self, identity: Identity) {
        let mut accounts = self.accounts.lock().await;
        accounts
            .by_email
            .entry(identity.email.clone())
            .or_insert_with(|| Account {
                identity: identity.clone(),
                password_hash: None,
            });
        drop(accounts);
        self.publish(Some(identity));
    }

    /// Link a social provider to an account, creating a verified account
    /// for `email` if none exists.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Provider`] if no user id could be generated.
    pub async fn link_social(
        &self,
        provider: SocialProvider,
        email: Email,
    ) -> Result<Identity, IdentityError> {
        let mut accounts = self.accounts.lock().await;
        let identity = match accounts.by_email.get(&email) {
            Some(account) => account.identity.clone(),
            None => {
                let identity = Identity::new(new_uid()?, email.clone(), true);
                accounts.by_email.insert(
                    email.clone(),
                    Account {
                        identity: identity.clone(),
                        password_hash: None,
                    },
                );
                identity
            }
        };
        accounts.social.insert(provider, email);
        Ok(identity)
    }

    /// Mark an account's email as verified, as if the user followed the link.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidCredentials`] for unknown accounts.
    pub async fn verify_email(&self, email: &Email) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .by_email
            .get_mut(email)
            .ok_or(IdentityError::InvalidCredentials)?;
        account.identity.email_verified = true;
        let updated = account.identity.clone();
        drop(accounts);
        self.replace_silently(&updated);
        Ok(())
    }

    /// Mail recorded so far.
    pub async fn sent_mail(&self) -> Vec<OutboundMail> {
        self.outbox.lock().await.clone()
    }

    fn publish(&self, identity: Option<Identity>) {
        tracing::debug!(
            uid = identity.as_ref().map(|i| i.uid.as_str()),
            "auth state changed"
        );
        self.current.send_replace(identity);
    }

    /// Update the current identity without firing an auth-state change.
    fn replace_silently(&self, updated: &Identity) {
        self.current.send_if_modified(|current| {
            if let Some(identity) = current.as_mut().filter(|i| i.uid == updated.uid) {
                *identity = updated.clone();
            }
            false
        });
    }

    async fn send_mail(&self, to: Email, kind: MailKind) {
        tracing::info!(to = %to, ?kind, "recording outbound mail");
        self.outbox.lock().await.push(OutboundMail { to, kind });
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn identity_changes(&self) -> Result<IdentityWatch, IdentityError> {
        if !self.ready.load(Ordering::SeqCst) {
            return Err(IdentityError::ProviderUnavailable);
        }
        Ok(self.current.subscribe())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        let accounts = self.accounts.lock().await;
        let account = accounts
            .by_email
            .get(email)
            .ok_or(IdentityError::InvalidCredentials)?;
        let hash = account
            .password_hash
            .as_deref()
            .ok_or(IdentityError::InvalidCredentials)?;
        verify_password(password.expose_secret(), hash)?;

        let identity = account.identity.clone();
        drop(accounts);
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        validate_password(password.expose_secret())?;

        let mut accounts = self.accounts.lock().await;
        if accounts.by_email.contains_key(email) {
            return Err(IdentityError::AccountExists);
        }
        let identity = Identity::new(new_uid()?, email.clone(), false);
        accounts.by_email.insert(
            email.clone(),
            Account {
                identity: identity.clone(),
                password_hash: Some(hash_password(password.expose_secret())?),
            },
        );
        drop(accounts);

        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.publish(None);
        Ok(())
    }

    async fn send_password_reset(&self, email: &Email) -> Result<(), IdentityError> {
        // Unknown addresses succeed silently so the form cannot probe for accounts.
        let known = self.accounts.lock().await.by_email.contains_key(email);
        if known {
            self.send_mail(email.clone(), MailKind::PasswordReset).await;
        }
        Ok(())
    }

    async fn send_email_verification(&self) -> Result<(), IdentityError> {
        let identity = self.current_identity().ok_or(IdentityError::NotSignedIn)?;
        self.send_mail(identity.email, MailKind::Verification).await;
        Ok(())
    }

    async fn sign_in_with_provider(
        &self,
        provider: SocialProvider,
    ) -> Result<Identity, IdentityError> {
        let accounts = self.accounts.lock().await;
        let identity = accounts
            .social
            .get(&provider)
            .and_then(|email| accounts.by_email.get(email))
            .map(|account| account.identity.clone())
            .ok_or(IdentityError::SocialNotLinked(provider))?;
        drop(accounts);

        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn update_display_name(&self, display_name: &str) -> Result<Identity, IdentityError> {
        let current = self.current_identity().ok_or(IdentityError::NotSignedIn)?;

        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .by_email
            .get_mut(&current.email)
            .ok_or(IdentityError::NotSignedIn)?;
        account.identity.display_name = Some(display_name.to_string());
        let updated = account.identity.clone();
        drop(accounts);

        self.replace_silently(&updated);
        Ok(updated)
    }
}

fn new_uid() -> Result<UserId, IdentityError> {
    UserId::parse(&Uuid::new_v4().simple().to_string())
        .map_err(|e| IdentityError::Provider(format!("failed to generate user id: {e}")))
}

/// Validate password strength requirements.
fn validate_password(password: &str) -> Result<(), IdentityError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(IdentityError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| IdentityError::Provider(format!("password hashing failed: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), IdentityError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| IdentityError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| IdentityError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_not_ready_until_marked() {
        let provider = LocalIdentityProvider::new();
        assert!(matches!(
            provider.identity_changes(),
            Err(IdentityError::ProviderUnavailable)
        ));
        provider.mark_ready();
        assert!(provider.identity_changes().is_ok());
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let provider = LocalIdentityProvider::ready();
        let mut changes = provider.identity_changes().unwrap();

        let created = provider
            .sign_up(&email("kim@shop.example"), &secret("correct horse"))
            .await
            .unwrap();
        assert!(!created.email_verified);
        assert!(changes.has_changed().unwrap());
        assert_eq!(changes.borrow_and_update().as_ref(), Some(&created));

        provider.sign_out().await.unwrap();
        assert!(provider.current_identity().is_none());

        let signed_in = provider
            .sign_in(&email("kim@shop.example"), &secret("correct horse"))
            .await
            .unwrap();
        assert_eq!(signed_in.uid, created.uid);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let provider = LocalIdentityProvider::ready();
        provider
            .sign_up(&email("kim@shop.example"), &secret("correct horse"))
            .await
            .unwrap();
        let err = provider
            .sign_in(&email("kim@shop.example"), &secret("battery staple"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_duplicate_and_weak_sign_up() {
        let provider = LocalIdentityProvider::ready();
        provider
            .sign_up(&email("kim@shop.example"), &secret("correct horse"))
            .await
            .unwrap();
        assert!(matches!(
            provider
                .sign_up(&email("kim@shop.example"), &secret("another pass"))
                .await,
            Err(IdentityError::AccountExists)
        ));
        assert!(matches!(
            provider.sign_up(&email("lee@shop.example"), &secret("short")).await,
            Err(IdentityError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn test_social_sign_in_requires_link() {
        let provider = LocalIdentityProvider::ready();
        assert!(matches!(
            provider.sign_in_with_provider(SocialProvider::Google).await,
            Err(IdentityError::SocialNotLinked(SocialProvider::Google))
        ));

        let linked = provider
            .link_social(SocialProvider::Google, email("g@shop.example"))
            .await
            .unwrap();
        let identity = provider
            .sign_in_with_provider(SocialProvider::Google)
            .await
            .unwrap();
        assert_eq!(identity, linked);
        assert!(identity.email_verified);
    }

    #[tokio::test]
    async fn test_display_name_update_does_not_fire_change() {
        let provider = LocalIdentityProvider::ready();
        provider
            .sign_up(&email("kim@shop.example"), &secret("correct horse"))
            .await
            .unwrap();
        let mut changes = provider.identity_changes().unwrap();
        changes.borrow_and_update();

        let updated = provider.update_display_name("Kim").await.unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Kim"));
        assert!(!changes.has_changed().unwrap());
        assert_eq!(
            provider.current_identity().unwrap().display_name.as_deref(),
            Some("Kim")
        );
    }

    #[tokio::test]
    async fn test_mail_is_recorded() {
        let provider = LocalIdentityProvider::ready();
        provider
            .sign_up(&email("kim@shop.example"), &secret("correct horse"))
            .await
            .unwrap();
        provider.send_email_verification().await.unwrap();
        provider
            .send_password_reset(&email("kim@shop.example"))
            .await
            .unwrap();
        provider
            .send_password_reset(&email("nobody@shop.example"))
            .await
            .unwrap();

        let kinds: Vec<MailKind> = provider.sent_mail().await.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MailKind::Verification, MailKind::PasswordReset]);
    }
}
