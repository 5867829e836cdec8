//! Account service.
//!
//! Sign-up, sign-in and profile management on top of the identity provider,
//! with profile documents kept in the `users` collection.

mod error;

pub use error::AccountError;

use std::sync::Arc;

use chrono::Utc;
use secrecy::SecretString;
use tracing::instrument;

use atelier_core::{Email, UserId};

use crate::documents::{Collection, Document, DocumentStore, from_document, to_document};
use crate::error::{add_breadcrumb, clear_sentry_user};
use crate::identity::{IdentityProvider, SocialProvider};
use crate::models::{Identity, ProfileUpdate, SignUpProfile, UserProfile};

/// Message shown when a sign-in needs email verification first.
pub const VERIFY_EMAIL_MESSAGE: &str =
    "Please verify your email address. A new verification link has been sent.";

/// Result of a successful email/password sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOutcome {
    pub identity: Identity,
    /// The email is unverified; a new verification link was sent.
    pub requires_verification: bool,
}

impl SignInOutcome {
    /// Message to show alongside the outcome, if any.
    #[must_use]
    pub const fn message(&self) -> Option<&'static str> {
        if self.requires_verification {
            Some(VERIFY_EMAIL_MESSAGE)
        } else {
            None
        }
    }
}

/// Account operations for the sign-in and profile dialogs.
#[derive(Clone)]
pub struct AccountService {
    provider: Arc<dyn IdentityProvider>,
    documents: Arc<dyn DocumentStore>,
}

impl AccountService {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            provider,
            documents,
        }
    }

    // =========================================================================
    // Sign-up / sign-in
    // =========================================================================

    /// Create an account, store its profile and send a verification link.
    ///
    /// `extra` fields are stored on the profile after the defaults and may
    /// override them. A failed profile write or verification mail is logged;
    /// the account exists either way.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidEmail` if the email format is invalid,
    /// or `AccountError::Identity` if the provider refuses the account.
    #[instrument(skip(self, password, extra))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        display_name: Option<String>,
        extra: Document,
    ) -> Result<Identity, AccountError> {
        let email = Email::parse(email)?;
        let identity = self.provider.sign_up(&email, password).await?;

        let profile = SignUpProfile::new(email, display_name, extra, Utc::now());
        let written = match to_document(&profile) {
            Ok(document) => {
                self.documents
                    .set_merge(Collection::Users, &identity.uid, document)
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::warn!(uid = %identity.uid, error = %e, "failed to store new profile");
        }

        if let Err(e) = self.provider.send_email_verification().await {
            tracing::warn!(uid = %identity.uid, error = %e, "failed to send verification email");
        }

        add_breadcrumb("auth", "Signed up", None);
        tracing::info!(uid = %identity.uid, "account created");
        Ok(identity)
    }

    /// Sign in with email and password.
    ///
    /// An unverified account still signs in, but the outcome asks for
    /// verification and a new link is sent.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidEmail` if the email format is invalid,
    /// or `AccountError::Identity` for wrong credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<SignInOutcome, AccountError> {
        let email = Email::parse(email)?;
        let identity = self.provider.sign_in(&email, password).await?;

        let requires_verification = !identity.email_verified;
        if requires_verification {
            self.provider.send_email_verification().await?;
        }

        add_breadcrumb("auth", "Signed in", None);
        Ok(SignInOutcome {
            identity,
            requires_verification,
        })
    }

    /// Sign in through Google or Facebook.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Identity` if the provider refuses.
    #[instrument(skip(self))]
    pub async fn sign_in_with(&self, provider: SocialProvider) -> Result<Identity, AccountError> {
        let identity = self.provider.sign_in_with_provider(provider).await?;
        add_breadcrumb("auth", "Signed in", Some(&[("provider", provider.as_str())]));
        Ok(identity)
    }

    /// Sign the current user out.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Identity` if the provider fails.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AccountError> {
        self.provider.sign_out().await?;
        clear_sentry_user();
        add_breadcrumb("auth", "Signed out", None);
        Ok(())
    }

    /// Send a password reset link.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidEmail` if the email format is invalid.
    #[instrument(skip(self))]
    pub async fn reset_password(&self, email: &str) -> Result<(), AccountError> {
        let email = Email::parse(email)?;
        self.provider.send_password_reset(&email).await?;
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Read a stored profile, `None` if the user has none.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Persistence` if the document cannot be read or
    /// has the wrong shape.
    #[instrument(skip(self), fields(uid = %uid))]
    pub async fn get_profile(&self, uid: &UserId) -> Result<Option<UserProfile>, AccountError> {
        let Some(document) = self.documents.get(Collection::Users, uid).await? else {
            return Ok(None);
        };
        Ok(Some(from_document(Collection::Users, uid, document)?))
    }

    /// Update the signed-in user's profile.
    ///
    /// A non-empty display name is also pushed to the identity provider.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotSignedIn` without a current user, or the
    /// provider or storage failure.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<(), AccountError> {
        let identity = self
            .provider
            .current_identity()
            .ok_or(AccountError::NotSignedIn)?;

        if let Some(name) = update.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            self.provider.update_display_name(name).await?;
        }

        self.documents
            .set_merge(Collection::Users, &identity.uid, to_document(&update)?)
            .await?;
        tracing::info!(uid = %identity.uid, "profile updated");
        Ok(())
    }
}
