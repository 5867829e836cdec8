//! Identity provider capability.
//!
//! Sign-up, sign-in and session persistence belong to an external identity
//! service. The storefront only consumes it through [`IdentityProvider`]:
//! a change feed of the current identity plus the account operations the
//! sign-in dialogs need.
//!
//! [`LocalIdentityProvider`] is an in-process implementation used by the CLI
//! and the test suites.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::watch;

use atelier_core::{Email, EmailError};

use crate::models::Identity;

mod local;

pub use local::{LocalIdentityProvider, MailKind, OutboundMail};

/// Receiver side of the identity change feed.
///
/// Holds `None` while signed out.
pub type IdentityWatch = watch::Receiver<Option<Identity>>;

/// Third-party sign-in providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocialProvider {
    Google,
    Facebook,
}

impl SocialProvider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
        }
    }
}

impl fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocialProvider {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "facebook" => Ok(Self::Facebook),
            other => Err(IdentityError::Provider(format!(
                "unknown sign-in provider: {other}"
            ))),
        }
    }
}

/// Errors reported by the identity provider.
///
/// The `Display` text is what the sign-in dialogs show to the user.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider has not finished initializing.
    #[error("identity provider is not ready")]
    ProviderUnavailable,

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Wrong password or unknown account.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// An account already exists for this email.
    #[error("an account with this email already exists")]
    AccountExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The operation needs a signed-in user.
    #[error("no user is signed in")]
    NotSignedIn,

    /// No account is linked to this social provider.
    #[error("{0} sign-in is not linked to an account")]
    SocialNotLinked(SocialProvider),

    /// Any other provider failure, with the provider's message.
    #[error("{0}")]
    Provider(String),
}

/// External identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Attach to the identity change feed.
    ///
    /// The receiver yields the current identity immediately and every change
    /// after that.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::ProviderUnavailable`] until the provider has
    /// finished initializing.
    fn identity_changes(&self) -> Result<IdentityWatch, IdentityError>;

    /// The currently signed-in identity.
    fn current_identity(&self) -> Option<Identity>;

    /// Sign in with email and password.
    async fn sign_in(&self, email: &Email, password: &SecretString)
    -> Result<Identity, IdentityError>;

    /// Create an account and sign it in.
    async fn sign_up(&self, email: &Email, password: &SecretString)
    -> Result<Identity, IdentityError>;

    /// Sign the current user out.
    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Email a password reset link.
    async fn send_password_reset(&self, email: &Email) -> Result<(), IdentityError>;

    /// Email a verification link to the current user.
    async fn send_email_verification(&self) -> Result<(), IdentityError>;

    /// Sign in through a third-party provider.
    async fn sign_in_with_provider(
        &self,
        provider: SocialProvider,
    ) -> Result<Identity, IdentityError>;

    /// Change the current user's display name.
    async fn update_display_name(&self, display_name: &str) -> Result<Identity, IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_social_provider_parse() {
        assert_eq!(
            "Google".parse::<SocialProvider>().ok(),
            Some(SocialProvider::Google)
        );
        assert_eq!(
            " facebook ".parse::<SocialProvider>().ok(),
            Some(SocialProvider::Facebook)
        );
        assert!("myspace".parse::<SocialProvider>().is_err());
    }

    #[test]
    fn test_error_messages_are_user_facing() {
        assert_eq!(
            IdentityError::InvalidCredentials.to_string(),
            "invalid email or password"
        );
        assert_eq!(
            IdentityError::SocialNotLinked(SocialProvider::Facebook).to_string(),
            "facebook sign-in is not linked to an account"
        );
    }
}
