//! Authenticated identity.

use serde::{Deserialize, Serialize};

use atelier_core::{Email, UserId};

/// The signed-in user as reported by the identity provider.
///
/// The session tracker holds the current value and replaces it wholesale on
/// every auth-state transition; nothing updates an identity in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Provider-assigned unique identifier. Documents are keyed by it.
    pub uid: UserId,
    /// Primary email address.
    pub email: Email,
    /// Whether the email address has been verified.
    pub email_verified: bool,
    /// Display name, if the user set one.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Identity {
    /// Create an identity with no display name.
    #[must_use]
    pub const fn new(uid: UserId, email: Email, email_verified: bool) -> Self {
        Self {
            uid,
            email,
            email_verified,
            display_name: None,
        }
    }

    /// Character shown in the avatar badge.
    #[must_use]
    pub fn avatar_initial(&self) -> char {
        self.display_name
            .as_deref()
            .and_then(|name| name.trim().chars().next())
            .map_or_else(|| self.email.initial(), |c| c.to_ascii_uppercase())
    }
}
