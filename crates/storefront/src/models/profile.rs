//! User profile documents stored under `users/{uid}`.
//!
//! Profiles are written with set-with-merge from several places (sign-up,
//! every sign-in, explicit profile edits), so each writer has its own view
//! containing only the fields it owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::Email;

use crate::documents::Document;

use super::Identity;

/// Theme assigned to new accounts.
pub const DEFAULT_THEME: &str = "luxurious";

/// Fields written once when an account is created.
///
/// `extra` holds caller-supplied fields; they are flattened after the
/// defaults, so a caller may override e.g. `themePreference`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpProfile {
    pub email: Email,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub theme_preference: String,
    pub age_verified: bool,
    #[serde(flatten)]
    pub extra: Document,
}

impl SignUpProfile {
    #[must_use]
    pub fn new(
        email: Email,
        display_name: Option<String>,
        extra: Document,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            email,
            display_name: display_name.unwrap_or_default(),
            created_at: now,
            theme_preference: DEFAULT_THEME.to_string(),
            age_verified: false,
            extra,
        }
    }
}

/// Fields refreshed on every identity-present transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginProfile {
    pub email: Email,
    pub display_name: String,
    pub email_verified: bool,
    pub last_login: DateTime<Utc>,
}

impl LoginProfile {
    #[must_use]
    pub fn from_identity(identity: &Identity, now: DateTime<Utc>) -> Self {
        Self {
            email: identity.email.clone(),
            display_name: identity.display_name.clone().unwrap_or_default(),
            email_verified: identity.email_verified,
            last_login: now,
        }
    }
}

/// A profile edit requested by the signed-in user.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_preference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_verified: Option<bool>,
    #[serde(flatten)]
    pub extra: Document,
}

/// A profile as read back from the document store.
///
/// Every field is optional because the document is assembled from several
/// partial writes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub email: Option<Email>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub theme_preference: Option<String>,
    #[serde(default)]
    pub age_verified: Option<bool>,
    /// Any other fields stored on the profile.
    #[serde(flatten)]
    pub extra: Document,
}
