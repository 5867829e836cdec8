//! Account error types.

use thiserror::Error;

use atelier_core::EmailError;

use crate::documents::DocumentError;
use crate::identity::IdentityError;

/// Errors that can occur during account operations.
///
/// The `Display` text is suitable for showing in the account dialogs.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The operation needs a signed-in user.
    #[error("no user logged in")]
    NotSignedIn,

    /// The identity provider refused the operation.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Reading or writing the profile document failed.
    #[error("profile storage error: {0}")]
    Persistence(#[from] DocumentError),
}
