//! Store error types with Sentry integration.
//!
//! Every store operation returns `Result<T, StoreError>`. Persistence failures
//! are captured to Sentry by the store before they are returned, so callers
//! only need to show the user-facing notice.

use thiserror::Error;

use atelier_core::{IdError, PriceError};

use crate::documents::DocumentError;

/// Input rejected before any state was touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Quantity must be at least 1 when adding.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// The resulting line quantity does not fit.
    #[error("quantity exceeds the maximum of {max}")]
    QuantityOverflow { max: u32 },

    /// Product id empty or too long.
    #[error("invalid product id: {0}")]
    ProductId(#[from] IdError),

    /// Negative product price.
    #[error("invalid product price: {0}")]
    Price(#[from] PriceError),
}

/// Error returned by cart and favorites operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No identity is current.
    #[error("not signed in")]
    NotAuthenticated,

    /// Input rejected.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The in-memory change was applied but could not be written.
    #[error("failed to save changes: {0}")]
    Persistence(#[from] DocumentError),
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "robe-01")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
