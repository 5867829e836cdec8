//! Remote document store capability.
//!
//! The storefront persists per-user documents in a managed key-value store
//! with "set with merge" semantics. This module defines that capability and
//! the adapters used in this workspace:
//!
//! - [`MemoryDocumentStore`] - in-process store for tests and demos
//! - [`FileDocumentStore`] - one JSON file per document, used by the CLI
//! - [`ResilientDocumentStore`] - wraps any store with a timeout and bounded
//!   retry for transient failures
//!
//! # Merge semantics
//!
//! `set_merge` replaces the top-level fields present in the written document
//! and keeps any other fields already stored. The store writes whole
//! collections on every mutation, so in practice each write replaces the
//! `items` array wholesale.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

use atelier_core::UserId;

mod file;
mod memory;
mod resilient;

pub use file::FileDocumentStore;
pub use memory::MemoryDocumentStore;
pub use resilient::ResilientDocumentStore;

/// A stored document: a JSON object.
pub type Document = Map<String, Value>;

/// Logical collections in the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Carts,
    Favorites,
    Users,
}

impl Collection {
    /// Collection name as used by the backing store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Carts => "carts",
            Self::Favorites => "favorites",
            Self::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by document store operations.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The store is unreachable or not initialized.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// A single call exceeded the configured timeout.
    #[error("document store call timed out after {0:?}")]
    Timeout(Duration),

    /// The store refused the operation (permissions, quota, validation).
    #[error("document store rejected the request: {0}")]
    Rejected(String),

    /// A stored document does not have the expected shape.
    #[error("malformed document {collection}/{key}: {source}")]
    Malformed {
        collection: Collection,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be encoded as a document.
    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),

    /// Local file I/O failed.
    #[error("document I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocumentError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// Remote key-value document store.
///
/// Implementations must be safe to share across tasks; the storefront holds
/// them as `Arc<dyn DocumentStore>`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, or `None` if it does not exist.
    async fn get(
        &self,
        collection: Collection,
        key: &UserId,
    ) -> Result<Option<Document>, DocumentError>;

    /// Write a document, merging its top-level fields into any stored copy.
    async fn set_merge(
        &self,
        collection: Collection,
        key: &UserId,
        document: Document,
    ) -> Result<(), DocumentError>;
}

/// Apply set-with-merge semantics in place.
pub(crate) fn merge_into(stored: &mut Document, update: Document) {
    for (field, value) in update {
        stored.insert(field, value);
    }
}

/// Encode a typed value as a document.
///
/// # Errors
///
/// Returns [`DocumentError::Encode`] if the value does not serialize to a
/// JSON object.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, DocumentError> {
    match serde_json::to_value(value).map_err(DocumentError::Encode)? {
        Value::Object(map) => Ok(map),
        other => Err(DocumentError::Encode(serde::ser::Error::custom(format!(
            "expected an object, got {other}"
        )))),
    }
}

/// Decode a stored document into a typed value.
///
/// # Errors
///
/// Returns [`DocumentError::Malformed`] if the document has the wrong shape.
pub fn from_document<T: DeserializeOwned>(
    collection: Collection,
    key: &UserId,
    document: Document,
) -> Result<T, DocumentError> {
    serde_json::from_value(Value::Object(document)).map_err(|source| DocumentError::Malformed {
        collection,
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_merge_replaces_top_level_fields_only() {
        let mut stored = to_document(&json!({"items": [1, 2], "owner": "a"})).unwrap();
        let update = to_document(&json!({"items": [3]})).unwrap();
        merge_into(&mut stored, update);
        assert_eq!(Value::Object(stored), json!({"items": [3], "owner": "a"}));
    }

    #[test]
    fn test_to_document_rejects_non_objects() {
        assert!(matches!(to_document(&[1, 2]), Err(DocumentError::Encode(_))));
    }

    #[test]
    fn test_transient_classification() {
        assert!(DocumentError::Unavailable("offline".into()).is_transient());
        assert!(DocumentError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!DocumentError::Rejected("denied".into()).is_transient());
    }

    #[test]
    fn test_malformed_names_document() {
        let key = UserId::parse("u1").unwrap();
        let doc = to_document(&json!({"items": "nope"})).unwrap();
        let err = from_document::<Vec<u32>>(Collection::Carts, &key, doc).unwrap_err();
        assert!(err.to_string().starts_with("malformed document carts/u1"));
    }
}
