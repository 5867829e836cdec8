//! Newtype IDs for type-safe entity references.
//!
//! Identifiers in Atelier are opaque strings handed out by external systems
//! (the catalog for products, the identity provider for users). Use the
//! `define_id!` macro to create wrappers that prevent mixing them up.

/// Errors that can occur when parsing an identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input is empty or whitespace only.
    #[error("{kind} cannot be empty")]
    Empty {
        /// Name of the identifier type.
        kind: &'static str,
    },
    /// The input is longer than the allowed maximum.
    #[error("{kind} must be at most {max} characters")]
    TooLong {
        /// Name of the identifier type.
        kind: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
}

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - A validating `parse()` constructor and `as_str()` accessor
/// - `Display`, `FromStr` and `AsRef<str>` implementations
///
/// # Example
///
/// ```rust
/// # use atelier_core::define_id;
/// define_id!(OrderId);
/// define_id!(ReturnId);
///
/// let order_id = OrderId::parse("ord-1").unwrap();
/// assert_eq!(order_id.as_str(), "ord-1");
///
/// // These are different types, so this won't compile:
/// // let _: ReturnId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Maximum identifier length.
            pub const MAX_LENGTH: usize = 128;

            /// Parse an identifier, trimming surrounding whitespace.
            ///
            /// # Errors
            ///
            /// Returns an error if the trimmed input is empty or longer than
            /// [`Self::MAX_LENGTH`].
            pub fn parse(s: &str) -> ::core::result::Result<Self, $crate::types::id::IdError> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err($crate::types::id::IdError::Empty {
                        kind: stringify!($name),
                    });
                }
                if trimmed.len() > Self::MAX_LENGTH {
                    return Err($crate::types::id::IdError::TooLong {
                        kind: stringify!($name),
                        max: Self::MAX_LENGTH,
                    });
                }
                Ok(Self(trimmed.to_owned()))
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the identifier and return its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Catalog product identifier (stable across catalog refreshes).
define_id!(ProductId);
// Identity provider user identifier; documents are keyed by it.
define_id!(UserId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_whitespace() {
        let id = ProductId::parse("  sku-42 ").unwrap();
        assert_eq!(id.as_str(), "sku-42");
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert_eq!(
            ProductId::parse("   "),
            Err(IdError::Empty { kind: "ProductId" })
        );
        assert!(matches!(UserId::parse(""), Err(IdError::Empty { .. })));
    }

    #[test]
    fn test_parse_rejects_overlong() {
        let long = "x".repeat(UserId::MAX_LENGTH + 1);
        assert!(matches!(
            UserId::parse(&long),
            Err(IdError::TooLong { max: 128, .. })
        ));
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = ProductId::parse("7").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"7\"");
        let back: ProductId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_error_message_names_kind() {
        let err = UserId::parse("").unwrap_err();
        assert_eq!(err.to_string(), "UserId cannot be empty");
    }
}
