//! Product variant selection.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Error returned when a variant label is blank.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("variant label cannot be blank")]
pub struct VariantError;

/// A product selection discriminator, such as a size label.
///
/// A variant participates in the cart line identity: the same product in two
/// sizes occupies two lines. Blank selections are not variants, so callers
/// should go through [`Variant::from_selection`] when handling raw input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Variant(String);

impl Variant {
    /// Normalize a raw selection into an optional variant.
    ///
    /// Surrounding whitespace is trimmed; an empty selection means "no variant".
    #[must_use]
    pub fn from_selection(selection: Option<&str>) -> Option<Self> {
        selection
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Self(s.to_owned()))
    }

    /// Deserialize an optional selection, treating blank labels as absent.
    ///
    /// For use with `#[serde(deserialize_with = "...")]` on `Option<Variant>`
    /// fields, so stored documents normalize the same way as raw input.
    ///
    /// # Errors
    ///
    /// Returns the deserializer's error when the value is neither null nor a
    /// string.
    pub fn deserialize_selection<'de, D>(deserializer: D) -> Result<Option<Self>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let selection: Option<String> = Option::deserialize(deserializer)?;
        Ok(Self::from_selection(selection.as_deref()))
    }

    /// Returns the variant label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Variant {
    type Error = VariantError;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        Self::from_selection(Some(&label)).ok_or(VariantError)
    }
}

impl From<Variant> for String {
    fn from(variant: Variant) -> Self {
        variant.0
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
