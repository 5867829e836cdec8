//! Product snapshot carried into the cart and favorites.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use atelier_core::{Price, ProductId};

use crate::error::ValidationError;

/// The subset of a catalog product that the store persists.
///
/// Cart lines and favorites copy these fields at the time they are created,
/// so later catalog price changes do not alter what the user already chose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub image: Option<String>,
}

impl ProductSnapshot {
    /// Create a snapshot without an image.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, price: Price) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            image: None,
        }
    }

    /// Build a snapshot from unvalidated catalog fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for an empty id or a negative price.
    pub fn parse(id: &str, name: &str, price: Decimal) -> Result<Self, ValidationError> {
        Ok(Self::new(ProductId::parse(id)?, name.trim(), Price::new(price)?))
    }

    /// Attach the primary image URL.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_validates_fields() {
        let product = ProductSnapshot::parse(" robe-01 ", "Silk Robe", Decimal::new(12_000, 2));
        assert_eq!(product.map(|p| p.id.to_string()).ok(), Some("robe-01".to_string()));

        assert!(matches!(
            ProductSnapshot::parse("  ", "Nothing", Decimal::ONE),
            Err(ValidationError::ProductId(_))
        ));
        assert!(matches!(
            ProductSnapshot::parse("p1", "Refund", Decimal::NEGATIVE_ONE),
            Err(ValidationError::Price(_))
        ));
    }
}
