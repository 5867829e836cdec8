//! Cart line items and the persisted cart document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atelier_core::{Price, ProductId, UserId, Variant};

use super::ProductSnapshot;

/// One cart entry, identified by product and optional variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: ProductId,
    #[serde(
        default,
        alias = "selectedSize",
        deserialize_with = "Variant::deserialize_selection"
    )]
    pub variant: Option<Variant>,
    /// Always at least 1; a line that would reach 0 is removed instead.
    pub quantity: u32,
    /// Price per unit, captured when the line was created.
    #[serde(alias = "price")]
    pub unit_price: Price,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartLineItem {
    /// Create a new line from a product snapshot.
    #[must_use]
    pub fn new(
        product: &ProductSnapshot,
        quantity: u32,
        variant: Option<Variant>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id: product.id.clone(),
            variant,
            quantity,
            unit_price: product.price,
            name: product.name.clone(),
            image: product.image.clone(),
            added_at: now,
            updated_at: None,
        }
    }

    /// Whether this line has the given `(product, variant)` identity.
    #[must_use]
    pub fn is_keyed_by(&self, product_id: &ProductId, variant: Option<&Variant>) -> bool {
        self.product_id == *product_id && self.variant.as_ref() == variant
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// Document stored under `carts/{uid}`.
///
/// `item_count` is the number of lines (not units) and `total_amount` the
/// cart total at write time; both are informational for back-office readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDocument {
    pub user_id: UserId,
    #[serde(default)]
    pub items: Vec<CartLineItem>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub item_count: usize,
    #[serde(default)]
    pub total_amount: Price,
}

impl CartDocument {
    /// Build the full document for the given lines.
    #[must_use]
    pub fn new(user_id: UserId, items: Vec<CartLineItem>, now: DateTime<Utc>) -> Self {
        let total_amount = items.iter().map(CartLineItem::line_total).sum();
        Self {
            user_id,
            item_count: items.len(),
            items,
            updated_at: now,
            total_amount,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, cents: u32) -> ProductSnapshot {
        ProductSnapshot::new(ProductId::parse(id).unwrap(), "Silk Robe", Price::from_cents(cents))
    }

    #[test]
    fn test_key_includes_variant() {
        let now = Utc::now();
        let medium = Variant::from_selection(Some("M"));
        let line = CartLineItem::new(&product("p1", 1000), 1, medium.clone(), now);

        let p1 = ProductId::parse("p1").unwrap();
        assert!(line.is_keyed_by(&p1, medium.as_ref()));
        assert!(!line.is_keyed_by(&p1, None));
        assert!(!line.is_keyed_by(&p1, Variant::from_selection(Some("L")).as_ref()));
    }

    #[test]
    fn test_document_metadata() {
        let now = Utc::now();
        let items = vec![
            CartLineItem::new(&product("p1", 1000), 2, None, now),
            CartLineItem::new(&product("p2", 500), 3, None, now),
        ];
        let doc = CartDocument::new(UserId::parse("u1").unwrap(), items, now);
        assert_eq!(doc.item_count, 2);
        assert_eq!(doc.total_amount, Price::from_cents(3500));
    }

    #[test]
    fn test_serialized_field_names() {
        let line = CartLineItem::new(&product("p1", 1000), 1, None, Utc::now());
        let value = serde_json::to_value(&line).unwrap();
        assert_eq!(value["productId"], "p1");
        assert_eq!(value["unitPrice"], "10.00");
        assert!(value["variant"].is_null());
    }

    #[test]
    fn test_reads_web_client_line() {
        let line: CartLineItem = serde_json::from_value(serde_json::json!({
            "productId": "robe",
            "name": "Silk Robe",
            "price": 120,
            "quantity": 2,
            "selectedSize": "M",
            "image": "",
            "addedAt": "2026-01-01T00:00:00Z",
            "productData": {"id": "robe"}
        }))
        .unwrap();

        assert_eq!(line.unit_price, Price::from_cents(12_000));
        assert_eq!(line.variant, Variant::from_selection(Some("M")));
        assert_eq!(line.quantity, 2);
    }
}
