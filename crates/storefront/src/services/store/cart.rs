//! Cart operations.

use chrono::Utc;
use tracing::instrument;

use atelier_core::{Price, ProductId, UserId, Variant};

use super::{CartStore, Collections};
use crate::documents::{Collection, DocumentError, to_document};
use crate::error::{StoreError, ValidationError, add_breadcrumb};
use crate::models::{CartDocument, CartLineItem, ProductSnapshot};
use crate::notify::Notice;

const CART_SIGN_IN_PROMPT: &str = "Please login to add items to cart";

impl CartStore {
    /// Add `quantity` units of a product, merging with an existing line for
    /// the same `(product, variant)`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotAuthenticated`] when nobody is signed in
    /// - [`StoreError::Validation`] for a zero quantity or a line that would
    ///   overflow
    /// - [`StoreError::Persistence`] when the write failed; the line is still
    ///   in the cart
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_cart(
        &self,
        product: &ProductSnapshot,
        quantity: u32,
        variant: Option<Variant>,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock().await;
        let uid = self.require_identity(&state, Some(CART_SIGN_IN_PROMPT))?;

        self.add_line(&mut state, &uid, product, quantity, variant).await?;
        Ok(true)
    }

    /// Remove the line for `(product_id, variant)`.
    ///
    /// Returns `Ok(false)` without writing anything when no such line exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAuthenticated`] or [`StoreError::Persistence`].
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_cart(
        &self,
        product_id: &ProductId,
        variant: Option<&Variant>,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock().await;
        let uid = self.require_identity(&state, None)?;

        let Some(index) = find_line(&state, product_id, variant) else {
            return Ok(false);
        };
        self.remove_line(&mut state, &uid, index).await?;
        Ok(true)
    }

    /// Set a line's quantity. Zero or negative removes the line.
    ///
    /// Returns `Ok(false)` without writing anything when no such line exists.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotAuthenticated`] when nobody is signed in
    /// - [`StoreError::Validation`] for a quantity above `u32::MAX`
    /// - [`StoreError::Persistence`] when the write failed
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_cart_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
        variant: Option<&Variant>,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock().await;
        let uid = self.require_identity(&state, None)?;

        let quantity = if quantity <= 0 {
            None
        } else {
            Some(
                u32::try_from(quantity)
                    .map_err(|_| ValidationError::QuantityOverflow { max: u32::MAX })?,
            )
        };

        let Some(index) = find_line(&state, product_id, variant) else {
            return Ok(false);
        };
        let Some(quantity) = quantity else {
            self.remove_line(&mut state, &uid, index).await?;
            return Ok(true);
        };

        if let Some(line) = state.cart.get_mut(index) {
            line.quantity = quantity;
            line.updated_at = Some(Utc::now());
        }
        let written = self.write_cart(&state, &uid).await;
        self.finish(&state, written, None, "Error updating cart")?;
        Ok(true)
    }

    /// Empty the cart. Always writes, even when the cart is already empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAuthenticated`] or [`StoreError::Persistence`].
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<bool, StoreError> {
        let mut state = self.lock().await;
        let uid = self.require_identity(&state, None)?;

        state.cart.clear();
        add_breadcrumb("cart", "Cleared cart", None);

        let written = self.write_cart(&state, &uid).await;
        self.finish(
            &state,
            written,
            Some(Notice::info("Cart cleared")),
            "Error clearing cart",
        )?;
        Ok(true)
    }

    /// Sum of `unit_price × quantity` over all lines.
    pub async fn cart_total(&self) -> Price {
        self.lock()
            .await
            .cart
            .iter()
            .map(CartLineItem::line_total)
            .sum()
    }

    /// Sum of quantities over all lines.
    pub async fn cart_item_count(&self) -> u64 {
        self.lock()
            .await
            .cart
            .iter()
            .map(|line| u64::from(line.quantity))
            .sum()
    }

    /// Current cart lines in insertion order.
    pub async fn cart_items(&self) -> Vec<CartLineItem> {
        self.lock().await.cart.clone()
    }

    /// Upsert a line under an already-held lock.
    pub(super) async fn add_line(
        &self,
        state: &mut Collections,
        uid: &UserId,
        product: &ProductSnapshot,
        quantity: u32,
        variant: Option<Variant>,
    ) -> Result<(), StoreError> {
        if quantity == 0 {
            return Err(ValidationError::ZeroQuantity.into());
        }

        let now = Utc::now();
        let existing = state
            .cart
            .iter_mut()
            .find(|line| line.is_keyed_by(&product.id, variant.as_ref()));
        match existing {
            Some(line) => {
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or(ValidationError::QuantityOverflow { max: u32::MAX })?;
                line.updated_at = Some(now);
            }
            None => state
                .cart
                .push(CartLineItem::new(product, quantity, variant, now)),
        }
        add_breadcrumb(
            "cart",
            "Added to cart",
            Some(&[("product_id", product.id.as_str())]),
        );

        let written = self.write_cart(state, uid).await;
        self.finish(
            state,
            written,
            Some(Notice::success(format!(
                "{quantity} × {} added to cart",
                product.name
            ))),
            "Error adding to cart",
        )
    }

    async fn remove_line(
        &self,
        state: &mut Collections,
        uid: &UserId,
        index: usize,
    ) -> Result<(), StoreError> {
        let removed = state.cart.remove(index);
        add_breadcrumb(
            "cart",
            "Removed from cart",
            Some(&[("product_id", removed.product_id.as_str())]),
        );

        let written = self.write_cart(state, uid).await;
        self.finish(
            state,
            written,
            Some(Notice::info(format!("{} removed from cart", removed.name))),
            "Error removing from cart",
        )
    }

    async fn write_cart(&self, state: &Collections, uid: &UserId) -> Result<(), DocumentError> {
        let document = to_document(&CartDocument::new(
            uid.clone(),
            state.cart.clone(),
            Utc::now(),
        ))?;
        self.inner
            .documents
            .set_merge(Collection::Carts, uid, document)
            .await
    }
}

fn find_line(
    state: &Collections,
    product_id: &ProductId,
    variant: Option<&Variant>,
) -> Option<usize> {
    state
        .cart
        .iter()
        .position(|line| line.is_keyed_by(product_id, variant))
}

/// Restore the one-line-per-key invariant on loaded lines.
///
/// Lines sharing a `(product, variant)` key merge into the first one and
/// zero-quantity lines are dropped.
pub(super) fn normalize_lines(lines: Vec<CartLineItem>) -> Vec<CartLineItem> {
    let mut merged: Vec<CartLineItem> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            continue;
        }
        match merged
            .iter_mut()
            .find(|kept| kept.is_keyed_by(&line.product_id, line.variant.as_ref()))
        {
            Some(kept) => kept.quantity = kept.quantity.saturating_add(line.quantity),
            None => merged.push(line),
        }
    }
    merged
}
