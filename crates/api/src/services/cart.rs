//! Cart aggregate.
//!
//! One mutable cart per user, created lazily. Stock checks here are
//! advisory only: they stop obvious over-adds at write time but reserve
//! nothing. The authoritative check happens inside
//! [`Store::place_order`](crate::store::Store::place_order) at checkout, so
//! a cart may legitimately hold more of a product than is in stock by the
//! time the user checks out.

use std::sync::Arc;

use rust_decimal::Decimal;

use vendora_core::{CartItemId, ProductId, UserId};

use crate::error::{AppError, Result};
use crate::models::{Cart, CartItem, CartItemView, CartView};
use crate::store::Store;

/// Quantity bounds for a single cart line.
const MAX_LINE_QUANTITY: i32 = 100;

/// Cart workflow.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
}

impl CartService {
    /// Create the service over an injected store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The user's cart, created empty on first access.
    pub async fn get_or_create(&self, user: UserId) -> Result<Cart> {
        Ok(self.store.get_or_create_cart(user).await?)
    }

    /// Add `quantity` of a product, merging with an existing line.
    ///
    /// Fails with `NotFound` if the product is missing, `InvalidInput` if
    /// the quantity (or the merged line) leaves 1..=100, and
    /// `InsufficientStock` if the requested or cumulative quantity exceeds
    /// the product's current stock.
    pub async fn add_item(
        &self,
        user: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<CartItem> {
        validate_quantity(quantity)?;

        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {product_id} not found")))?;

        if product.stock < quantity {
            return Err(AppError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested: quantity,
            });
        }

        let cart = self.store.get_or_create_cart(user).await?;
        let items = self.store.cart_items(cart.id).await?;

        if let Some(existing) = items.into_iter().find(|i| i.product_id == product_id) {
            let merged = existing.quantity + quantity;
            if merged > MAX_LINE_QUANTITY {
                return Err(AppError::InvalidInput(format!(
                    "line quantity {merged} exceeds the maximum of {MAX_LINE_QUANTITY}"
                )));
            }
            if merged > product.stock {
                return Err(AppError::InsufficientStock {
                    product: product.name,
                    available: product.stock,
                    requested: merged,
                });
            }
            self.store
                .set_cart_item_quantity(cart.id, existing.id, merged)
                .await?;
            return Ok(CartItem {
                quantity: merged,
                ..existing
            });
        }

        Ok(self
            .store
            .insert_cart_item(cart.id, product_id, quantity)
            .await?)
    }

    /// Overwrite a line's quantity.
    ///
    /// Returns `false` (no error) when the line is not in the user's cart
    /// or the product's stock no longer covers the quantity.
    pub async fn update_item_quantity(
        &self,
        user: UserId,
        item: CartItemId,
        quantity: i32,
    ) -> Result<bool> {
        validate_quantity(quantity)?;

        let cart = self.store.get_or_create_cart(user).await?;
        let items = self.store.cart_items(cart.id).await?;
        let Some(line) = items.into_iter().find(|i| i.id == item) else {
            return Ok(false);
        };

        let product = self.store.product(line.product_id).await?;
        let stock_covers = product.is_some_and(|p| p.stock >= quantity);
        if !stock_covers {
            return Ok(false);
        }

        Ok(self
            .store
            .set_cart_item_quantity(cart.id, item, quantity)
            .await?)
    }

    /// Remove a line. Returns `false` if it wasn't in the user's cart.
    pub async fn remove_item(&self, user: UserId, item: CartItemId) -> Result<bool> {
        let cart = self.store.get_or_create_cart(user).await?;
        Ok(self.store.remove_cart_item(cart.id, item).await?)
    }

    /// Remove every line. Idempotent.
    pub async fn clear(&self, user: UserId) -> Result<()> {
        let cart = self.store.get_or_create_cart(user).await?;
        Ok(self.store.clear_cart(cart.id).await?)
    }

    /// Read-only snapshot with live product data and cart totals.
    ///
    /// Lines whose product has since been deleted are omitted.
    pub async fn snapshot(&self, user: UserId) -> Result<CartView> {
        let cart = self.store.get_or_create_cart(user).await?;
        let items = self.store.cart_items(cart.id).await?;

        let mut views = Vec::with_capacity(items.len());
        let mut total_items = 0;
        let mut total_amount = Decimal::ZERO;

        for item in items {
            let Some(product) = self.store.product(item.product_id).await? else {
                continue;
            };
            let line_total = Decimal::from(item.quantity) * product.price;
            total_items += item.quantity;
            total_amount += line_total;
            views.push(CartItemView {
                id: item.id,
                product_id: product.id,
                product_name: product.name,
                product_price: product.price,
                product_image: product.image_url,
                stock: product.stock,
                quantity: item.quantity,
                total_price: line_total,
            });
        }

        Ok(CartView {
            id: cart.id,
            user_id: cart.user_id,
            items: views,
            total_items,
            total_amount,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        })
    }

    /// Total quantity across all lines.
    pub async fn item_count(&self, user: UserId) -> Result<i32> {
        let cart = self.store.get_or_create_cart(user).await?;
        let items = self.store.cart_items(cart.id).await?;
        Ok(items.iter().map(|i| i.quantity).sum())
    }
}

fn validate_quantity(quantity: i32) -> Result<()> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(AppError::InvalidInput(format!(
            "quantity must be between 1 and {MAX_LINE_QUANTITY}, got {quantity}"
        )));
    }
    Ok(())
}
