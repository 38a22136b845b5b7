//! Carts and cart line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use vendora_core::{CartId, CartItemId, ProductId, UserId};

/// A user's cart. One per user, created lazily, never deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A (product, quantity) line inside a cart.
///
/// Quantity is bounded to 1..=100 and only advisorily checked against stock;
/// nothing is reserved until checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

/// Read-only cart snapshot with live product data.
///
/// Line prices and totals are computed against *current* product prices at
/// read time, never frozen at add time.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartItemView>,
    /// Sum of line quantities.
    pub total_items: i32,
    /// Sum of `quantity * current unit price` over all lines.
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a cart snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct CartItemView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_price: Decimal,
    pub product_image: Option<String>,
    /// Current stock, so clients can warn before checkout.
    pub stock: i32,
    pub quantity: i32,
    pub total_price: Decimal,
}
