//! Persistence seam.
//!
//! The [`Store`] trait is the only way workflows touch persistent state.
//! Two implementations are provided:
//!
//! - [`MemoryStore`] - hash maps behind a single lock; used by tests and as
//!   the default backend when no database is configured.
//! - [`PgStore`] - `PostgreSQL` via sqlx; migrations live under
//!   `crates/api/migrations` and are run by `vendora-cli migrate`.
//!
//! The trait is coarse-grained on purpose: the two operations with a
//! multi-row atomicity requirement (`place_order`, `cancel_order_and_restock`)
//! are single methods so each backend can provide all-or-nothing semantics
//! with its own primitive (a transaction with row locks, or one write-lock
//! critical section).

use async_trait::async_trait;
use thiserror::Error;

use vendora_core::{CartId, CartItemId, OrderId, OrderStatus, ProductId, ReviewId, ShopId, UserId};

use crate::models::{
    Cart, CartItem, NewProduct, NewReview, NewShop, Order, OrderChanges, OrderDraft, OrderTotals,
    Product, ProductFilter, ProductUpdate, Review, Shop,
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgStore, create_pool};

/// Errors surfaced by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g. duplicate review).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// `place_order` found a line whose quantity exceeds current stock.
    /// The whole operation was aborted; nothing was written.
    #[error("insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i32,
        requested: i32,
    },
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// The persistence interface consumed by all workflows.
#[async_trait]
pub trait Store: Send + Sync {
    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    async fn create_product(&self, product: NewProduct) -> StoreResult<Product>;

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    /// List products matching the filter, with the total match count for
    /// paging.
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<(Vec<Product>, u64)>;

    /// Returns the updated product, or `None` if it doesn't exist.
    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> StoreResult<Option<Product>>;

    /// Returns `true` if the product existed and was deleted.
    async fn delete_product(&self, id: ProductId) -> StoreResult<bool>;

    // ------------------------------------------------------------------
    // Shops
    // ------------------------------------------------------------------

    async fn create_shop(&self, owner: UserId, shop: NewShop) -> StoreResult<Shop>;

    async fn shop(&self, id: ShopId) -> StoreResult<Option<Shop>>;

    async fn list_shops(&self) -> StoreResult<Vec<Shop>>;

    // ------------------------------------------------------------------
    // Carts
    // ------------------------------------------------------------------

    /// The user's cart, created empty on first access.
    async fn get_or_create_cart(&self, user: UserId) -> StoreResult<Cart>;

    async fn cart_items(&self, cart: CartId) -> StoreResult<Vec<CartItem>>;

    /// Insert a new line. The caller is responsible for merge-with-existing
    /// policy; the store bumps the cart's `updated_at`.
    async fn insert_cart_item(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: i32,
    ) -> StoreResult<CartItem>;

    /// Overwrite a line's quantity. Returns `false` if the line is not in
    /// this cart.
    async fn set_cart_item_quantity(
        &self,
        cart: CartId,
        item: CartItemId,
        quantity: i32,
    ) -> StoreResult<bool>;

    /// Returns `false` if the line is not in this cart.
    async fn remove_cart_item(&self, cart: CartId, item: CartItemId) -> StoreResult<bool>;

    /// Remove all lines. Idempotent.
    async fn clear_cart(&self, cart: CartId) -> StoreResult<()>;

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// The atomic unit of checkout: re-verify `stock >= quantity` for every
    /// line, decrement stock, and insert the order (Pending/Pending) plus
    /// its items, all or nothing. A stock violation aborts with
    /// [`StoreError::InsufficientStock`] naming the product.
    async fn place_order(&self, draft: OrderDraft) -> StoreResult<Order>;

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>>;

    async fn order_by_number(&self, number: &str) -> StoreResult<Option<Order>>;

    /// The user's orders, most recent first.
    async fn orders_for_user(&self, user: UserId) -> StoreResult<Vec<Order>>;

    /// Orders containing at least one item from the shop, most recent first.
    async fn orders_for_shop(&self, shop: ShopId) -> StoreResult<Vec<Order>>;

    /// Orders in the given status, most recent first.
    async fn orders_with_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>>;

    /// Apply a partial update. Returns `false` if the order doesn't exist.
    async fn update_order(&self, id: OrderId, changes: OrderChanges) -> StoreResult<bool>;

    /// Atomic cancellation: if the order exists, belongs to `user`, and is
    /// still `Pending`, restore every line's stock and set `Cancelled`.
    /// Returns `false` (and changes nothing) otherwise.
    async fn cancel_order_and_restock(&self, id: OrderId, user: UserId) -> StoreResult<bool>;

    /// Whether the user has a *delivered* order containing the product.
    async fn has_delivered_purchase(&self, user: UserId, product: ProductId) -> StoreResult<bool>;

    /// Aggregates over the order set, optionally restricted to orders
    /// containing at least one item from the shop.
    async fn order_totals(&self, shop: Option<ShopId>) -> StoreResult<OrderTotals>;

    // ------------------------------------------------------------------
    // Reviews
    // ------------------------------------------------------------------

    /// Insert a review. Fails with [`StoreError::Conflict`] if the
    /// (user, product) pair already has one.
    async fn insert_review(&self, review: NewReview) -> StoreResult<Review>;

    async fn review(&self, id: ReviewId) -> StoreResult<Option<Review>>;

    /// Reviews for a product, most recent first.
    async fn reviews_for_product(&self, product: ProductId) -> StoreResult<Vec<Review>>;

    /// Reviews written by a user, most recent first.
    async fn reviews_for_user(&self, user: UserId) -> StoreResult<Vec<Review>>;

    /// Overwrite rating and comment. Returns `false` if the review doesn't
    /// exist.
    async fn update_review(
        &self,
        id: ReviewId,
        rating: i32,
        comment: Option<String>,
    ) -> StoreResult<bool>;

    /// Returns `false` if the review doesn't exist.
    async fn delete_review(&self, id: ReviewId) -> StoreResult<bool>;

    /// All reviews of all products belonging to the shop.
    async fn reviews_for_shop(&self, shop: ShopId) -> StoreResult<Vec<Review>>;
}
