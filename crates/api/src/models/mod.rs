//! Domain models.
//!
//! Plain data structs shared between the store seam, the services, and the
//! route handlers. Anything derived (cart totals, order final amounts,
//! rating distributions) is computed, never persisted.

pub mod cart;
pub mod order;
pub mod product;
pub mod review;
pub mod shop;

pub use cart::{Cart, CartItem, CartItemView, CartView};
pub use order::{
    Address, Order, OrderChanges, OrderDraft, OrderItem, OrderLine, OrderStats, OrderTotals,
};
pub use product::{NewProduct, Paged, Product, ProductFilter, ProductSort, ProductUpdate};
pub use review::{NewReview, ProductRating, Review};
pub use shop::{NewShop, Shop};
