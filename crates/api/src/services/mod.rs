//! Domain workflows.
//!
//! Services hold the business policy and delegate persistence to the
//! [`Store`](crate::store::Store) seam. Dependencies are injected through
//! constructors; caller identity arrives as an explicit
//! [`Principal`](vendora_core::Principal) argument, never from ambient
//! request state.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod review;

pub use cart::CartService;
pub use catalog::CatalogService;
pub use order::{CheckoutRequest, OrderService};
pub use review::ReviewService;
