//! Catalog products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vendora_core::{ProductId, ShopId};

/// A catalog product with its live stock counter.
///
/// `stock` is never negative; it is decremented only inside the order
/// workflow's atomic unit and incremented back on cancellation.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub shop_id: Option<ShopId>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub shop_id: Option<ShopId>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Full-overwrite update of a product's mutable fields.
///
/// The shop association is fixed at creation time.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductUpdate {
    pub name: String,
    pub price: Decimal,
    pub stock: i32,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Id,
    Name,
    Price,
    PriceDesc,
    Newest,
}

/// Filters applied to a product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub shop_id: Option<ShopId>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// Only products with `stock > 0`.
    pub in_stock: bool,
    pub sort: ProductSort,
    pub page: u32,
    pub page_size: u32,
}

/// A page of results plus paging metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u64,
    pub items: Vec<T>,
}

impl<T> Paged<T> {
    /// Assemble a page, deriving `total_pages` from the item count.
    #[must_use]
    pub fn new(page: u32, page_size: u32, total_items: u64, items: Vec<T>) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_items.div_ceil(u64::from(page_size))
        };
        Self {
            page,
            page_size,
            total_items,
            total_pages,
            items,
        }
    }
}
