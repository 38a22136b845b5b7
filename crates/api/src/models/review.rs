//! Product reviews and rating aggregates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use vendora_core::{ProductId, ReviewId, UserId};

/// A product review. At most one per (user, product) pair.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    /// 1..=5 stars.
    pub rating: i32,
    pub comment: Option<String>,
    /// Set at creation time from delivered-order history; never recomputed.
    pub verified_purchase: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields for inserting a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub rating: i32,
    pub comment: Option<String>,
    pub verified_purchase: bool,
}

/// Rating aggregate for one product, recomputed on read.
#[derive(Debug, Clone, Serialize)]
pub struct ProductRating {
    pub product_id: ProductId,
    pub product_name: String,
    pub average_rating: f64,
    pub total_reviews: u64,
    /// Review counts per star bucket; always carries all five keys.
    pub distribution: BTreeMap<u8, u64>,
}

impl ProductRating {
    /// Compute the aggregate from a product's review multiset.
    #[must_use]
    pub fn compute(product_id: ProductId, product_name: String, reviews: &[Review]) -> Self {
        let mut distribution: BTreeMap<u8, u64> = (1..=5).map(|star| (star, 0)).collect();
        let mut sum: i64 = 0;

        for review in reviews {
            if let Ok(star) = u8::try_from(review.rating)
                && let Some(count) = distribution.get_mut(&star)
            {
                *count += 1;
            }
            sum += i64::from(review.rating);
        }

        #[allow(clippy::cast_precision_loss)] // Review counts stay far below f64 precision
        let average_rating = if reviews.is_empty() {
            0.0
        } else {
            sum as f64 / reviews.len() as f64
        };

        Self {
            product_id,
            product_name,
            average_rating,
            total_reviews: reviews.len() as u64,
            distribution,
        }
    }
}
