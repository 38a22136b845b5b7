//! Review aggregator.
//!
//! One review per (user, product); the verified-purchase flag is set at
//! creation time from delivered-order history. Rating distributions and
//! averages are recomputed on every read, never cached.

use std::sync::Arc;

use vendora_core::{ProductId, ReviewId, ShopId, UserId};

use crate::error::{AppError, Result};
use crate::models::{NewReview, ProductRating, Review};
use crate::store::{Store, StoreError};

const MAX_COMMENT_LENGTH: usize = 1000;

/// Review workflow.
#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn Store>,
}

impl ReviewService {
    /// Create the service over an injected store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a review.
    ///
    /// Fails with `NotFound` if the product is missing and `DuplicateReview`
    /// if the caller already reviewed it. The verified-purchase flag is
    /// looked up from *delivered* orders only.
    pub async fn create(
        &self,
        user: UserId,
        product_id: ProductId,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Review> {
        validate_rating(rating)?;
        validate_comment(comment.as_deref())?;

        self.store
            .product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {product_id} not found")))?;

        let verified_purchase = self.store.has_delivered_purchase(user, product_id).await?;

        let review = self
            .store
            .insert_review(NewReview {
                product_id,
                user_id: user,
                rating,
                comment,
                verified_purchase,
            })
            .await
            .map_err(|err| match err {
                StoreError::Conflict(_) => AppError::DuplicateReview,
                other => AppError::from(other),
            })?;

        Ok(review)
    }

    /// Overwrite a review's rating and comment.
    ///
    /// Returns `false` if the review is missing or the caller isn't its
    /// author.
    pub async fn update(
        &self,
        user: UserId,
        id: ReviewId,
        rating: i32,
        comment: Option<String>,
    ) -> Result<bool> {
        validate_rating(rating)?;
        validate_comment(comment.as_deref())?;

        let authored = self
            .store
            .review(id)
            .await?
            .is_some_and(|review| review.user_id == user);
        if !authored {
            return Ok(false);
        }
        Ok(self.store.update_review(id, rating, comment).await?)
    }

    /// Delete a review. Returns `false` if it's missing or the caller isn't
    /// its author.
    pub async fn delete(&self, user: UserId, id: ReviewId) -> Result<bool> {
        let authored = self
            .store
            .review(id)
            .await?
            .is_some_and(|review| review.user_id == user);
        if !authored {
            return Ok(false);
        }
        Ok(self.store.delete_review(id).await?)
    }

    /// Reviews for a product, most recent first.
    pub async fn for_product(&self, product: ProductId) -> Result<Vec<Review>> {
        Ok(self.store.reviews_for_product(product).await?)
    }

    /// Reviews written by a user, most recent first.
    pub async fn for_user(&self, user: UserId) -> Result<Vec<Review>> {
        Ok(self.store.reviews_for_user(user).await?)
    }

    /// Rating distribution and average for a product, recomputed on read.
    pub async fn product_rating(&self, product_id: ProductId) -> Result<ProductRating> {
        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {product_id} not found")))?;
        let reviews = self.store.reviews_for_product(product_id).await?;
        Ok(ProductRating::compute(product.id, product.name, &reviews))
    }

    /// Mean rating across all reviews of all the shop's products; zero when
    /// the shop has no products or no reviews.
    pub async fn shop_average(&self, shop: ShopId) -> Result<f64> {
        self.store
            .shop(shop)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("shop {shop} not found")))?;

        let reviews = self.store.reviews_for_shop(shop).await?;
        if reviews.is_empty() {
            return Ok(0.0);
        }
        let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
        #[allow(clippy::cast_precision_loss)] // Review counts stay far below f64 precision
        Ok(sum as f64 / reviews.len() as f64)
    }
}

fn validate_rating(rating: i32) -> Result<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::InvalidInput(format!(
            "rating must be between 1 and 5, got {rating}"
        )));
    }
    Ok(())
}

fn validate_comment(comment: Option<&str>) -> Result<()> {
    if comment.is_some_and(|c| c.len() > MAX_COMMENT_LENGTH) {
        return Err(AppError::InvalidInput(format!(
            "comment must not exceed {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, NewProduct, NewShop, OrderDraft, OrderLine};
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;
    use vendora_core::{OrderStatus, PaymentMethod};

    struct Fixture {
        store: Arc<MemoryStore>,
        reviews: ReviewService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let reviews = ReviewService::new(store.clone());
        Fixture { store, reviews }
    }

    async fn seed_product(store: &MemoryStore, shop: Option<ShopId>) -> ProductId {
        store
            .create_product(NewProduct {
                name: "Linen Shirt".to_owned(),
                price: Decimal::new(3900, 2),
                stock: 10,
                shop_id: shop,
                description: None,
                category: None,
                image_url: None,
            })
            .await
            .expect("create product")
            .id
    }

    /// Place and deliver an order so `user` counts as a verified buyer.
    async fn deliver_order(store: &MemoryStore, user: UserId, product: ProductId) {
        let address = Address {
            address: "3 Dock Road".to_owned(),
            city: "Nantes".to_owned(),
            postal_code: "44000".to_owned(),
            country: "FR".to_owned(),
        };
        let order = store
            .place_order(OrderDraft {
                user_id: user,
                order_number: format!("ORD-20250101-{:08X}", user.as_i32()),
                payment_method: PaymentMethod::CreditCard,
                subtotal: Decimal::new(3900, 2),
                tax_amount: Decimal::ZERO,
                shipping_cost: Decimal::ZERO,
                discount_amount: Decimal::ZERO,
                shipping: address.clone(),
                billing: address,
                lines: vec![OrderLine {
                    product_id: product,
                    product_name: "Linen Shirt".to_owned(),
                    quantity: 1,
                    unit_price: Decimal::new(3900, 2),
                }],
            })
            .await
            .expect("place order");
        store
            .update_order(
                order.id,
                crate::models::OrderChanges {
                    status: Some(OrderStatus::Delivered),
                    ..Default::default()
                },
            )
            .await
            .expect("deliver");
    }

    #[tokio::test]
    async fn test_duplicate_review_rejected() {
        let fx = fixture();
        let product = seed_product(&fx.store, None).await;
        let user = UserId::new(1);

        fx.reviews
            .create(user, product, 4, Some("solid".to_owned()))
            .await
            .expect("first review");
        let err = fx
            .reviews
            .create(user, product, 5, None)
            .await
            .expect_err("second review");
        assert!(matches!(err, AppError::DuplicateReview));

        // A different user may still review.
        fx.reviews
            .create(UserId::new(2), product, 5, None)
            .await
            .expect("other user");
    }

    #[tokio::test]
    async fn test_verified_purchase_requires_delivery() {
        let fx = fixture();
        let product = seed_product(&fx.store, None).await;

        // Buyer with a delivered order: verified.
        let buyer = UserId::new(1);
        deliver_order(&fx.store, buyer, product).await;
        let review = fx
            .reviews
            .create(buyer, product, 5, None)
            .await
            .expect("review");
        assert!(review.verified_purchase);

        // No purchase: not verified.
        let review = fx
            .reviews
            .create(UserId::new(2), product, 3, None)
            .await
            .expect("review");
        assert!(!review.verified_purchase);
    }

    #[tokio::test]
    async fn test_rating_validation() {
        let fx = fixture();
        let product = seed_product(&fx.store, None).await;
        for bad in [0, 6, -1] {
            assert!(matches!(
                fx.reviews.create(UserId::new(1), product, bad, None).await,
                Err(AppError::InvalidInput(_))
            ));
        }
        assert!(matches!(
            fx.reviews
                .create(UserId::new(1), product, 5, Some("x".repeat(1001)))
                .await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_author_only_update_and_delete() {
        let fx = fixture();
        let product = seed_product(&fx.store, None).await;
        let author = UserId::new(1);
        let review = fx
            .reviews
            .create(author, product, 4, None)
            .await
            .expect("review");

        let other = UserId::new(2);
        assert!(!fx.reviews.update(other, review.id, 1, None).await.expect("update"));
        assert!(!fx.reviews.delete(other, review.id).await.expect("delete"));

        assert!(
            fx.reviews
                .update(author, review.id, 2, Some("changed my mind".to_owned()))
                .await
                .expect("update")
        );
        let rating = fx.reviews.product_rating(product).await.expect("rating");
        assert_eq!(rating.distribution[&2], 1);
        assert_eq!(rating.distribution[&4], 0);

        assert!(fx.reviews.delete(author, review.id).await.expect("delete"));
        assert!(!fx.reviews.delete(author, review.id).await.expect("delete"));
    }

    #[tokio::test]
    async fn test_rating_consistent_with_review_multiset() {
        let fx = fixture();
        let product = seed_product(&fx.store, None).await;
        for (user, stars) in [(1, 5), (2, 5), (3, 4), (4, 2)] {
            fx.reviews
                .create(UserId::new(user), product, stars, None)
                .await
                .expect("review");
        }

        let rating = fx.reviews.product_rating(product).await.expect("rating");
        assert_eq!(rating.total_reviews, 4);
        assert_eq!(rating.distribution[&5], 2);
        assert_eq!(rating.distribution[&4], 1);
        assert_eq!(rating.distribution[&2], 1);
        assert!((rating.average_rating - 4.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_shop_average() {
        let fx = fixture();
        let shop = fx
            .store
            .create_shop(
                UserId::new(9),
                NewShop {
                    name: "Atelier Nord".to_owned(),
                    description: None,
                },
            )
            .await
            .expect("shop")
            .id;

        // No products yet: zero.
        assert!((fx.reviews.shop_average(shop).await.expect("avg") - 0.0).abs() < f64::EPSILON);

        let first = seed_product(&fx.store, Some(shop)).await;
        let second = seed_product(&fx.store, Some(shop)).await;
        fx.reviews
            .create(UserId::new(1), first, 5, None)
            .await
            .expect("review");
        fx.reviews
            .create(UserId::new(1), second, 2, None)
            .await
            .expect("review");

        let average = fx.reviews.shop_average(shop).await.expect("avg");
        assert!((average - 3.5).abs() < f64::EPSILON);

        assert!(matches!(
            fx.reviews.shop_average(ShopId::new(999)).await,
            Err(AppError::NotFound(_))
        ));
    }
}
