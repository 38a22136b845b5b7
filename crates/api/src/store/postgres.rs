//! `PostgreSQL` store backend.
//!
//! Runtime-checked sqlx queries over a connection pool. Checkout and
//! cancellation run inside a transaction; product rows are locked with
//! `SELECT ... FOR UPDATE` (in id order, so two overlapping checkouts cannot
//! deadlock) before the stock check, which is what prevents two concurrent
//! checkouts from both passing the check and over-selling.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use vendora_core::{
    CartId, CartItemId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, ReviewId,
    ShopId, UserId,
};

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Address, Cart, CartItem, NewProduct, NewReview, NewShop, Order, OrderChanges, OrderDraft,
    OrderItem, OrderTotals, Product, ProductFilter, ProductSort, ProductUpdate, Review, Shop,
};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// `PostgreSQL` [`Store`] implementation.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Load the item lists for a batch of orders in one query.
    async fn attach_items(&self, orders: &mut [Order]) -> StoreResult<()> {
        if orders.is_empty() {
            return Ok(());
        }
        let ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();
        let rows = sqlx::query(
            "SELECT id, order_id, product_id, product_name, quantity, unit_price, reviewed \
             FROM order_items WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let item = order_item_from_row(&row)?;
            by_order.entry(item.order_id).or_default().push(item);
        }
        for order in orders {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn fetch_order_where(
        &self,
        column: &str,
        bind: impl for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres> + Send,
    ) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE {column} = $1");
        let row = sqlx::query(&sql).bind(bind).fetch_optional(&self.pool).await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut orders = vec![order_from_row(&row)?];
        self.attach_items(&mut orders).await?;
        Ok(orders.pop())
    }
}

const ORDER_COLUMNS: &str = "id, order_number, user_id, status, payment_status, payment_method, \
     subtotal, tax_amount, shipping_cost, discount_amount, \
     shipping_address, shipping_city, shipping_postal_code, shipping_country, \
     billing_address, billing_city, billing_postal_code, billing_country, \
     payment_intent_id, created_at, updated_at, paid_at, shipped_at, delivered_at";

const PRODUCT_COLUMNS: &str =
    "id, name, price, stock, shop_id, description, category, image_url, created_at, updated_at";

const REVIEW_COLUMNS: &str =
    "id, product_id, user_id, rating, comment, verified_purchase, created_at, updated_at";

#[async_trait]
impl Store for PgStore {
    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    async fn create_product(&self, product: NewProduct) -> StoreResult<Product> {
        let sql = format!(
            "INSERT INTO products (name, price, stock, shop_id, description, category, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&product.name)
            .bind(product.price)
            .bind(product.stock)
            .bind(product.shop_id)
            .bind(&product.description)
            .bind(&product.category)
            .bind(&product.image_url)
            .fetch_one(&self.pool)
            .await?;
        product_from_row(&row)
    }

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<(Vec<Product>, u64)> {
        fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
            if let Some(shop) = filter.shop_id {
                qb.push(" AND shop_id = ").push_bind(shop.as_i32());
            }
            if let Some(category) = &filter.category {
                qb.push(" AND category = ").push_bind(category.clone());
            }
            if let Some(min) = filter.min_price {
                qb.push(" AND price >= ").push_bind(min);
            }
            if let Some(max) = filter.max_price {
                qb.push(" AND price <= ").push_bind(max);
            }
            if filter.in_stock {
                qb.push(" AND stock > 0");
            }
        }

        let mut count_qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM products WHERE TRUE");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build()
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"
        ));
        push_filters(&mut qb, filter);
        qb.push(match filter.sort {
            ProductSort::Id => " ORDER BY id",
            ProductSort::Name => " ORDER BY name, id",
            ProductSort::Price => " ORDER BY price, id",
            ProductSort::PriceDesc => " ORDER BY price DESC, id",
            ProductSort::Newest => " ORDER BY created_at DESC, id DESC",
        });
        qb.push(" LIMIT ")
            .push_bind(i64::from(filter.page_size))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.page.saturating_sub(1)) * i64::from(filter.page_size));

        let rows = qb.build().fetch_all(&self.pool).await?;
        let products = rows
            .iter()
            .map(product_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((products, total.try_into().unwrap_or(0)))
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> StoreResult<Option<Product>> {
        let sql = format!(
            "UPDATE products SET name = $2, price = $3, stock = $4, description = $5, \
             category = $6, image_url = $7, updated_at = now() \
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&update.name)
            .bind(update.price)
            .bind(update.stock)
            .bind(&update.description)
            .bind(&update.category)
            .bind(&update.image_url)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------
    // Shops
    // ------------------------------------------------------------------

    async fn create_shop(&self, owner: UserId, shop: NewShop) -> StoreResult<Shop> {
        let row = sqlx::query(
            "INSERT INTO shops (owner_id, name, description) VALUES ($1, $2, $3) \
             RETURNING id, owner_id, name, description, created_at",
        )
        .bind(owner)
        .bind(&shop.name)
        .bind(&shop.description)
        .fetch_one(&self.pool)
        .await?;
        shop_from_row(&row)
    }

    async fn shop(&self, id: ShopId) -> StoreResult<Option<Shop>> {
        let row = sqlx::query(
            "SELECT id, owner_id, name, description, created_at FROM shops WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(shop_from_row).transpose()
    }

    async fn list_shops(&self) -> StoreResult<Vec<Shop>> {
        let rows =
            sqlx::query("SELECT id, owner_id, name, description, created_at FROM shops ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        rows.iter().map(shop_from_row).collect()
    }

    // ------------------------------------------------------------------
    // Carts
    // ------------------------------------------------------------------

    async fn get_or_create_cart(&self, user: UserId) -> StoreResult<Cart> {
        // Upsert against the unique user_id; the no-op update makes
        // RETURNING yield the existing row on conflict.
        let row = sqlx::query(
            "INSERT INTO carts (user_id) VALUES ($1) \
             ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id \
             RETURNING id, user_id, created_at, updated_at",
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await?;
        cart_from_row(&row)
    }

    async fn cart_items(&self, cart: CartId) -> StoreResult<Vec<CartItem>> {
        let rows = sqlx::query(
            "SELECT id, cart_id, product_id, quantity, added_at \
             FROM cart_items WHERE cart_id = $1 ORDER BY id",
        )
        .bind(cart)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(cart_item_from_row).collect()
    }

    async fn insert_cart_item(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: i32,
    ) -> StoreResult<CartItem> {
        let row = sqlx::query(
            "INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3) \
             RETURNING id, cart_id, product_id, quantity, added_at",
        )
        .bind(cart)
        .bind(product)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await?;
        self.touch_cart(cart).await?;
        cart_item_from_row(&row)
    }

    async fn set_cart_item_quantity(
        &self,
        cart: CartId,
        item: CartItemId,
        quantity: i32,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE cart_items SET quantity = $3 WHERE id = $2 AND cart_id = $1",
        )
        .bind(cart)
        .bind(item)
        .bind(quantity)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        self.touch_cart(cart).await?;
        Ok(true)
    }

    async fn remove_cart_item(&self, cart: CartId, item: CartItemId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $2 AND cart_id = $1")
            .bind(cart)
            .bind(item)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        self.touch_cart(cart).await?;
        Ok(true)
    }

    async fn clear_cart(&self, cart: CartId) -> StoreResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart)
            .execute(&self.pool)
            .await?;
        self.touch_cart(cart).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    async fn place_order(&self, draft: OrderDraft) -> StoreResult<Order> {
        let mut tx = self.pool.begin().await?;

        // Lock product rows in id order so two overlapping checkouts can't
        // deadlock, then verify stock. Any violation aborts the transaction
        // before a single row has changed.
        let mut lock_order: Vec<_> = draft.lines.iter().collect();
        lock_order.sort_by_key(|line| line.product_id);
        for line in lock_order {
            let row = sqlx::query("SELECT name, stock FROM products WHERE id = $1 FOR UPDATE")
                .bind(line.product_id)
                .fetch_optional(&mut *tx)
                .await?;
            let Some(row) = row else {
                return Err(StoreError::NotFound);
            };
            let stock: i32 = row.try_get("stock")?;
            if stock < line.quantity {
                return Err(StoreError::InsufficientStock {
                    product: row.try_get("name")?,
                    available: stock,
                    requested: line.quantity,
                });
            }
            sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1")
                .bind(line.product_id)
                .bind(line.quantity)
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query(
            "INSERT INTO orders (order_number, user_id, status, payment_status, payment_method, \
                 subtotal, tax_amount, shipping_cost, discount_amount, \
                 shipping_address, shipping_city, shipping_postal_code, shipping_country, \
                 billing_address, billing_city, billing_postal_code, billing_country) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING id, created_at",
        )
        .bind(&draft.order_number)
        .bind(draft.user_id)
        .bind(OrderStatus::Pending.to_string())
        .bind(PaymentStatus::Pending.to_string())
        .bind(draft.payment_method.to_string())
        .bind(draft.subtotal)
        .bind(draft.tax_amount)
        .bind(draft.shipping_cost)
        .bind(draft.discount_amount)
        .bind(&draft.shipping.address)
        .bind(&draft.shipping.city)
        .bind(&draft.shipping.postal_code)
        .bind(&draft.shipping.country)
        .bind(&draft.billing.address)
        .bind(&draft.billing.city)
        .bind(&draft.billing.postal_code)
        .bind(&draft.billing.country)
        .fetch_one(&mut *tx)
        .await?;
        let order_id: OrderId = row.try_get("id")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let row = sqlx::query(
                "INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING id",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.quantity)
            .bind(line.unit_price)
            .fetch_one(&mut *tx)
            .await?;
            items.push(OrderItem {
                id: row.try_get("id")?,
                order_id,
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                reviewed: false,
            });
        }

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            order_number: draft.order_number,
            user_id: draft.user_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: draft.payment_method,
            subtotal: draft.subtotal,
            tax_amount: draft.tax_amount,
            shipping_cost: draft.shipping_cost,
            discount_amount: draft.discount_amount,
            shipping: draft.shipping,
            billing: draft.billing,
            payment_intent_id: None,
            items,
            created_at,
            updated_at: None,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
        })
    }

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        self.fetch_order_where("id", id).await
    }

    async fn order_by_number(&self, number: &str) -> StoreResult<Option<Order>> {
        self.fetch_order_where("order_number", number.to_owned())
            .await
    }

    async fn orders_for_user(&self, user: UserId) -> StoreResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql).bind(user).fetch_all(&self.pool).await?;
        let mut orders = rows
            .iter()
            .map(order_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        self.attach_items(&mut orders).await?;
        Ok(orders)
    }

    async fn orders_for_shop(&self, shop: ShopId) -> StoreResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id IN ( \
                 SELECT oi.order_id FROM order_items oi \
                 JOIN products p ON p.id = oi.product_id WHERE p.shop_id = $1) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql).bind(shop).fetch_all(&self.pool).await?;
        let mut orders = rows
            .iter()
            .map(order_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        self.attach_items(&mut orders).await?;
        Ok(orders)
    }

    async fn orders_with_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE status = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(status.to_string())
            .fetch_all(&self.pool)
            .await?;
        let mut orders = rows
            .iter()
            .map(order_from_row)
            .collect::<StoreResult<Vec<_>>>()?;
        self.attach_items(&mut orders).await?;
        Ok(orders)
    }

    async fn update_order(&self, id: OrderId, changes: OrderChanges) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET \
                 status = COALESCE($2, status), \
                 payment_status = COALESCE($3, payment_status), \
                 payment_intent_id = COALESCE($4, payment_intent_id), \
                 paid_at = COALESCE($5, paid_at), \
                 shipped_at = COALESCE($6, shipped_at), \
                 delivered_at = COALESCE($7, delivered_at), \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(changes.status.map(|s| s.to_string()))
        .bind(changes.payment_status.map(|s| s.to_string()))
        .bind(changes.payment_intent_id)
        .bind(changes.paid_at)
        .bind(changes.shipped_at)
        .bind(changes.delivered_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn cancel_order_and_restock(&self, id: OrderId, user: UserId) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT user_id, status FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(false);
        };
        let owner: UserId = row.try_get("user_id")?;
        let status: OrderStatus = parse_enum(row.try_get::<String, _>("status")?, "order status")?;
        if owner != user || status != OrderStatus::Pending {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE products p SET stock = p.stock + oi.quantity \
             FROM order_items oi WHERE oi.order_id = $1 AND p.id = oi.product_id",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(OrderStatus::Cancelled.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn has_delivered_purchase(
        &self,
        user: UserId,
        product: ProductId,
    ) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS ( \
                 SELECT 1 FROM order_items oi \
                 JOIN orders o ON o.id = oi.order_id \
                 WHERE o.user_id = $1 AND oi.product_id = $2 AND o.status = $3) AS purchased",
        )
        .bind(user)
        .bind(product)
        .bind(OrderStatus::Delivered.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("purchased")?)
    }

    async fn order_totals(&self, shop: Option<ShopId>) -> StoreResult<OrderTotals> {
        let base = "SELECT COUNT(*) AS total_orders, \
                 COALESCE(SUM(subtotal + tax_amount + shipping_cost - discount_amount), 0) \
                     AS total_revenue, \
                 COUNT(*) FILTER (WHERE status = 'pending') AS pending_orders, \
                 COUNT(*) FILTER (WHERE status = 'delivered') AS delivered_orders \
             FROM orders";
        let row = if let Some(shop) = shop {
            let sql = format!(
                "{base} WHERE id IN ( \
                     SELECT oi.order_id FROM order_items oi \
                     JOIN products p ON p.id = oi.product_id WHERE p.shop_id = $1)"
            );
            sqlx::query(&sql).bind(shop).fetch_one(&self.pool).await?
        } else {
            sqlx::query(base).fetch_one(&self.pool).await?
        };

        Ok(OrderTotals {
            total_orders: row.try_get("total_orders")?,
            total_revenue: row.try_get("total_revenue")?,
            pending_orders: row.try_get("pending_orders")?,
            delivered_orders: row.try_get("delivered_orders")?,
        })
    }

    // ------------------------------------------------------------------
    // Reviews
    // ------------------------------------------------------------------

    async fn insert_review(&self, review: NewReview) -> StoreResult<Review> {
        let sql = format!(
            "INSERT INTO reviews (product_id, user_id, rating, comment, verified_purchase) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {REVIEW_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(review.product_id)
            .bind(review.user_id)
            .bind(review.rating)
            .bind(&review.comment)
            .bind(review.verified_purchase)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return StoreError::Conflict("review already exists".to_owned());
                }
                StoreError::Database(e)
            })?;
        review_from_row(&row)
    }

    async fn review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(review_from_row).transpose()
    }

    async fn reviews_for_product(&self, product: ProductId) -> StoreResult<Vec<Review>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE product_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql).bind(product).fetch_all(&self.pool).await?;
        rows.iter().map(review_from_row).collect()
    }

    async fn reviews_for_user(&self, user: UserId) -> StoreResult<Vec<Review>> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql).bind(user).fetch_all(&self.pool).await?;
        rows.iter().map(review_from_row).collect()
    }

    async fn update_review(
        &self,
        id: ReviewId,
        rating: i32,
        comment: Option<String>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE reviews SET rating = $2, comment = $3, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(rating)
        .bind(comment)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_review(&self, id: ReviewId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reviews_for_shop(&self, shop: ShopId) -> StoreResult<Vec<Review>> {
        let sql = format!(
            "SELECT r.{} FROM reviews r \
             JOIN products p ON p.id = r.product_id \
             WHERE p.shop_id = $1 ORDER BY r.created_at DESC, r.id DESC",
            REVIEW_COLUMNS.replace(", ", ", r.")
        );
        let rows = sqlx::query(&sql).bind(shop).fetch_all(&self.pool).await?;
        rows.iter().map(review_from_row).collect()
    }
}

impl PgStore {
    /// Bump a cart's modification timestamp.
    async fn touch_cart(&self, cart: CartId) -> StoreResult<()> {
        sqlx::query("UPDATE carts SET updated_at = now() WHERE id = $1")
            .bind(cart)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Row mapping
// =============================================================================

/// Parse a TEXT column into one of the status/method enums.
fn parse_enum<T: std::str::FromStr<Err = String>>(value: String, what: &str) -> StoreResult<T> {
    value
        .parse()
        .map_err(|e| StoreError::DataCorruption(format!("invalid {what} in database: {e}")))
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        stock: row.try_get("stock")?,
        shop_id: row.try_get("shop_id")?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        image_url: row.try_get("image_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn shop_from_row(row: &PgRow) -> StoreResult<Shop> {
    Ok(Shop {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

fn cart_from_row(row: &PgRow) -> StoreResult<Cart> {
    Ok(Cart {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn cart_item_from_row(row: &PgRow) -> StoreResult<CartItem> {
    Ok(CartItem {
        id: row.try_get("id")?,
        cart_id: row.try_get("cart_id")?,
        product_id: row.try_get("product_id")?,
        quantity: row.try_get("quantity")?,
        added_at: row.try_get("added_at")?,
    })
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    let status: OrderStatus = parse_enum(row.try_get::<String, _>("status")?, "order status")?;
    let payment_status: PaymentStatus =
        parse_enum(row.try_get::<String, _>("payment_status")?, "payment status")?;
    let payment_method: PaymentMethod =
        parse_enum(row.try_get::<String, _>("payment_method")?, "payment method")?;

    Ok(Order {
        id: row.try_get("id")?,
        order_number: row.try_get("order_number")?,
        user_id: row.try_get("user_id")?,
        status,
        payment_status,
        payment_method,
        subtotal: row.try_get("subtotal")?,
        tax_amount: row.try_get("tax_amount")?,
        shipping_cost: row.try_get("shipping_cost")?,
        discount_amount: row.try_get("discount_amount")?,
        shipping: Address {
            address: row.try_get("shipping_address")?,
            city: row.try_get("shipping_city")?,
            postal_code: row.try_get("shipping_postal_code")?,
            country: row.try_get("shipping_country")?,
        },
        billing: Address {
            address: row.try_get("billing_address")?,
            city: row.try_get("billing_city")?,
            postal_code: row.try_get("billing_postal_code")?,
            country: row.try_get("billing_country")?,
        },
        payment_intent_id: row.try_get("payment_intent_id")?,
        items: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        paid_at: row.try_get("paid_at")?,
        shipped_at: row.try_get("shipped_at")?,
        delivered_at: row.try_get("delivered_at")?,
    })
}

fn order_item_from_row(row: &PgRow) -> StoreResult<OrderItem> {
    Ok(OrderItem {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        product_id: row.try_get("product_id")?,
        product_name: row.try_get("product_name")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
        reviewed: row.try_get("reviewed")?,
    })
}

fn review_from_row(row: &PgRow) -> StoreResult<Review> {
    Ok(Review {
        id: row.try_get("id")?,
        product_id: row.try_get("product_id")?,
        user_id: row.try_get("user_id")?,
        rating: row.try_get("rating")?,
        comment: row.try_get("comment")?,
        verified_purchase: row.try_get("verified_purchase")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
