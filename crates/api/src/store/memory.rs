//! In-memory store backend.
//!
//! Hash maps behind one `RwLock`. Every trait method takes the lock once,
//! so the multi-row operations (`place_order`, `cancel_order_and_restock`)
//! are trivially atomic: no other writer can observe a half-applied
//! checkout. Used by the test suite and as the default backend when no
//! database is configured.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use vendora_core::{
    CartId, CartItemId, OrderId, OrderItemId, OrderStatus, PaymentStatus, ProductId, ReviewId,
    ShopId, UserId,
};

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Cart, CartItem, NewProduct, NewReview, NewShop, Order, OrderChanges, OrderDraft, OrderItem,
    OrderTotals, Product, ProductFilter, ProductSort, ProductUpdate, Review, Shop,
};

/// In-memory [`Store`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    products: BTreeMap<ProductId, Product>,
    shops: BTreeMap<ShopId, Shop>,
    /// Keyed by user: one cart per user, enforced by construction.
    carts: BTreeMap<UserId, Cart>,
    cart_items: BTreeMap<CartItemId, CartItem>,
    orders: BTreeMap<OrderId, Order>,
    reviews: BTreeMap<ReviewId, Review>,
    next_id: i32,
}

impl Inner {
    /// Monotonic id source shared by all entity types.
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    /// Orders matching the predicate, most recent first.
    fn orders_where(&self, mut pred: impl FnMut(&Order) -> bool) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.values().filter(|o| pred(o)).cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders
    }

    /// Whether any of the order's items belongs to the shop (by the
    /// product's *current* shop association, mirroring the SQL join).
    fn order_touches_shop(&self, order: &Order, shop: ShopId) -> bool {
        order.items.iter().any(|item| {
            self.products
                .get(&item.product_id)
                .is_some_and(|p| p.shop_id == Some(shop))
        })
    }

    /// Reviews matching the predicate, most recent first.
    fn reviews_where(&self, mut pred: impl FnMut(&Review) -> bool) -> Vec<Review> {
        let mut reviews: Vec<Review> =
            self.reviews.values().filter(|r| pred(r)).cloned().collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        reviews
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("RwLock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("RwLock poisoned")
    }
}

#[async_trait]
impl Store for MemoryStore {
    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    async fn create_product(&self, product: NewProduct) -> StoreResult<Product> {
        let mut inner = self.write();
        let id = ProductId::new(inner.next_id());
        let row = Product {
            id,
            name: product.name,
            price: product.price,
            stock: product.stock,
            shop_id: product.shop_id,
            description: product.description,
            category: product.category,
            image_url: product.image_url,
            created_at: Utc::now(),
            updated_at: None,
        };
        inner.products.insert(id, row.clone());
        Ok(row)
    }

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read().products.get(&id).cloned())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<(Vec<Product>, u64)> {
        let inner = self.read();
        let mut matches: Vec<Product> = inner
            .products
            .values()
            .filter(|p| {
                filter.shop_id.is_none_or(|shop| p.shop_id == Some(shop))
                    && filter
                        .category
                        .as_ref()
                        .is_none_or(|c| p.category.as_deref() == Some(c.as_str()))
                    && filter.min_price.is_none_or(|min| p.price >= min)
                    && filter.max_price.is_none_or(|max| p.price <= max)
                    && (!filter.in_stock || p.stock > 0)
            })
            .cloned()
            .collect();

        match filter.sort {
            ProductSort::Id => matches.sort_by_key(|p| p.id),
            ProductSort::Name => matches.sort_by(|a, b| a.name.cmp(&b.name)),
            ProductSort::Price => matches.sort_by(|a, b| a.price.cmp(&b.price)),
            ProductSort::PriceDesc => matches.sort_by(|a, b| b.price.cmp(&a.price)),
            ProductSort::Newest => {
                matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            }
        }

        let total = matches.len() as u64;
        let offset = filter.page.saturating_sub(1) as usize * filter.page_size as usize;
        let page: Vec<Product> = matches
            .into_iter()
            .skip(offset)
            .take(filter.page_size as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> StoreResult<Option<Product>> {
        let mut inner = self.write();
        let Some(product) = inner.products.get_mut(&id) else {
            return Ok(None);
        };
        product.name = update.name;
        product.price = update.price;
        product.stock = update.stock;
        product.description = update.description;
        product.category = update.category;
        product.image_url = update.image_url;
        product.updated_at = Some(Utc::now());
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<bool> {
        let mut inner = self.write();
        if inner.products.remove(&id).is_none() {
            return Ok(false);
        }
        // Cascade like the SQL schema: cart lines and reviews go with the
        // product; order items are historical snapshots and stay.
        inner.cart_items.retain(|_, item| item.product_id != id);
        inner.reviews.retain(|_, review| review.product_id != id);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Shops
    // ------------------------------------------------------------------

    async fn create_shop(&self, owner: UserId, shop: NewShop) -> StoreResult<Shop> {
        let mut inner = self.write();
        let id = ShopId::new(inner.next_id());
        let row = Shop {
            id,
            owner_id: owner,
            name: shop.name,
            description: shop.description,
            created_at: Utc::now(),
        };
        inner.shops.insert(id, row.clone());
        Ok(row)
    }

    async fn shop(&self, id: ShopId) -> StoreResult<Option<Shop>> {
        Ok(self.read().shops.get(&id).cloned())
    }

    async fn list_shops(&self) -> StoreResult<Vec<Shop>> {
        Ok(self.read().shops.values().cloned().collect())
    }

    // ------------------------------------------------------------------
    // Carts
    // ------------------------------------------------------------------

    async fn get_or_create_cart(&self, user: UserId) -> StoreResult<Cart> {
        let mut inner = self.write();
        if let Some(cart) = inner.carts.get(&user) {
            return Ok(cart.clone());
        }
        let id = CartId::new(inner.next_id());
        let now = Utc::now();
        let cart = Cart {
            id,
            user_id: user,
            created_at: now,
            updated_at: now,
        };
        inner.carts.insert(user, cart.clone());
        Ok(cart)
    }

    async fn cart_items(&self, cart: CartId) -> StoreResult<Vec<CartItem>> {
        Ok(self
            .read()
            .cart_items
            .values()
            .filter(|item| item.cart_id == cart)
            .cloned()
            .collect())
    }

    async fn insert_cart_item(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: i32,
    ) -> StoreResult<CartItem> {
        let mut inner = self.write();
        let id = CartItemId::new(inner.next_id());
        let item = CartItem {
            id,
            cart_id: cart,
            product_id: product,
            quantity,
            added_at: Utc::now(),
        };
        inner.cart_items.insert(id, item.clone());
        if let Some(row) = inner.carts.values_mut().find(|c| c.id == cart) {
            row.updated_at = Utc::now();
        }
        Ok(item)
    }

    async fn set_cart_item_quantity(
        &self,
        cart: CartId,
        item: CartItemId,
        quantity: i32,
    ) -> StoreResult<bool> {
        let mut inner = self.write();
        let Some(row) = inner.cart_items.get_mut(&item) else {
            return Ok(false);
        };
        if row.cart_id != cart {
            return Ok(false);
        }
        row.quantity = quantity;
        if let Some(row) = inner.carts.values_mut().find(|c| c.id == cart) {
            row.updated_at = Utc::now();
        }
        Ok(true)
    }

    async fn remove_cart_item(&self, cart: CartId, item: CartItemId) -> StoreResult<bool> {
        let mut inner = self.write();
        let belongs = inner
            .cart_items
            .get(&item)
            .is_some_and(|row| row.cart_id == cart);
        if !belongs {
            return Ok(false);
        }
        inner.cart_items.remove(&item);
        if let Some(row) = inner.carts.values_mut().find(|c| c.id == cart) {
            row.updated_at = Utc::now();
        }
        Ok(true)
    }

    async fn clear_cart(&self, cart: CartId) -> StoreResult<()> {
        let mut inner = self.write();
        inner.cart_items.retain(|_, item| item.cart_id != cart);
        if let Some(row) = inner.carts.values_mut().find(|c| c.id == cart) {
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    async fn place_order(&self, draft: OrderDraft) -> StoreResult<Order> {
        let mut inner = self.write();

        // Verify every line against current stock before touching anything,
        // so a violation aborts with no partial writes.
        for line in &draft.lines {
            let product = inner
                .products
                .get(&line.product_id)
                .ok_or(StoreError::NotFound)?;
            if product.stock < line.quantity {
                return Err(StoreError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.stock,
                    requested: line.quantity,
                });
            }
        }

        for line in &draft.lines {
            if let Some(product) = inner.products.get_mut(&line.product_id) {
                product.stock -= line.quantity;
            }
        }

        let order_id = OrderId::new(inner.next_id());
        let items: Vec<OrderItem> = draft
            .lines
            .iter()
            .map(|line| OrderItem {
                id: OrderItemId::new(inner.next_id()),
                order_id,
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                reviewed: false,
            })
            .collect();

        let order = Order {
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
            created_at: Utc::now(),
            updated_at: None,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
        };
        inner.orders.insert(order_id, order.clone());
        Ok(order)
    }

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.read().orders.get(&id).cloned())
    }

    async fn order_by_number(&self, number: &str) -> StoreResult<Option<Order>> {
        Ok(self
            .read()
            .orders
            .values()
            .find(|o| o.order_number == number)
            .cloned())
    }

    async fn orders_for_user(&self, user: UserId) -> StoreResult<Vec<Order>> {
        Ok(self.read().orders_where(|o| o.user_id == user))
    }

    async fn orders_for_shop(&self, shop: ShopId) -> StoreResult<Vec<Order>> {
        let inner = self.read();
        Ok(inner.orders_where(|o| inner.order_touches_shop(o, shop)))
    }

    async fn orders_with_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>> {
        Ok(self.read().orders_where(|o| o.status == status))
    }

    async fn update_order(&self, id: OrderId, changes: OrderChanges) -> StoreResult<bool> {
        let mut inner = self.write();
        let Some(order) = inner.orders.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(status) = changes.status {
            order.status = status;
        }
        if let Some(payment_status) = changes.payment_status {
            order.payment_status = payment_status;
        }
        if let Some(intent_id) = changes.payment_intent_id {
            order.payment_intent_id = Some(intent_id);
        }
        if let Some(paid_at) = changes.paid_at {
            order.paid_at = Some(paid_at);
        }
        if let Some(shipped_at) = changes.shipped_at {
            order.shipped_at = Some(shipped_at);
        }
        if let Some(delivered_at) = changes.delivered_at {
            order.delivered_at = Some(delivered_at);
        }
        order.updated_at = Some(Utc::now());
        Ok(true)
    }

    async fn cancel_order_and_restock(&self, id: OrderId, user: UserId) -> StoreResult<bool> {
        let mut inner = self.write();
        let cancellable = inner
            .orders
            .get(&id)
            .is_some_and(|o| o.user_id == user && o.status == OrderStatus::Pending);
        if !cancellable {
            return Ok(false);
        }

        let items = inner
            .orders
            .get(&id)
            .map(|o| o.items.clone())
            .unwrap_or_default();
        for item in &items {
            if let Some(product) = inner.products.get_mut(&item.product_id) {
                product.stock += item.quantity;
            }
        }
        if let Some(order) = inner.orders.get_mut(&id) {
            order.status = OrderStatus::Cancelled;
            order.updated_at = Some(Utc::now());
        }
        Ok(true)
    }

    async fn has_delivered_purchase(
        &self,
        user: UserId,
        product: ProductId,
    ) -> StoreResult<bool> {
        Ok(self.read().orders.values().any(|o| {
            o.user_id == user
                && o.status == OrderStatus::Delivered
                && o.items.iter().any(|item| item.product_id == product)
        }))
    }

    async fn order_totals(&self, shop: Option<ShopId>) -> StoreResult<OrderTotals> {
        let inner = self.read();
        let mut totals = OrderTotals {
            total_orders: 0,
            total_revenue: Decimal::ZERO,
            pending_orders: 0,
            delivered_orders: 0,
        };
        for order in inner.orders.values() {
            if let Some(shop) = shop
                && !inner.order_touches_shop(order, shop)
            {
                continue;
            }
            totals.total_orders += 1;
            totals.total_revenue += order.final_amount();
            match order.status {
                OrderStatus::Pending => totals.pending_orders += 1,
                OrderStatus::Delivered => totals.delivered_orders += 1,
                _ => {}
            }
        }
        Ok(totals)
    }

    // ------------------------------------------------------------------
    // Reviews
    // ------------------------------------------------------------------

    async fn insert_review(&self, review: NewReview) -> StoreResult<Review> {
        let mut inner = self.write();
        let duplicate = inner
            .reviews
            .values()
            .any(|r| r.user_id == review.user_id && r.product_id == review.product_id);
        if duplicate {
            return Err(StoreError::Conflict("review already exists".to_owned()));
        }

        let id = ReviewId::new(inner.next_id());
        let row = Review {
            id,
            product_id: review.product_id,
            user_id: review.user_id,
            rating: review.rating,
            comment: review.comment,
            verified_purchase: review.verified_purchase,
            created_at: Utc::now(),
            updated_at: None,
        };
        inner.reviews.insert(id, row.clone());
        Ok(row)
    }

    async fn review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        Ok(self.read().reviews.get(&id).cloned())
    }

    async fn reviews_for_product(&self, product: ProductId) -> StoreResult<Vec<Review>> {
        Ok(self.read().reviews_where(|r| r.product_id == product))
    }

    async fn reviews_for_user(&self, user: UserId) -> StoreResult<Vec<Review>> {
        Ok(self.read().reviews_where(|r| r.user_id == user))
    }

    async fn update_review(
        &self,
        id: ReviewId,
        rating: i32,
        comment: Option<String>,
    ) -> StoreResult<bool> {
        let mut inner = self.write();
        let Some(review) = inner.reviews.get_mut(&id) else {
            return Ok(false);
        };
        review.rating = rating;
        review.comment = comment;
        review.updated_at = Some(Utc::now());
        Ok(true)
    }

    async fn delete_review(&self, id: ReviewId) -> StoreResult<bool> {
        Ok(self.write().reviews.remove(&id).is_some())
    }

    async fn reviews_for_shop(&self, shop: ShopId) -> StoreResult<Vec<Review>> {
        let inner = self.read();
        Ok(inner.reviews_where(|r| {
            inner
                .products
                .get(&r.product_id)
                .is_some_and(|p| p.shop_id == Some(shop))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Address;

    fn new_product(name: &str, price: Decimal, stock: i32) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            price,
            stock,
            shop_id: None,
            description: None,
            category: None,
            image_url: None,
        }
    }

    fn address() -> Address {
        Address {
            address: "12 Quai des Belges".to_owned(),
            city: "Marseille".to_owned(),
            postal_code: "13001".to_owned(),
            country: "FR".to_owned(),
        }
    }

    fn draft_for(product: &Product, quantity: i32, user: UserId) -> OrderDraft {
        OrderDraft {
            user_id: user,
            order_number: format!("ORD-20250101-{:08X}", product.id.as_i32()),
            payment_method: vendora_core::PaymentMethod::CreditCard,
            subtotal: product.price * Decimal::from(quantity),
            tax_amount: Decimal::ZERO,
            shipping_cost: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            shipping: address(),
            billing: address(),
            lines: vec![crate::models::OrderLine {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity,
                unit_price: product.price,
            }],
        }
    }

    #[tokio::test]
    async fn test_place_order_decrements_stock() {
        let store = MemoryStore::new();
        let product = store
            .create_product(new_product("Mug", Decimal::new(500, 2), 5))
            .await
            .expect("create");

        let order = store
            .place_order(draft_for(&product, 3, UserId::new(1)))
            .await
            .expect("place");

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        let stock = store
            .product(product.id)
            .await
            .expect("get")
            .expect("exists")
            .stock;
        assert_eq!(stock, 2);
    }

    #[tokio::test]
    async fn test_place_order_insufficient_stock_is_all_or_nothing() {
        let store = MemoryStore::new();
        let a = store
            .create_product(new_product("A", Decimal::new(100, 2), 5))
            .await
            .expect("create");
        let b = store
            .create_product(new_product("B", Decimal::new(100, 2), 1))
            .await
            .expect("create");

        let mut draft = draft_for(&a, 3, UserId::new(1));
        draft.lines.push(crate::models::OrderLine {
            product_id: b.id,
            product_name: b.name.clone(),
            quantity: 2,
            unit_price: b.price,
        });

        let err = store.place_order(draft).await.expect_err("must fail");
        match err {
            StoreError::InsufficientStock {
                product,
                available,
                requested,
            } => {
                assert_eq!(product, "B");
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Nothing was written: stock untouched, no order rows.
        assert_eq!(store.product(a.id).await.expect("get").expect("a").stock, 5);
        assert_eq!(store.product(b.id).await.expect("get").expect("b").stock, 1);
        assert!(
            store
                .orders_for_user(UserId::new(1))
                .await
                .expect("list")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_cancel_restocks_only_pending() {
        let store = MemoryStore::new();
        let user = UserId::new(9);
        let product = store
            .create_product(new_product("Desk", Decimal::new(20_000, 2), 4))
            .await
            .expect("create");
        let order = store
            .place_order(draft_for(&product, 4, user))
            .await
            .expect("place");
        assert_eq!(
            store
                .product(product.id)
                .await
                .expect("get")
                .expect("p")
                .stock,
            0
        );

        // Wrong user: rejected, no restock.
        assert!(
            !store
                .cancel_order_and_restock(order.id, UserId::new(8))
                .await
                .expect("cancel")
        );

        assert!(
            store
                .cancel_order_and_restock(order.id, user)
                .await
                .expect("cancel")
        );
        assert_eq!(
            store
                .product(product.id)
                .await
                .expect("get")
                .expect("p")
                .stock,
            4
        );

        // Already cancelled: rejected, stock unchanged.
        assert!(
            !store
                .cancel_order_and_restock(order.id, user)
                .await
                .expect("cancel")
        );
        assert_eq!(
            store
                .product(product.id)
                .await
                .expect("get")
                .expect("p")
                .stock,
            4
        );
    }

    #[tokio::test]
    async fn test_one_cart_per_user() {
        let store = MemoryStore::new();
        let first = store.get_or_create_cart(UserId::new(3)).await.expect("cart");
        let second = store.get_or_create_cart(UserId::new(3)).await.expect("cart");
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_duplicate_review_conflict() {
        let store = MemoryStore::new();
        let product = store
            .create_product(new_product("Mug", Decimal::new(500, 2), 5))
            .await
            .expect("create");
        let review = NewReview {
            product_id: product.id,
            user_id: UserId::new(1),
            rating: 5,
            comment: None,
            verified_purchase: false,
        };
        store.insert_review(review.clone()).await.expect("insert");
        let err = store.insert_review(review).await.expect_err("duplicate");
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
