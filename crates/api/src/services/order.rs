//! Order workflow.
//!
//! Converts a cart into an immutable order, reserving stock through the
//! store's atomic `place_order`, and coordinates with the payment gateway.
//!
//! Two steps deliberately happen *outside* the atomic unit, preserving the
//! behavior this service was modeled on: the cart is cleared after the
//! order has committed, and the payment intent is created after that,
//! best-effort. A crash in between leaves a placed order with a full cart,
//! or an order without an intent; `POST /payments/create-intent` recovers
//! the latter.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;

use vendora_core::{
    OrderId, OrderStatus, PaymentMethod, PaymentStatus, Principal, ShopId, UserId, to_minor_units,
};

use crate::error::{AppError, Result};
use crate::models::{Address, Order, OrderChanges, OrderDraft, OrderLine, OrderStats};
use crate::payments::PaymentGateway;
use crate::services::cart::CartService;
use crate::store::Store;

/// Checkout request: payment method, caller-supplied monetary adjustments,
/// and addresses. Billing defaults to the shipping address.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub tax_amount: Decimal,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub discount_amount: Decimal,
    pub shipping: Address,
    pub billing: Option<Address>,
}

/// Order workflow.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    carts: CartService,
    currency: String,
}

impl OrderService {
    /// Create the service over injected store and gateway.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>, currency: String) -> Self {
        let carts = CartService::new(Arc::clone(&store));
        Self {
            store,
            gateway,
            carts,
            currency,
        }
    }

    /// Create an order from the user's cart.
    ///
    /// Snapshots the cart at live prices, places the order through the
    /// store's atomic unit (stock re-check + decrement + insert, all or
    /// nothing), clears the cart, and, unless paying on delivery, creates
    /// a payment intent for the final amount, persisting the intent id onto
    /// the order. Gateway failure after commit is logged, not propagated.
    pub async fn create_from_cart(&self, user: UserId, request: CheckoutRequest) -> Result<Order> {
        validate_amounts(&request)?;

        let cart = self.carts.snapshot(user).await?;
        if cart.items.is_empty() {
            return Err(AppError::InvalidInput("cart is empty".to_owned()));
        }

        let lines: Vec<OrderLine> = cart
            .items
            .iter()
            .map(|item| OrderLine {
                product_id: item.product_id,
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.product_price,
            })
            .collect();

        let billing = request.billing.unwrap_or_else(|| request.shipping.clone());
        let draft = OrderDraft {
            user_id: user,
            order_number: generate_order_number(Utc::now()),
            payment_method: request.payment_method,
            subtotal: cart.total_amount,
            tax_amount: request.tax_amount,
            shipping_cost: request.shipping_cost,
            discount_amount: request.discount_amount,
            shipping: request.shipping,
            billing,
            lines,
        };

        let mut order = self.store.place_order(draft).await?;
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            user_id = %user,
            amount = %order.final_amount(),
            "order placed"
        );

        // Post-commit: cart clear and intent creation are outside the
        // atomic unit, see the module docs.
        self.carts.clear(user).await?;

        if order.payment_method.requires_payment_intent() {
            match self.create_intent_for(&mut order).await {
                Ok(()) => {}
                Err(err) => {
                    tracing::warn!(
                        order_number = %order.order_number,
                        error = %err,
                        "payment intent creation failed; order kept without intent"
                    );
                }
            }
        }

        Ok(order)
    }

    /// Create an intent for the order's final amount and persist its id.
    async fn create_intent_for(&self, order: &mut Order) -> Result<()> {
        let amount = to_minor_units(order.final_amount()).ok_or_else(|| {
            AppError::InvalidInput("order amount out of range for payment".to_owned())
        })?;
        let intent = self
            .gateway
            .create_intent(amount, &self.currency, &order.order_number)
            .await?;

        self.store
            .update_order(
                order.id,
                OrderChanges {
                    payment_intent_id: Some(intent.id.clone()),
                    ..OrderChanges::default()
                },
            )
            .await?;
        order.payment_intent_id = Some(intent.id);
        Ok(())
    }

    /// Fetch an order; the caller must own it or be an admin.
    pub async fn order(&self, principal: Principal, id: OrderId) -> Result<Order> {
        let order = self
            .store
            .order(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
        authorize_read(&order, principal)?;
        Ok(order)
    }

    /// Fetch an order by its human-readable number; owner or admin only.
    pub async fn order_by_number(&self, principal: Principal, number: &str) -> Result<Order> {
        let order = self
            .store
            .order_by_number(number)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {number} not found")))?;
        authorize_read(&order, principal)?;
        Ok(order)
    }

    /// The caller's orders, most recent first.
    pub async fn my_orders(&self, user: UserId) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_user(user).await?)
    }

    /// Orders containing the shop's products; shop owner or admin only.
    pub async fn orders_for_shop(&self, principal: Principal, shop: ShopId) -> Result<Vec<Order>> {
        self.authorize_shop(principal, shop).await?;
        Ok(self.store.orders_for_shop(shop).await?)
    }

    /// Orders in a given status (admin surface).
    pub async fn orders_with_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        Ok(self.store.orders_with_status(status).await?)
    }

    /// Cancel a `Pending` order, restoring every line's stock.
    ///
    /// Returns `false` if the order is missing, not owned by the caller, or
    /// no longer `Pending`; in that case nothing changes.
    pub async fn cancel(&self, user: UserId, id: OrderId) -> Result<bool> {
        let cancelled = self.store.cancel_order_and_restock(id, user).await?;
        if cancelled {
            tracing::info!(order_id = %id, user_id = %user, "order cancelled, stock restored");
        }
        Ok(cancelled)
    }

    /// Admin status update, validated against the legal transition graph.
    /// Stamps `shipped_at`/`delivered_at` on entry to those states.
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<()> {
        let order = self
            .store
            .order(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

        if !order.status.can_transition_to(status) {
            return Err(AppError::InvalidInput(format!(
                "illegal status transition: {} -> {status}",
                order.status
            )));
        }

        let now = Utc::now();
        let changes = OrderChanges {
            status: Some(status),
            shipped_at: stamp_if(status == OrderStatus::Shipped, now),
            delivered_at: stamp_if(status == OrderStatus::Delivered, now),
            ..OrderChanges::default()
        };
        self.store.update_order(id, changes).await?;
        Ok(())
    }

    /// Set an order's payment status.
    ///
    /// `Paid` stamps `paid_at` and forces the order into `Processing`
    /// regardless of its current status.
    pub async fn update_payment_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
        intent_id: Option<String>,
    ) -> Result<()> {
        // Existence check so callers get a 404 rather than a silent no-op.
        self.store
            .order(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

        let paid = status == PaymentStatus::Paid;
        let changes = OrderChanges {
            payment_status: Some(status),
            status: paid.then_some(OrderStatus::Processing),
            paid_at: stamp_if(paid, Utc::now()),
            payment_intent_id: intent_id,
            ..OrderChanges::default()
        };
        self.store.update_order(id, changes).await?;
        Ok(())
    }

    /// Compensating action for an admin refund: marks both payment status
    /// and order status `Refunded`, bypassing the admin transition graph.
    pub async fn mark_refunded(&self, id: OrderId) -> Result<()> {
        let changes = OrderChanges {
            status: Some(OrderStatus::Refunded),
            payment_status: Some(PaymentStatus::Refunded),
            ..OrderChanges::default()
        };
        if !self.store.update_order(id, changes).await? {
            return Err(AppError::NotFound(format!("order {id} not found")));
        }
        Ok(())
    }

    /// Counts and sums over the order set, optionally scoped to one shop.
    pub async fn stats(&self, shop: Option<ShopId>) -> Result<OrderStats> {
        let totals = self.store.order_totals(shop).await?;
        let average_order_value = if totals.total_orders > 0 {
            totals.total_revenue / Decimal::from(totals.total_orders)
        } else {
            Decimal::ZERO
        };
        Ok(OrderStats {
            shop_id: shop,
            total_orders: totals.total_orders,
            total_revenue: totals.total_revenue,
            pending_orders: totals.pending_orders,
            delivered_orders: totals.delivered_orders,
            average_order_value,
        })
    }

    /// Per-shop stats; shop owner or admin only.
    pub async fn stats_for_shop(&self, principal: Principal, shop: ShopId) -> Result<OrderStats> {
        self.authorize_shop(principal, shop).await?;
        self.stats(Some(shop)).await
    }

    async fn authorize_shop(&self, principal: Principal, shop: ShopId) -> Result<()> {
        let shop = self
            .store
            .shop(shop)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("shop {shop} not found")))?;
        if shop.owner_id != principal.user_id && !principal.is_admin() {
            return Err(AppError::Unauthorized(
                "you do not own this shop".to_owned(),
            ));
        }
        Ok(())
    }
}

fn authorize_read(order: &Order, principal: Principal) -> Result<()> {
    if order.user_id != principal.user_id && !principal.is_admin() {
        return Err(AppError::Unauthorized(
            "you are not allowed to view this order".to_owned(),
        ));
    }
    Ok(())
}

fn stamp_if(condition: bool, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    condition.then_some(now)
}

fn validate_amounts(request: &CheckoutRequest) -> Result<()> {
    for (name, amount) in [
        ("tax_amount", request.tax_amount),
        ("shipping_cost", request.shipping_cost),
        ("discount_amount", request.discount_amount),
    ] {
        if amount < Decimal::ZERO {
            return Err(AppError::InvalidInput(format!("{name} must not be negative")));
        }
    }
    Ok(())
}

/// Characters used in order-number suffixes (uppercase hex).
const SUFFIX_CHARSET: &[u8] = b"0123456789ABCDEF";
const SUFFIX_LENGTH: usize = 8;

/// Generate a date-stamped, human-readable order number:
/// `ORD-YYYYMMDD-` plus 8 random uppercase hex characters.
fn generate_order_number(now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..SUFFIX_CHARSET.len());
            SUFFIX_CHARSET[idx] as char
        })
        .collect();
    format!("ORD-{}-{suffix}", now.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewProduct, Product};
    use crate::payments::MockGateway;
    use crate::store::MemoryStore;

    fn address() -> Address {
        Address {
            address: "8 Market Lane".to_owned(),
            city: "Lyon".to_owned(),
            postal_code: "69002".to_owned(),
            country: "FR".to_owned(),
        }
    }

    fn checkout(method: PaymentMethod) -> CheckoutRequest {
        CheckoutRequest {
            payment_method: method,
            tax_amount: Decimal::new(100, 2),      // 1.00
            shipping_cost: Decimal::new(500, 2),   // 5.00
            discount_amount: Decimal::ZERO,
            shipping: address(),
            billing: None,
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        orders: OrderService,
        carts: CartService,
    }

    fn fixture_with_gateway(gateway: Arc<dyn PaymentGateway>) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let orders = OrderService::new(store.clone(), gateway, "eur".to_owned());
        let carts = CartService::new(store.clone());
        Fixture {
            store,
            orders,
            carts,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_gateway(Arc::new(MockGateway::new()))
    }

    async fn seed_product(store: &MemoryStore, name: &str, price: Decimal, stock: i32) -> Product {
        store
            .create_product(NewProduct {
                name: name.to_owned(),
                price,
                stock,
                shop_id: None,
                description: None,
                category: None,
                image_url: None,
            })
            .await
            .expect("create product")
    }

    #[test]
    fn test_order_number_format() {
        let now = "2025-03-04T10:00:00Z".parse().expect("timestamp");
        let number = generate_order_number(now);
        assert_eq!(number.len(), "ORD-20250304-".len() + SUFFIX_LENGTH);
        assert!(number.starts_with("ORD-20250304-"));
        let suffix = &number["ORD-20250304-".len()..];
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_lowercase()));
    }

    #[tokio::test]
    async fn test_checkout_decrements_stock_and_clears_cart() {
        let fx = fixture();
        let user = UserId::new(1);
        let a = seed_product(&fx.store, "Product A", Decimal::new(1000, 2), 5).await;
        let b = seed_product(&fx.store, "Product B", Decimal::new(750, 2), 2).await;
        fx.carts.add_item(user, a.id, 3).await.expect("add A");
        fx.carts.add_item(user, b.id, 2).await.expect("add B");

        let order = fx
            .orders
            .create_from_cart(user, checkout(PaymentMethod::CreditCard))
            .await
            .expect("checkout");

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        // subtotal = 3 x 10.00 + 2 x 7.50 = 45.00
        assert_eq!(order.subtotal, Decimal::new(4500, 2));
        // final = 45.00 + 1.00 + 5.00 - 0 = 51.00
        assert_eq!(order.final_amount(), Decimal::new(5100, 2));
        assert_eq!(order.items.len(), 2);
        assert!(order.payment_intent_id.is_some());

        let a_stock = fx.store.product(a.id).await.expect("get").expect("a").stock;
        let b_stock = fx.store.product(b.id).await.expect("get").expect("b").stock;
        assert_eq!(a_stock, 2);
        assert_eq!(b_stock, 0);

        let view = fx.carts.snapshot(user).await.expect("snapshot");
        assert!(view.items.is_empty());
    }

    #[tokio::test]
    async fn test_checkout_insufficient_stock_names_product_and_changes_nothing() {
        let fx = fixture();
        let user = UserId::new(1);
        let a = seed_product(&fx.store, "Product A", Decimal::new(1000, 2), 5).await;
        let b = seed_product(&fx.store, "Product B", Decimal::new(750, 2), 2).await;
        fx.carts.add_item(user, a.id, 3).await.expect("add A");
        fx.carts.add_item(user, b.id, 2).await.expect("add B");

        // Stock drains between add and checkout (advisory check raced).
        fx.store
            .update_product(
                b.id,
                crate::models::ProductUpdate {
                    name: "Product B".to_owned(),
                    price: Decimal::new(750, 2),
                    stock: 1,
                    description: None,
                    category: None,
                    image_url: None,
                },
            )
            .await
            .expect("drain stock");

        let err = fx
            .orders
            .create_from_cart(user, checkout(PaymentMethod::CreditCard))
            .await
            .expect_err("must fail");
        match err {
            AppError::InsufficientStock { product, .. } => assert_eq!(product, "Product B"),
            other => panic!("unexpected error: {other:?}"),
        }

        // No partial writes: A untouched, no order, cart intact.
        assert_eq!(fx.store.product(a.id).await.expect("get").expect("a").stock, 5);
        assert!(fx.orders.my_orders(user).await.expect("orders").is_empty());
        assert_eq!(fx.carts.item_count(user).await.expect("count"), 5);
    }

    #[tokio::test]
    async fn test_cash_on_delivery_skips_payment_intent() {
        let fx = fixture();
        let user = UserId::new(1);
        let a = seed_product(&fx.store, "Product A", Decimal::new(1000, 2), 5).await;
        fx.carts.add_item(user, a.id, 1).await.expect("add");

        let order = fx
            .orders
            .create_from_cart(user, checkout(PaymentMethod::CashOnDelivery))
            .await
            .expect("checkout");
        assert!(order.payment_intent_id.is_none());
    }

    #[tokio::test]
    async fn test_gateway_outage_keeps_the_order() {
        let fx = fixture_with_gateway(Arc::new(MockGateway::failing()));
        let user = UserId::new(1);
        let a = seed_product(&fx.store, "Product A", Decimal::new(1000, 2), 5).await;
        fx.carts.add_item(user, a.id, 2).await.expect("add");

        let order = fx
            .orders
            .create_from_cart(user, checkout(PaymentMethod::CreditCard))
            .await
            .expect("checkout succeeds despite gateway outage");

        assert!(order.payment_intent_id.is_none());
        assert_eq!(fx.store.product(a.id).await.expect("get").expect("a").stock, 3);
        // Committed: the order is queryable.
        assert_eq!(fx.orders.my_orders(user).await.expect("orders").len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_never_oversell() {
        let fx = fixture();
        let product = seed_product(&fx.store, "Last Unit", Decimal::new(900, 2), 3).await;

        let (alice, bob) = (UserId::new(1), UserId::new(2));
        fx.carts.add_item(alice, product.id, 2).await.expect("add");
        fx.carts.add_item(bob, product.id, 2).await.expect("add");

        let first = fx
            .orders
            .create_from_cart(alice, checkout(PaymentMethod::CreditCard));
        let second = fx
            .orders
            .create_from_cart(bob, checkout(PaymentMethod::CreditCard));
        let (first, second) = tokio::join!(first, second);

        // Combined quantity (4) exceeds stock (3): exactly one succeeds.
        assert_eq!(
            u8::from(first.is_ok()) + u8::from(second.is_ok()),
            1,
            "exactly one checkout must win"
        );
        let stock = fx
            .store
            .product(product.id)
            .await
            .expect("get")
            .expect("p")
            .stock;
        assert_eq!(stock, 1);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let fx = fixture();
        let user = UserId::new(1);
        let a = seed_product(&fx.store, "Product A", Decimal::new(1000, 2), 5).await;
        fx.carts.add_item(user, a.id, 3).await.expect("add");
        let order = fx
            .orders
            .create_from_cart(user, checkout(PaymentMethod::CashOnDelivery))
            .await
            .expect("checkout");

        assert!(fx.orders.cancel(user, order.id).await.expect("cancel"));
        assert_eq!(fx.store.product(a.id).await.expect("get").expect("a").stock, 5);

        // Cancelling again is rejected; stock stays put (no double restock).
        assert!(!fx.orders.cancel(user, order.id).await.expect("cancel"));
        assert_eq!(fx.store.product(a.id).await.expect("get").expect("a").stock, 5);
    }

    #[tokio::test]
    async fn test_status_transition_graph_enforced() {
        let fx = fixture();
        let user = UserId::new(1);
        let a = seed_product(&fx.store, "Product A", Decimal::new(1000, 2), 5).await;
        fx.carts.add_item(user, a.id, 1).await.expect("add");
        let order = fx
            .orders
            .create_from_cart(user, checkout(PaymentMethod::CashOnDelivery))
            .await
            .expect("checkout");

        // Pending -> Delivered is not legal.
        let err = fx
            .orders
            .update_status(order.id, OrderStatus::Delivered)
            .await
            .expect_err("must fail");
        assert!(matches!(err, AppError::InvalidInput(_)));

        fx.orders
            .update_status(order.id, OrderStatus::Processing)
            .await
            .expect("pending -> processing");
        fx.orders
            .update_status(order.id, OrderStatus::Shipped)
            .await
            .expect("processing -> shipped");
        fx.orders
            .update_status(order.id, OrderStatus::Delivered)
            .await
            .expect("shipped -> delivered");

        let principal = Principal::customer(user);
        let order = fx.orders.order(principal, order.id).await.expect("get");
        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(order.shipped_at.is_some());
        assert!(order.delivered_at.is_some());
    }

    #[tokio::test]
    async fn test_paid_forces_processing() {
        let fx = fixture();
        let user = UserId::new(1);
        let a = seed_product(&fx.store, "Product A", Decimal::new(1000, 2), 5).await;
        fx.carts.add_item(user, a.id, 1).await.expect("add");
        let order = fx
            .orders
            .create_from_cart(user, checkout(PaymentMethod::CreditCard))
            .await
            .expect("checkout");

        fx.orders
            .update_payment_status(order.id, PaymentStatus::Paid, Some("pi_test".to_owned()))
            .await
            .expect("mark paid");

        let order = fx
            .orders
            .order(Principal::customer(user), order.id)
            .await
            .expect("get");
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.status, OrderStatus::Processing);
        assert!(order.paid_at.is_some());
        assert_eq!(order.payment_intent_id.as_deref(), Some("pi_test"));
    }

    #[tokio::test]
    async fn test_order_read_authorization() {
        let fx = fixture();
        let user = UserId::new(1);
        let a = seed_product(&fx.store, "Product A", Decimal::new(1000, 2), 5).await;
        fx.carts.add_item(user, a.id, 1).await.expect("add");
        let order = fx
            .orders
            .create_from_cart(user, checkout(PaymentMethod::CashOnDelivery))
            .await
            .expect("checkout");

        let stranger = Principal::customer(UserId::new(2));
        assert!(matches!(
            fx.orders.order(stranger, order.id).await,
            Err(AppError::Unauthorized(_))
        ));

        let admin = Principal::admin(UserId::new(3));
        assert!(fx.orders.order(admin, order.id).await.is_ok());
        assert!(
            fx.orders
                .order_by_number(admin, &order.order_number)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_stats_average() {
        let fx = fixture();
        let user = UserId::new(1);
        let a = seed_product(&fx.store, "Product A", Decimal::new(1000, 2), 10).await;

        let empty = fx.orders.stats(None).await.expect("stats");
        assert_eq!(empty.total_orders, 0);
        assert_eq!(empty.average_order_value, Decimal::ZERO);

        for quantity in [1, 3] {
            fx.carts.add_item(user, a.id, quantity).await.expect("add");
            fx.orders
                .create_from_cart(
                    user,
                    CheckoutRequest {
                        payment_method: PaymentMethod::CashOnDelivery,
                        tax_amount: Decimal::ZERO,
                        shipping_cost: Decimal::ZERO,
                        discount_amount: Decimal::ZERO,
                        shipping: address(),
                        billing: None,
                    },
                )
                .await
                .expect("checkout");
        }

        let stats = fx.orders.stats(None).await.expect("stats");
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.pending_orders, 2);
        // revenue = 10.00 + 30.00; average = 20.00
        assert_eq!(stats.total_revenue, Decimal::new(4000, 2));
        assert_eq!(stats.average_order_value, Decimal::new(2000, 2));
    }
}
