//! Orders: immutable snapshots of a checked-out cart.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vendora_core::{OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, ShopId, UserId};

/// A postal address, used for both shipping and billing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// An order. Immutable once created, except status, payment fields, and
/// their timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-readable unique external identifier, e.g. `ORD-20250304-8F3A01BC`.
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_cost: Decimal,
    pub discount_amount: Decimal,
    pub shipping: Address,
    pub billing: Address,
    /// Opaque gateway identifier, set after intent creation.
    pub payment_intent_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Derived total: `subtotal + tax + shipping - discount`.
    #[must_use]
    pub fn final_amount(&self) -> Decimal {
        self.subtotal + self.tax_amount + self.shipping_cost - self.discount_amount
    }
}

/// A line of an order, with the unit price captured at order time so later
/// product price changes don't affect historical orders.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// Product name snapshot taken at order time.
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// Whether the buyer has reviewed this line's product.
    pub reviewed: bool,
}

impl OrderItem {
    /// Derived line total: `quantity * unit_price`.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }
}

/// One line of an order draft, snapshotted from the cart.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// Everything the store needs to place an order atomically.
///
/// `Store::place_order` re-verifies stock for every line, decrements it, and
/// inserts the order plus its items as one all-or-nothing unit.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub order_number: String,
    pub payment_method: PaymentMethod,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_cost: Decimal,
    pub discount_amount: Decimal,
    pub shipping: Address,
    pub billing: Address,
    pub lines: Vec<OrderLine>,
}

/// Partial update of an order's mutable fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct OrderChanges {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_intent_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Raw aggregates over the order set, as returned by the store.
#[derive(Debug, Clone)]
pub struct OrderTotals {
    pub total_orders: i64,
    /// Sum of final amounts.
    pub total_revenue: Decimal,
    pub pending_orders: i64,
    pub delivered_orders: i64,
}

/// Order statistics, optionally scoped to one shop.
#[derive(Debug, Clone, Serialize)]
pub struct OrderStats {
    pub shop_id: Option<ShopId>,
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub pending_orders: i64,
    pub delivered_orders: i64,
    /// `total_revenue / total_orders`, zero when there are no orders.
    pub average_order_value: Decimal,
}
