//! Order business logic - storing orders and recording their fulfillment.
//!
//! Orders arrive from the storefront as `PENDING_PAYMENT` with a JSON array of line
//! items. Payment confirmation replaces that array with fulfilled snapshots and marks
//! the order `PAID` in a single write.

use crate::{
    entities::{Order, OrderStatus, order},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde_json::Value;

/// Input for [`create_order`].
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: String,
    pub student_id: String,
    pub order_items: Value,
    pub total_amount: f64,
    pub discount_id: Option<String>,
    pub discount_amount: f64,
    pub final_price: f64,
    pub notes: Option<String>,
}

/// Stores a new order awaiting payment.
///
/// # Errors
/// Returns `Error::InvalidInput` if the student is missing or `order_items` is not an array.
pub async fn create_order(db: &DatabaseConnection, input: NewOrder) -> Result<order::Model> {
    if input.student_id.trim().is_empty() {
        return Err(Error::invalid_input("Order student_id cannot be empty"));
    }
    if !input.order_items.is_array() {
        return Err(Error::invalid_input("order_items must be an array"));
    }

    let now = Utc::now();
    let order = order::ActiveModel {
        id: Set(super::new_id()),
        user_id: Set(input.user_id),
        student_id: Set(input.student_id),
        order_items: Set(input.order_items),
        total_amount: Set(input.total_amount),
        discount_id: Set(input.discount_id),
        discount_amount: Set(input.discount_amount),
        final_price: Set(input.final_price),
        status: Set(OrderStatus::PendingPayment),
        paid_at: Set(None),
        notes: Set(input.notes),
        created_at: Set(now),
        updated_at: Set(now),
    };

    order.insert(db).await.map_err(Into::into)
}

/// Retrieves an order by id.
pub async fn get_order_by_id(
    db: &DatabaseConnection,
    order_id: &str,
) -> Result<Option<order::Model>> {
    Order::find_by_id(order_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists orders, most recently updated first, optionally filtered by status.
pub async fn list_orders(
    db: &DatabaseConnection,
    status: Option<OrderStatus>,
) -> Result<Vec<order::Model>> {
    let mut query = Order::find().order_by_desc(order::Column::UpdatedAt);
    if let Some(status) = status {
        query = query.filter(order::Column::Status.eq(status));
    }
    query.all(db).await.map_err(Into::into)
}

/// Records a confirmed payment: status `PAID`, `paid_at`, and the fulfilled item snapshots.
pub async fn mark_order_paid(
    db: &DatabaseConnection,
    order: order::Model,
    fulfilled_items: Vec<Value>,
    paid_at: DateTime<Utc>,
) -> Result<order::Model> {
    let mut model: order::ActiveModel = order.into();
    model.status = Set(OrderStatus::Paid);
    model.paid_at = Set(Some(paid_at));
    model.order_items = Set(Value::Array(fulfilled_items));
    model.updated_at = Set(paid_at);
    model.update(db).await.map_err(Into::into)
}

/// Parses an order status query value such as `PAID` or `pending-payment`.
pub fn parse_order_status(value: &str) -> Result<OrderStatus> {
    match value.trim().replace('-', "_").to_ascii_uppercase().as_str() {
        "PENDING_PAYMENT" => Ok(OrderStatus::PendingPayment),
        "PAID" => Ok(OrderStatus::Paid),
        "CANCELLED" => Ok(OrderStatus::Cancelled),
        "REFUNDED" => Ok(OrderStatus::Refunded),
        other => Err(Error::invalid_input(format!("Unknown order status '{other}'"))),
    }
}
