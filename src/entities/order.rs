//! Order entity - A guardian's purchase of class credits for one student.
//!
//! `order_items` is a JSON snapshot of the purchased lines. Confirming payment
//! rewrites it with the fulfilled enrollment details and flips the status to `PAID`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment state of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Waiting for an admin to confirm payment
    #[sea_orm(string_value = "PENDING_PAYMENT")]
    PendingPayment,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
    #[sea_orm(string_value = "REFUNDED")]
    Refunded,
}

impl OrderStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }
}

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Buyer (guardian's LINE user id)
    pub user_id: String,
    /// Student receiving the credits
    pub student_id: String,
    /// Array of order item snapshots
    pub order_items: Json,
    pub total_amount: f64,
    pub discount_id: Option<String>,
    pub discount_amount: f64,
    pub final_price: f64,
    pub status: OrderStatus,
    pub paid_at: Option<DateTimeUtc>,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// `Order` has no relationships modelled at this layer
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
