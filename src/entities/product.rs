//! Product entity - A purchasable catalog entry.
//!
//! Only the fields fulfillment needs are modelled: previews show the product name
//! next to each order line.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Name of the product (e.g., "Spring Swim Term")
    pub name: String,
    pub description: Option<String>,
    /// Hidden from the storefront when false
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// `Product` has no relationships modelled at this layer
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
