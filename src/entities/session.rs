//! Session entity - One dated occurrence of a class.
//!
//! Sessions are created lazily by the session generator when a purchase needs more
//! future slots than exist. They are never deleted by fulfillment.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Upcoming
    #[sea_orm(string_value = "SCHEDULED")]
    Scheduled,
    /// Took place
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    /// Called off; hidden from default listings
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

/// Session database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    /// Unique identifier; previews use `temp-<classId>-<startTimeISO>`
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owning class
    pub class_id: String,
    pub coach_ids: Option<Json>,
    pub branch_id: Option<String>,
    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,
    pub status: SessionStatus,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Session and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each session belongs to one class
    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id"
    )]
    Class,
    /// One session has many attendance records
    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendance,
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
