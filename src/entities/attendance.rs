//! Attendance entity - One student's seat in one session.
//!
//! The existence of a row for a (session, student) pair is what marks that slot as
//! taken. Rows are created `UNRECORDED` when credits are allocated and later moved to
//! `PRESENT`, `ABSENT` or `LEAVE`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Attendance outcome for a booked slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "PRESENT")]
    Present,
    #[sea_orm(string_value = "ABSENT")]
    Absent,
    #[sea_orm(string_value = "LEAVE")]
    Leave,
    /// Booked, nothing recorded yet
    #[sea_orm(string_value = "UNRECORDED")]
    Unrecorded,
}

/// Attendance database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub session_id: String,
    pub student_id: String,
    pub status: AttendanceStatus,
    /// Credits consumed by this slot (always 1 when allocated by fulfillment)
    pub credits_used: i32,
    pub notes: Option<String>,
    pub is_makeup: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Attendance and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each attendance record belongs to one session
    #[sea_orm(
        belongs_to = "super::session::Entity",
        from = "Column::SessionId",
        to = "super::session::Column::Id"
    )]
    Session,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
