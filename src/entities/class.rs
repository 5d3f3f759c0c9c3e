//! Class entity - A recurring offering students buy credits for.
//!
//! A class carries a recurrence rule and a nominal time window. The window's start
//! anchors the first generated session when none exist yet, and its length sets the
//! duration of every generated session. Coach and branch metadata is copied onto
//! each session generated for the class.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of class offering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassType {
    /// Regular weekly-style class
    #[sea_orm(string_value = "REGULAR")]
    Regular,
    /// Holiday camp; defaults to daily sessions
    #[sea_orm(string_value = "CAMP")]
    Camp,
    /// One-to-one lessons
    #[sea_orm(string_value = "PRIVATE")]
    Private,
    /// Small-group lessons
    #[sea_orm(string_value = "GROUP")]
    Group,
}

/// Class database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "classes")]
pub struct Model {
    /// Unique identifier for the class
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Offering kind
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub class_type: ClassType,
    /// Display name shown to admins and guardians
    pub title: String,
    pub description: Option<String>,
    pub capacity: Option<i32>,
    /// JSON array of coach ids, copied onto generated sessions
    pub coach_ids: Option<Json>,
    pub branch_id: Option<String>,
    /// Nominal start of the class; seeds the first generated session
    pub start_time: Option<DateTimeUtc>,
    /// Nominal end; `end_time - start_time` is the session duration
    pub end_time: Option<DateTimeUtc>,
    /// Free-form rule, matched by substring (`DAILY`, `WEEKLY`, `MONTHLY`)
    pub recurrence_rule: Option<String>,
    /// Inactive classes cannot receive new credits
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Class and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One class has many sessions
    #[sea_orm(has_many = "super::session::Entity")]
    Sessions,
    /// One class has many enrollments
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
