//! Shared test utilities for the enrollment desk.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        class::{self, NewClass},
        order::{self, NewOrder},
        session::{self, SessionDraft},
    },
    entities::{self, ClassType},
    errors::Result,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Routes `tracing` output through the test harness. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Nominal start of every test class: Monday 2025-01-06 10:00 UTC.
#[must_use]
pub fn default_class_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Input for a weekly 90-minute class.
///
/// # Defaults
/// * `title`: `"Test Class <id>"`
/// * `start_time`: [`default_class_start`] unless `start` is given
/// * `recurrence_rule`: `"FREQ=WEEKLY"`
/// * `is_active`: true
#[must_use]
pub fn weekly_class_input(id: &str, start: Option<DateTime<Utc>>) -> NewClass {
    let start = start.unwrap_or_else(default_class_start);
    NewClass {
        id: Some(id.to_string()),
        class_type: ClassType::Regular,
        title: format!("Test Class {id}"),
        start_time: Some(start),
        end_time: Some(start + Duration::minutes(90)),
        recurrence_rule: Some("FREQ=WEEKLY".to_string()),
        capacity: Some(12),
        coach_ids: None,
        branch_id: None,
        is_active: true,
    }
}

/// Creates an active weekly test class with id `id`.
pub async fn create_test_class(
    db: &DatabaseConnection,
    id: &str,
) -> Result<entities::class::Model> {
    class::create_class(db, weekly_class_input(id, None)).await
}

/// Stores `count` weekly sessions for a class, the first on Monday 2025-03-03 10:00 UTC.
pub async fn create_test_sessions(
    db: &DatabaseConnection,
    class_id: &str,
    count: i64,
) -> Result<Vec<entities::session::Model>> {
    let first = default_class_start() + Duration::weeks(8);
    let drafts = (0..count)
        .map(|week| {
            let start = first + Duration::weeks(week);
            SessionDraft {
                class_id: class_id.to_string(),
                coach_ids: None,
                branch_id: None,
                start_time: start,
                end_time: start + Duration::minutes(90),
            }
        })
        .collect();
    session::create_sessions(db, drafts).await
}

/// Order items with one line enrolling into one class.
#[must_use]
pub fn single_class_items(
    product_id: &str,
    class_id: &str,
    credits_per_unit: u32,
    quantity: u32,
) -> Value {
    json!([{
        "product_id": product_id,
        "quantity": quantity,
        "enrollments": [{ "class_id": class_id, "credits_added": credits_per_unit }],
    }])
}

/// Order input with zeroed prices.
#[must_use]
pub fn order_input(student_id: &str, order_items: Value) -> NewOrder {
    NewOrder {
        user_id: "line-user-1".to_string(),
        student_id: student_id.to_string(),
        order_items,
        total_amount: 0.0,
        discount_id: None,
        discount_amount: 0.0,
        final_price: 0.0,
        notes: None,
    }
}

/// Creates a `PENDING_PAYMENT` order for a student.
pub async fn create_test_order(
    db: &DatabaseConnection,
    student_id: &str,
    order_items: Value,
) -> Result<entities::order::Model> {
    order::create_order(db, order_input(student_id, order_items)).await
}
