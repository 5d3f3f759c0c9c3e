//! Enrollment ledger - per (student, class) credit balances.
//!
//! A purchase creates the ledger row the first time and tops it up afterwards: both
//! `total_credits` and `remaining_credits` grow by the purchased amount, and the expiry
//! date only ever moves later. Increments are applied with a single
//! `UPDATE ... SET total_credits = total_credits + n` so concurrent top-ups cannot lose
//! each other's credits.

use crate::{
    core::class::list_classes_by_ids,
    entities::{Enrollment, EnrollmentStatus, enrollment},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// A credit purchase to apply to the ledger.
#[derive(Debug, Clone)]
pub struct CreditPurchase {
    pub student_id: String,
    pub class_id: String,
    pub credits: i32,
    pub expiry_date: Option<NaiveDate>,
}

/// Admin edits to a ledger row. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnrollmentUpdate {
    pub total_credits: Option<i32>,
    pub remaining_credits: Option<i32>,
    /// `Some(None)` clears the expiry date
    #[serde(default, deserialize_with = "deserialize_present")]
    pub expiry_date: Option<Option<NaiveDate>>,
    pub status: Option<EnrollmentStatus>,
}

fn deserialize_present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A guardian-facing view of one enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentSummary {
    pub id: String,
    pub student_id: String,
    pub class_id: String,
    pub class_name: String,
    pub total_credits: i32,
    pub remaining_credits: i32,
    /// Credits already consumed, never negative
    pub attended_credits: i32,
    pub expiry_date: Option<NaiveDate>,
    pub status: EnrollmentStatus,
}

/// Returns the later of two optional dates; a missing candidate keeps the current one.
#[must_use]
pub fn pick_later_date(current: Option<NaiveDate>, candidate: Option<NaiveDate>) -> Option<NaiveDate> {
    match (current, candidate) {
        (Some(current), Some(candidate)) => Some(current.max(candidate)),
        (current, None) => current,
        (None, candidate) => candidate,
    }
}

/// Parses an enrollment status query value.
pub fn parse_enrollment_status(value: &str) -> Result<EnrollmentStatus> {
    match value.trim().to_ascii_uppercase().as_str() {
        "ACTIVE" => Ok(EnrollmentStatus::Active),
        "EXPIRED" => Ok(EnrollmentStatus::Expired),
        "CANCELLED" => Ok(EnrollmentStatus::Cancelled),
        other => Err(Error::invalid_input(format!(
            "Unknown enrollment status '{other}'"
        ))),
    }
}

/// Finds the ledger row for a student in a class.
pub async fn get_enrollment_by_student_and_class(
    db: &DatabaseConnection,
    student_id: &str,
    class_id: &str,
) -> Result<Option<enrollment::Model>> {
    Enrollment::find()
        .filter(enrollment::Column::StudentId.eq(student_id))
        .filter(enrollment::Column::ClassId.eq(class_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Adds purchased credits to a student's balance for a class.
///
/// Creates an `ACTIVE` row on first purchase; otherwise increments both balances,
/// reactivates the row, and keeps the later of the two expiry dates.
pub async fn upsert_enrollment_credits(
    db: &DatabaseConnection,
    purchase: &CreditPurchase,
) -> Result<enrollment::Model> {
    if purchase.credits <= 0 {
        return Err(Error::InvalidCredits {
            credits: f64::from(purchase.credits),
        });
    }

    let now = chrono::Utc::now();
    let Some(existing) =
        get_enrollment_by_student_and_class(db, &purchase.student_id, &purchase.class_id).await?
    else {
        debug!(
            student_id = %purchase.student_id,
            class_id = %purchase.class_id,
            credits = purchase.credits,
            "Creating enrollment"
        );
        let created = enrollment::ActiveModel {
            id: Set(super::new_id()),
            student_id: Set(purchase.student_id.clone()),
            class_id: Set(purchase.class_id.clone()),
            total_credits: Set(purchase.credits),
            remaining_credits: Set(purchase.credits),
            expiry_date: Set(purchase.expiry_date),
            status: Set(EnrollmentStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        };
        return created.insert(db).await.map_err(Into::into);
    };

    debug!(
        enrollment_id = %existing.id,
        credits = purchase.credits,
        "Topping up enrollment"
    );
    let expiry_date = pick_later_date(existing.expiry_date, purchase.expiry_date);
    Enrollment::update_many()
        .col_expr(
            enrollment::Column::TotalCredits,
            Expr::col(enrollment::Column::TotalCredits).add(purchase.credits),
        )
        .col_expr(
            enrollment::Column::RemainingCredits,
            Expr::col(enrollment::Column::RemainingCredits).add(purchase.credits),
        )
        .col_expr(enrollment::Column::ExpiryDate, Expr::value(expiry_date))
        .col_expr(
            enrollment::Column::Status,
            Expr::value(EnrollmentStatus::Active),
        )
        .col_expr(enrollment::Column::UpdatedAt, Expr::value(now))
        .filter(enrollment::Column::Id.eq(existing.id.as_str()))
        .exec(db)
        .await?;

    Enrollment::find_by_id(existing.id.clone())
        .one(db)
        .await?
        .ok_or(Error::EnrollmentNotFound {
            enrollment_id: existing.id,
        })
}

/// Lists ledger rows, newest first, optionally filtered by status.
pub async fn list_enrollments(
    db: &DatabaseConnection,
    status: Option<EnrollmentStatus>,
) -> Result<Vec<enrollment::Model>> {
    let mut query = Enrollment::find().order_by_desc(enrollment::Column::CreatedAt);
    if let Some(status) = status {
        query = query.filter(enrollment::Column::Status.eq(status));
    }
    query.all(db).await.map_err(Into::into)
}

/// Lists every ledger row belonging to the given students.
pub async fn list_enrollments_by_student_ids(
    db: &DatabaseConnection,
    student_ids: &[String],
) -> Result<Vec<enrollment::Model>> {
    if student_ids.is_empty() {
        return Ok(Vec::new());
    }
    Enrollment::find()
        .filter(enrollment::Column::StudentId.is_in(student_ids.iter().cloned()))
        .order_by_asc(enrollment::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies an admin edit, enforcing `0 <= remaining_credits <= total_credits`.
pub async fn update_enrollment(
    db: &DatabaseConnection,
    enrollment_id: &str,
    update: EnrollmentUpdate,
) -> Result<enrollment::Model> {
    let existing = Enrollment::find_by_id(enrollment_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::EnrollmentNotFound {
            enrollment_id: enrollment_id.to_string(),
        })?;

    let total = update.total_credits.unwrap_or(existing.total_credits);
    let remaining = update.remaining_credits.unwrap_or(existing.remaining_credits);
    if total < 0 || remaining < 0 || remaining > total {
        return Err(Error::invalid_input(
            "Remaining credits cannot exceed total credits, or the value is invalid",
        ));
    }

    let mut model: enrollment::ActiveModel = existing.into();
    model.total_credits = Set(total);
    model.remaining_credits = Set(remaining);
    if let Some(expiry_date) = update.expiry_date {
        model.expiry_date = Set(expiry_date);
    }
    if let Some(status) = update.status {
        model.status = Set(status);
    }
    model.updated_at = Set(chrono::Utc::now());
    model.update(db).await.map_err(Into::into)
}

/// Builds the guardian-facing credit summary for one student.
pub async fn list_enrollment_summaries(
    db: &DatabaseConnection,
    student_id: &str,
) -> Result<Vec<EnrollmentSummary>> {
    let enrollments = list_enrollments_by_student_ids(db, &[student_id.to_string()]).await?;
    if enrollments.is_empty() {
        return Ok(Vec::new());
    }

    let mut class_ids: Vec<String> = enrollments.iter().map(|e| e.class_id.clone()).collect();
    class_ids.sort();
    class_ids.dedup();
    let class_names: HashMap<String, String> = list_classes_by_ids(db, &class_ids)
        .await?
        .into_iter()
        .map(|class| (class.id, class.title))
        .collect();

    Ok(enrollments
        .into_iter()
        .map(|record| EnrollmentSummary {
            class_name: class_names
                .get(&record.class_id)
                .cloned()
                .unwrap_or_else(|| record.class_id.clone()),
            attended_credits: (record.total_credits - record.remaining_credits).max(0),
            id: record.id,
            student_id: record.student_id,
            class_id: record.class_id,
            total_credits: record.total_credits,
            remaining_credits: record.remaining_credits,
            expiry_date: record.expiry_date,
            status: record.status,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn purchase(credits: i32, expiry_date: Option<NaiveDate>) -> CreditPurchase {
        CreditPurchase {
            student_id: "student-1".to_string(),
            class_id: "swim".to_string(),
            credits,
            expiry_date,
        }
    }

    #[test]
    fn test_pick_later_date() {
        let june = Some(date(2025, 6, 1));
        let march = Some(date(2025, 3, 1));
        assert_eq!(pick_later_date(june, march), june);
        assert_eq!(pick_later_date(march, june), june);
        assert_eq!(pick_later_date(june, None), june);
        assert_eq!(pick_later_date(None, march), march);
        assert_eq!(pick_later_date(None, None), None);
    }

    #[tokio::test]
    async fn test_upsert_rejects_non_positive_credits() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = upsert_enrollment_credits(&db, &purchase(0, None)).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidCredits { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_creates_then_tops_up() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_class(&db, "swim").await?;

        let first = upsert_enrollment_credits(&db, &purchase(8, None)).await?;
        assert_eq!(first.total_credits, 8);
        assert_eq!(first.remaining_credits, 8);
        assert_eq!(first.status, EnrollmentStatus::Active);

        let second = upsert_enrollment_credits(&db, &purchase(4, None)).await?;
        assert_eq!(second.id, first.id);
        assert_eq!(second.total_credits, 12);
        assert_eq!(second.remaining_credits, 12);

        let all = list_enrollments(&db, None).await?;
        assert_eq!(all.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_top_up_never_moves_expiry_backwards() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_class(&db, "swim").await?;

        upsert_enrollment_credits(&db, &purchase(4, Some(date(2025, 6, 1)))).await?;
        let topped_up =
            upsert_enrollment_credits(&db, &purchase(4, Some(date(2025, 3, 1)))).await?;

        assert_eq!(topped_up.expiry_date, Some(date(2025, 6, 1)));
        Ok(())
    }

    #[tokio::test]
    async fn test_top_up_reactivates_enrollment() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_class(&db, "swim").await?;
        let created = upsert_enrollment_credits(&db, &purchase(2, None)).await?;
        update_enrollment(
            &db,
            &created.id,
            EnrollmentUpdate {
                status: Some(EnrollmentStatus::Expired),
                ..Default::default()
            },
        )
        .await?;

        let topped_up = upsert_enrollment_credits(&db, &purchase(2, None)).await?;
        assert_eq!(topped_up.status, EnrollmentStatus::Active);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_enrollment_enforces_balance_invariant() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_class(&db, "swim").await?;
        let created = upsert_enrollment_credits(&db, &purchase(5, None)).await?;

        let result = update_enrollment(
            &db,
            &created.id,
            EnrollmentUpdate {
                remaining_credits: Some(6),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::InvalidInput { .. }));

        let updated = update_enrollment(
            &db,
            &created.id,
            EnrollmentUpdate {
                remaining_credits: Some(3),
                expiry_date: Some(Some(date(2025, 12, 31))),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.remaining_credits, 3);
        assert_eq!(updated.total_credits, 5);
        assert_eq!(updated.expiry_date, Some(date(2025, 12, 31)));

        let missing = update_enrollment(&db, "nope", EnrollmentUpdate::default()).await;
        assert!(matches!(
            missing.unwrap_err(),
            Error::EnrollmentNotFound { .. }
        ));
        Ok(())
    }

    #[test]
    fn test_enrollment_update_distinguishes_null_from_absent() {
        let cleared: EnrollmentUpdate = serde_json::from_str(r#"{"expiry_date": null}"#).unwrap();
        assert_eq!(cleared.expiry_date, Some(None));

        let untouched: EnrollmentUpdate = serde_json::from_str(r#"{"total_credits": 3}"#).unwrap();
        assert_eq!(untouched.expiry_date, None);
        assert_eq!(untouched.total_credits, Some(3));
    }

    #[tokio::test]
    async fn test_list_enrollment_summaries() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_class(&db, "swim").await?;
        let created = upsert_enrollment_credits(&db, &purchase(10, None)).await?;
        update_enrollment(
            &db,
            &created.id,
            EnrollmentUpdate {
                remaining_credits: Some(7),
                ..Default::default()
            },
        )
        .await?;
        create_test_class(&db, "judo").await?;
        upsert_enrollment_credits(
            &db,
            &CreditPurchase {
                class_id: "judo".to_string(),
                ..purchase(1, None)
            },
        )
        .await?;

        let summaries = list_enrollment_summaries(&db, "student-1").await?;
        assert_eq!(summaries.len(), 2);
        let swim = summaries.iter().find(|s| s.class_id == "swim").unwrap();
        assert_eq!(swim.class_name, "Test Class swim");
        assert_eq!(swim.total_credits, 10);
        assert_eq!(swim.attended_credits, 3);
        let judo = summaries.iter().find(|s| s.class_id == "judo").unwrap();
        assert_eq!(judo.attended_credits, 0);

        assert!(list_enrollment_summaries(&db, "nobody").await?.is_empty());
        Ok(())
    }
}
