//! Payment preview and confirmation for pending orders.

use crate::{
    core::order::{get_order_by_id, mark_order_paid},
    entities::{OrderStatus, order},
    errors::{Error, Result},
    fulfillment::{
        effects::{PersistingEffects, PreviewEffects},
        orchestrator::{FulfillmentRequest, PaymentPreview, fulfill_order},
    },
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Loads an order and checks that it is still awaiting payment.
async fn load_pending_order(db: &DatabaseConnection, order_id: &str) -> Result<order::Model> {
    let order_id = order_id.trim();
    if order_id.is_empty() {
        return Err(Error::MissingOrderId);
    }

    let order = get_order_by_id(db, order_id)
        .await?
        .ok_or_else(|| Error::OrderNotFound {
            order_id: order_id.to_string(),
        })?;
    if order.status != OrderStatus::PendingPayment {
        return Err(Error::OrderNotPending {
            order_id: order.id,
            status: order.status.as_str().to_string(),
        });
    }
    Ok(order)
}

/// Shows what confirming the order would credit and book, without writing anything.
#[instrument(skip(db, credits_overrides))]
pub async fn preview_order_payment(
    db: &DatabaseConnection,
    order_id: &str,
    credits_overrides: HashMap<String, f64>,
    now: DateTime<Utc>,
) -> Result<PaymentPreview> {
    let order = load_pending_order(db, order_id).await?;
    let request = FulfillmentRequest {
        excluded_session_ids: Vec::new(),
        credits_overrides,
    };
    let outcome = fulfill_order(db, &order, &request, &PreviewEffects, now).await?;
    Ok(outcome.preview)
}

/// Credits, books, and marks the order `PAID`.
///
/// The order row is written last, so any failure leaves it `PENDING_PAYMENT`.
#[instrument(skip(db, request))]
pub async fn confirm_order_payment(
    db: &DatabaseConnection,
    order_id: &str,
    request: &FulfillmentRequest,
    now: DateTime<Utc>,
) -> Result<order::Model> {
    let order = load_pending_order(db, order_id).await?;
    let outcome = fulfill_order(db, &order, request, &PersistingEffects::new(db), now).await?;
    let paid = mark_order_paid(db, order, outcome.fulfilled_items, now).await?;
    info!(order_id = %paid.id, "Order payment confirmed");
    Ok(paid)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{
            attendance::list_attendance_by_student, class::create_class,
            enrollment::get_enrollment_by_student_and_class,
        },
        test_utils::*,
    };
    use chrono::TimeZone;
    use serde_json::json;

    fn march_first() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_order_lookup_errors() -> Result<()> {
        let db = setup_test_db().await?;
        let request = FulfillmentRequest::default();

        let missing_id = confirm_order_payment(&db, "  ", &request, march_first()).await;
        assert!(matches!(missing_id.unwrap_err(), Error::MissingOrderId));

        let unknown = preview_order_payment(&db, "nope", HashMap::new(), march_first()).await;
        assert!(matches!(unknown.unwrap_err(), Error::OrderNotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_confirm_marks_order_paid() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;
        create_test_class(&db, "swim").await?;
        let order = create_test_order(&db, "student-1", single_class_items("p1", "swim", 2, 1)).await?;

        let paid = confirm_order_payment(&db, &order.id, &FulfillmentRequest::default(), march_first())
            .await?;
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.paid_at, Some(march_first()));
        let enrollment_id = get_enrollment_by_student_and_class(&db, "student-1", "swim")
            .await?
            .unwrap()
            .id;
        assert_eq!(
            paid.order_items[0]["enrollments"][0]["enrollment_id"],
            json!(enrollment_id)
        );

        // A second confirmation or preview is refused
        let again = confirm_order_payment(&db, &order.id, &FulfillmentRequest::default(), march_first())
            .await;
        assert!(matches!(again.unwrap_err(), Error::OrderNotPending { .. }));
        let preview = preview_order_payment(&db, &order.id, HashMap::new(), march_first()).await;
        assert!(matches!(preview.unwrap_err(), Error::OrderNotPending { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_preview_then_confirm_with_exclusion() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_class(&db, "swim").await?;
        let order = create_test_order(&db, "student-1", single_class_items("p1", "swim", 2, 1)).await?;

        let preview = preview_order_payment(&db, &order.id, HashMap::new(), march_first()).await?;
        let planned = &preview.items[0].enrollments[0].sessions;
        assert_eq!(planned.len(), 2);
        assert!(planned.iter().all(|s| s.is_new));

        let request = FulfillmentRequest {
            excluded_session_ids: vec![planned[0].id.clone()],
            ..Default::default()
        };
        confirm_order_payment(&db, &order.id, &request, march_first()).await?;

        let booked = list_attendance_by_student(&db, "student-1").await?;
        assert_eq!(booked.len(), 1);
        // The excluded credit is still granted
        let enrollment = get_enrollment_by_student_and_class(&db, "student-1", "swim")
            .await?
            .unwrap();
        assert_eq!(enrollment.total_credits, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_confirm_leaves_order_pending() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_class(&db, "swim").await?;
        let mut unseeded = weekly_class_input("open-gym", None);
        unseeded.start_time = None;
        unseeded.end_time = None;
        create_class(&db, unseeded).await?;

        let items = json!([
            { "product_id": "p1", "quantity": 1,
              "enrollments": [{ "class_id": "swim", "credits_added": 2 }] },
            { "product_id": "p2", "quantity": 1,
              "enrollments": [{ "class_id": "open-gym", "credits_added": 2 }] },
        ]);
        let order = create_test_order(&db, "student-1", items).await?;

        let result =
            confirm_order_payment(&db, &order.id, &FulfillmentRequest::default(), march_first()).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::MissingSessionSeed { .. }
        ));

        let stored = get_order_by_id(&db, &order.id).await?.unwrap();
        assert_eq!(stored.status, OrderStatus::PendingPayment);
        assert_eq!(stored.order_items, order.order_items);
        // Writes for the first line are not rolled back
        assert!(
            get_enrollment_by_student_and_class(&db, "student-1", "swim")
                .await?
                .is_some()
        );
        assert_eq!(list_attendance_by_student(&db, "student-1").await?.len(), 2);
        Ok(())
    }
}
