//! Admin routes.

use super::{AppState, json_or_default};
use crate::{
    core::{
        enrollment::{self, EnrollmentUpdate, parse_enrollment_status},
        order::{self, parse_order_status},
    },
    errors::Result,
    fulfillment::{FulfillmentRequest, PaymentPreview, confirm_order_payment, preview_order_payment},
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

impl StatusQuery {
    fn status(&self) -> Option<&str> {
        self.status.as_deref().filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPaymentBody {
    #[serde(default)]
    pub credits_overrides: HashMap<String, f64>,
}

/// `GET /api/admin/orders?status=`
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Value>> {
    let status = query.status().map(parse_order_status).transpose()?;
    let orders = order::list_orders(&state.db, status).await?;
    Ok(Json(json!({ "data": orders })))
}

/// `POST /api/admin/orders/:id/preview-payment`
///
/// An empty body means "no overrides".
pub async fn preview_payment(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    body: Bytes,
) -> Result<Json<PaymentPreview>> {
    let body: PreviewPaymentBody = json_or_default(&body)?;
    let preview =
        preview_order_payment(&state.db, &order_id, body.credits_overrides, chrono::Utc::now())
            .await?;
    Ok(Json(preview))
}

/// `POST /api/admin/orders/:id/confirm-payment`
///
/// An empty body confirms with no exclusions and no overrides.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>> {
    let request: FulfillmentRequest = json_or_default(&body)?;
    let paid = confirm_order_payment(&state.db, &order_id, &request, chrono::Utc::now()).await?;
    Ok(Json(json!({ "data": paid })))
}

/// `GET /api/admin/enrollments?status=`
pub async fn list_enrollments(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Value>> {
    let status = query.status().map(parse_enrollment_status).transpose()?;
    let enrollments = enrollment::list_enrollments(&state.db, status).await?;
    Ok(Json(json!({ "data": enrollments })))
}

/// `PATCH /api/admin/enrollments/:id`
pub async fn update_enrollment(
    State(state): State<AppState>,
    Path(enrollment_id): Path<String>,
    Json(update): Json<EnrollmentUpdate>,
) -> Result<Json<Value>> {
    let updated = enrollment::update_enrollment(&state.db, &enrollment_id, update).await?;
    Ok(Json(json!({ "data": updated })))
}
