//! Order fulfillment orchestrator.
//!
//! Walks every enrollment entry of every order line in order, credits the ledger,
//! and allocates sessions. Entries run one after another on a single
//! [`FulfillmentRun`], which is what keeps two entries from claiming the same slot.
//! The first error aborts the pass; writes made for earlier entries stay in place.

use crate::{
    core::product::product_names_by_ids,
    entities::{order, session},
    errors::{Error, Result},
    fulfillment::{
        allocator::allocate,
        effects::{AttendanceWriter, CreditLedger, SessionMaterializer, iso_timestamp, is_temp_session_id},
        items::{EnrollmentLine, OrderLine, item_headers, override_key, parse_order_lines, whole_credits},
        run::FulfillmentRun,
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, instrument};

const OMITTED_ENROLLMENT_ID: &str = "temp-omitted";
const UNKNOWN_PRODUCT_NAME: &str = "Unknown product";
const DEFAULT_VARIANT_NAME: &str = "Standard plan";

/// Admin adjustments applied to a fulfillment pass.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfillmentRequest {
    /// Session ids (real or `temp-`) to leave out of the booking
    #[serde(default)]
    pub excluded_session_ids: Vec<String>,
    /// Credits per override key, replacing `credits_added x quantity`
    #[serde(default)]
    pub credits_overrides: HashMap<String, f64>,
}

/// A session as shown in the payment preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSession {
    pub id: String,
    /// `YYYY-MM-DD` of the start time
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    /// True for sessions that would be created by the confirmation
    pub is_new: bool,
}

impl From<&session::Model> for PreviewSession {
    fn from(session: &session::Model) -> Self {
        let start_time = iso_timestamp(session.start_time);
        Self {
            id: session.id.clone(),
            date: start_time
                .split('T')
                .next()
                .unwrap_or_default()
                .to_string(),
            start_time,
            end_time: iso_timestamp(session.end_time),
            is_new: is_temp_session_id(&session.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewEnrollment {
    pub class_name: String,
    pub credits_to_add: u32,
    pub sessions: Vec<PreviewSession>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewItem {
    pub key: String,
    pub product_name: String,
    pub variant_name: String,
    pub quantity: u32,
    pub enrollments: Vec<PreviewEnrollment>,
}

/// What the admin sees before confirming a payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaymentPreview {
    pub items: Vec<PreviewItem>,
}

/// Result of a fulfillment pass.
#[derive(Debug, Clone)]
pub struct FulfillmentOutcome {
    /// Rewritten `order_items`, one snapshot per fulfilled line
    pub fulfilled_items: Vec<Value>,
    pub preview: PaymentPreview,
}

struct EntryResult {
    enrollment_id: String,
    expiry_date: Option<NaiveDate>,
    class_name: String,
    sessions: Vec<session::Model>,
}

impl EntryResult {
    fn omitted(class_id: &str) -> Self {
        Self {
            enrollment_id: OMITTED_ENROLLMENT_ID.to_string(),
            expiry_date: None,
            class_name: class_id.to_string(),
            sessions: Vec::new(),
        }
    }
}

async fn fulfill_entry<E>(
    db: &DatabaseConnection,
    run: &mut FulfillmentRun,
    student_id: &str,
    class_id: &str,
    credits: u32,
    effects: &E,
) -> Result<EntryResult>
where
    E: SessionMaterializer + AttendanceWriter + CreditLedger + ?Sized,
{
    let class = run.load_class(db, class_id).await?;
    if !class.is_active {
        return Err(Error::ClassInactive {
            class_id: class_id.to_string(),
        });
    }

    let ledger = effects.credit(student_id, class_id, credits).await?;
    let sessions = allocate(db, run, student_id, &class, credits, effects).await?;
    Ok(EntryResult {
        enrollment_id: ledger.enrollment_id,
        expiry_date: ledger.expiry_date,
        class_name: class.title,
        sessions,
    })
}

fn credits_for(
    line: &OrderLine,
    index: usize,
    entry: &EnrollmentLine,
    request: &FulfillmentRequest,
) -> Result<u32> {
    match request.credits_overrides.get(&override_key(&line.key, index)) {
        Some(&credits) => whole_credits(credits),
        None => line.default_credits(entry),
    }
}

fn entry_snapshot(
    mut raw: Map<String, Value>,
    class_id: &str,
    credits: u32,
    result: &EntryResult,
    applied_at: &str,
) -> Value {
    raw.insert("class_id".to_string(), Value::from(class_id));
    raw.insert("credits_added".to_string(), Value::from(credits));
    raw.insert(
        "enrollment_id".to_string(),
        Value::from(result.enrollment_id.as_str()),
    );
    raw.insert(
        "expiry_date".to_string(),
        result
            .expiry_date
            .map_or(Value::Null, |date| Value::from(date.format("%Y-%m-%d").to_string())),
    );
    raw.insert("applied_at".to_string(), Value::from(applied_at));
    Value::Object(raw)
}

/// Runs one fulfillment pass over an order.
///
/// Entries whose credits resolve to zero are recorded with `credits_added: 0` and
/// touch neither the ledger nor attendance. The preview is built in every mode; the
/// confirmation simply ignores it.
///
/// # Errors
/// Fails on the first invalid line, override, or class, or when a class cannot supply
/// enough sessions.
#[instrument(skip_all, fields(order_id = %order.id))]
pub async fn fulfill_order<E>(
    db: &DatabaseConnection,
    order: &order::Model,
    request: &FulfillmentRequest,
    effects: &E,
    now: DateTime<Utc>,
) -> Result<FulfillmentOutcome>
where
    E: SessionMaterializer + AttendanceWriter + CreditLedger + ?Sized,
{
    let headers = item_headers(&order.order_items);
    if headers.is_empty() {
        return Err(Error::EmptyOrder {
            order_id: order.id.clone(),
        });
    }
    let lines = parse_order_lines(&order.order_items)?;

    let mut product_ids: Vec<String> = headers.into_iter().map(|h| h.product_id).collect();
    product_ids.sort();
    product_ids.dedup();
    let product_names = product_names_by_ids(db, &product_ids).await?;

    let mut run = FulfillmentRun::new(now, request.excluded_session_ids.iter().cloned());
    let applied_at = iso_timestamp(now);
    let mut fulfilled_items = Vec::with_capacity(lines.len());
    let mut preview = PaymentPreview::default();

    for line in lines {
        let mut snapshots = Vec::with_capacity(line.enrollments.len());
        let mut preview_enrollments = Vec::with_capacity(line.enrollments.len());

        for (index, entry) in line.enrollments.iter().enumerate() {
            let credits = credits_for(&line, index, entry, request)?;
            let result = if credits > 0 {
                fulfill_entry(db, &mut run, &order.student_id, &entry.class_id, credits, effects)
                    .await?
            } else {
                debug!(class_id = %entry.class_id, "Skipping entry with zero credits");
                EntryResult::omitted(&entry.class_id)
            };

            snapshots.push(entry_snapshot(
                entry.raw.clone(),
                &entry.class_id,
                credits,
                &result,
                &applied_at,
            ));
            preview_enrollments.push(PreviewEnrollment {
                class_name: result.class_name,
                credits_to_add: credits,
                sessions: result.sessions.iter().map(PreviewSession::from).collect(),
            });
        }

        let mut raw = line.raw;
        raw.insert("quantity".to_string(), Value::from(line.quantity));
        raw.insert("enrollments".to_string(), Value::Array(snapshots));
        fulfilled_items.push(Value::Object(raw));

        preview.items.push(PreviewItem {
            product_name: line
                .product_id
                .as_ref()
                .and_then(|id| product_names.get(id))
                .cloned()
                .unwrap_or_else(|| UNKNOWN_PRODUCT_NAME.to_string()),
            variant_name: line
                .variant_name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_VARIANT_NAME.to_string()),
            key: line.key,
            quantity: line.quantity,
            enrollments: preview_enrollments,
        });
    }

    Ok(FulfillmentOutcome {
        fulfilled_items,
        preview,
    })
}
