//! Order-item snapshots - reading the JSON lines stored on an order.
//!
//! Order items are free-form JSON written by the storefront. Each line names a
//! product, an optional variant, a quantity, and the classes it enrolls into:
//!
//! ```json
//! { "product_id": "p1", "variant_key": "10x", "quantity": 2,
//!   "enrollments": [{ "class_id": "swim", "credits_added": 5 }] }
//! ```
//!
//! Lines are identified by `"<product_id>-<variant_key|variant>-<index>"`, where
//! `index` is the line's position in the stored array. An enrollment entry inside a
//! line is addressed by appending `-<entry index>`; admins use that key to override
//! the credits of a single entry.

use crate::errors::{Error, Result};
use serde_json::{Map, Value};

const DEFAULT_VARIANT_KEY: &str = "variant";

/// Most credits a single enrollment entry may allocate in one run.
pub const MAX_ENTRY_CREDITS: u32 = 1_000;

/// Key of the line at `index` in the stored array.
#[must_use]
pub fn item_key(product_id: &str, variant_key: Option<&str>, index: usize) -> String {
    format!(
        "{product_id}-{}-{index}",
        variant_key.unwrap_or(DEFAULT_VARIANT_KEY)
    )
}

/// Key used in credit overrides for one enrollment entry of a line.
#[must_use]
pub fn override_key(item_key: &str, entry_index: usize) -> String {
    format!("{item_key}-{entry_index}")
}

/// Truncates a credit amount to whole credits.
///
/// # Errors
/// Returns [`Error::InvalidCredits`] for negative or non-finite values, and for
/// anything above [`MAX_ENTRY_CREDITS`].
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn whole_credits(value: f64) -> Result<u32> {
    let truncated = value.trunc();
    if !value.is_finite() || truncated < 0.0 || truncated > f64::from(MAX_ENTRY_CREDITS) {
        return Err(Error::InvalidCredits { credits: value });
    }
    Ok(truncated as u32)
}

/// A line that at least looks like a purchase: string `product_id`, numeric `quantity`.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemHeader {
    pub key: String,
    pub product_id: String,
    pub variant_key: Option<String>,
    pub variant_name: Option<String>,
    pub quantity: f64,
}

/// Collects the recognizable lines of an order, skipping anything malformed.
#[must_use]
pub fn item_headers(order_items: &Value) -> Vec<ItemHeader> {
    let Some(items) = order_items.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let raw = item.as_object()?;
            let product_id = raw.get("product_id")?.as_str()?;
            let quantity = raw.get("quantity")?.as_f64()?;
            let variant_key = string_field(raw, "variant_key");
            Some(ItemHeader {
                key: item_key(product_id, variant_key.as_deref(), index),
                product_id: product_id.to_string(),
                variant_name: string_field(raw, "variant_name"),
                variant_key,
                quantity,
            })
        })
        .collect()
}

/// One class an order line enrolls into.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentLine {
    pub class_id: String,
    pub credits_per_unit: u32,
    /// The stored entry, kept so unknown fields survive fulfillment
    pub raw: Map<String, Value>,
}

/// An order line ready for fulfillment.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub key: String,
    pub product_id: Option<String>,
    pub variant_name: Option<String>,
    pub quantity: u32,
    pub enrollments: Vec<EnrollmentLine>,
    pub raw: Map<String, Value>,
}

impl OrderLine {
    /// Credits an entry adds when no override applies.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCredits`] if the product exceeds [`MAX_ENTRY_CREDITS`].
    pub fn default_credits(&self, entry: &EnrollmentLine) -> Result<u32> {
        entry
            .credits_per_unit
            .checked_mul(self.quantity)
            .filter(|credits| *credits <= MAX_ENTRY_CREDITS)
            .ok_or(Error::InvalidCredits {
                credits: f64::from(entry.credits_per_unit) * f64::from(self.quantity),
            })
    }
}

fn string_field(raw: &Map<String, Value>, field: &str) -> Option<String> {
    raw.get(field).and_then(Value::as_str).map(str::to_string)
}

fn invalid(item_key: &str, reason: &str) -> Error {
    Error::InvalidOrderItem {
        item_key: item_key.to_string(),
        reason: reason.to_string(),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn positive_whole(value: f64) -> Option<u32> {
    let truncated = value.trunc();
    (truncated >= 1.0 && truncated <= f64::from(u32::MAX)).then_some(truncated as u32)
}

fn parse_enrollments(key: &str, value: Option<&Value>) -> Result<Vec<EnrollmentLine>> {
    let entries = value
        .and_then(Value::as_array)
        .ok_or_else(|| invalid(key, "missing enrollments"))?;

    let mut lines = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(raw) = entry.as_object() else {
            continue;
        };
        let class_id = raw
            .get("class_id")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if class_id.is_empty() {
            continue;
        }
        let credits = raw
            .get("credits_added")
            .and_then(Value::as_f64)
            .filter(|credits| credits.is_finite())
            .ok_or_else(|| invalid(key, "credits_added must be a number"))?;
        let credits_per_unit =
            positive_whole(credits).ok_or_else(|| invalid(key, "credits_added must be above zero"))?;
        lines.push(EnrollmentLine {
            class_id: class_id.to_string(),
            credits_per_unit,
            raw: raw.clone(),
        });
    }

    if lines.is_empty() {
        return Err(invalid(key, "no class specified"));
    }
    Ok(lines)
}

/// Parses every object line of an order for fulfillment.
///
/// Non-object entries are skipped. Every object line must carry a quantity that
/// truncates to at least 1 and an `enrollments` array naming at least one class.
///
/// # Errors
/// Returns [`Error::InvalidOrderItem`] naming the first offending line.
pub fn parse_order_lines(order_items: &Value) -> Result<Vec<OrderLine>> {
    let Some(items) = order_items.as_array() else {
        return Ok(Vec::new());
    };

    let mut lines = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Some(raw) = item.as_object() else {
            continue;
        };
        let product_id = string_field(raw, "product_id");
        let variant_key = string_field(raw, "variant_key");
        let key = item_key(
            product_id.as_deref().unwrap_or_default(),
            variant_key.as_deref(),
            index,
        );

        let quantity = raw
            .get("quantity")
            .and_then(Value::as_f64)
            .ok_or_else(|| invalid(&key, "quantity is missing or not a number"))?;
        let quantity =
            positive_whole(quantity).ok_or_else(|| invalid(&key, "quantity must be above zero"))?;
        let enrollments = parse_enrollments(&key, raw.get("enrollments"))?;

        lines.push(OrderLine {
            variant_name: string_field(raw, "variant_name"),
            key,
            product_id,
            quantity,
            enrollments,
            raw: raw.clone(),
        });
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys() {
        assert_eq!(item_key("p1", Some("10x"), 0), "p1-10x-0");
        assert_eq!(item_key("p1", None, 3), "p1-variant-3");
        assert_eq!(override_key("p1-variant-3", 1), "p1-variant-3-1");
    }

    #[test]
    fn test_whole_credits() {
        assert_eq!(whole_credits(5.0).unwrap(), 5);
        assert_eq!(whole_credits(2.9).unwrap(), 2);
        assert_eq!(whole_credits(0.0).unwrap(), 0);
        assert!(whole_credits(-1.0).is_err());
        assert!(whole_credits(f64::NAN).is_err());
        assert!(whole_credits(f64::INFINITY).is_err());
        assert_eq!(
            whole_credits(f64::from(MAX_ENTRY_CREDITS)).unwrap(),
            MAX_ENTRY_CREDITS
        );
        assert!(matches!(
            whole_credits(1e9).unwrap_err(),
            Error::InvalidCredits { .. }
        ));
    }

    #[test]
    fn test_default_credits_are_capped() {
        let items = json!([{
            "product_id": "p1",
            "quantity": 100,
            "enrollments": [{ "class_id": "swim", "credits_added": 20 }],
        }]);
        let lines = parse_order_lines(&items).unwrap();
        let line = &lines[0];
        assert!(matches!(
            line.default_credits(&line.enrollments[0]).unwrap_err(),
            Error::InvalidCredits { .. }
        ));
    }

    #[test]
    fn test_item_headers_skip_malformed_lines() {
        let items = json!([
            "not an object",
            { "product_id": "p1", "quantity": 1 },
            { "product_id": 7, "quantity": 1 },
            { "product_id": "p2", "variant_key": "vip", "variant_name": "VIP", "quantity": 2 },
        ]);
        let headers = item_headers(&items);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].key, "p1-variant-1");
        assert_eq!(headers[1].key, "p2-vip-3");
        assert_eq!(headers[1].variant_name.as_deref(), Some("VIP"));
        assert!(item_headers(&json!({})).is_empty());
    }

    #[test]
    fn test_parse_order_lines_keeps_raw_fields() {
        let items = json!([{
            "product_id": "p1",
            "quantity": 2.7,
            "line_item_total": 3000,
            "enrollments": [
                { "class_id": " swim ", "credits_added": 4, "label": "Swim" },
                { "class_id": "", "credits_added": 1 },
                42,
            ],
        }]);
        let lines = parse_order_lines(&items).unwrap();
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.key, "p1-variant-0");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.enrollments.len(), 1);
        assert_eq!(line.enrollments[0].class_id, "swim");
        assert_eq!(line.enrollments[0].raw.get("label"), Some(&json!("Swim")));
        assert_eq!(line.raw.get("line_item_total"), Some(&json!(3000)));
        assert_eq!(line.default_credits(&line.enrollments[0]).unwrap(), 8);
    }

    #[test]
    fn test_parse_order_lines_rejects_bad_lines() {
        let cases = [
            json!([{ "product_id": "p1", "quantity": "2", "enrollments": [] }]),
            json!([{ "product_id": "p1", "quantity": 0.5, "enrollments": [] }]),
            json!([{ "product_id": "p1", "quantity": 1 }]),
            json!([{ "product_id": "p1", "quantity": 1, "enrollments": [{ "class_id": "" }] }]),
            json!([{ "product_id": "p1", "quantity": 1,
                     "enrollments": [{ "class_id": "swim", "credits_added": "4" }] }]),
            json!([{ "product_id": "p1", "quantity": 1,
                     "enrollments": [{ "class_id": "swim", "credits_added": 0.4 }] }]),
        ];
        for items in cases {
            let err = parse_order_lines(&items).unwrap_err();
            assert!(
                matches!(&err, Error::InvalidOrderItem { item_key, .. } if item_key == "p1-variant-0"),
                "unexpected error for {items}: {err}"
            );
        }
    }
}
