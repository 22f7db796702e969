//! Validation of untyped extraction output into a [`StructuredReceipt`].
//!
//! Only two problems reject a whole record: the payload is not a JSON object,
//! or `items` is present but not an array. Every other problem drops the one
//! field it affects and is reported as a [`FieldRejection`].

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{FieldRejection, ValidationError};
use crate::models::receipt::{AmountField, ExtractionMethod, LineItem, StructuredReceipt};
use crate::money::amount_from_json;

/// Validate a JSON value produced by the AI path.
pub fn validate(value: &Value, raw_text: &str) -> Result<StructuredReceipt, ValidationError> {
    validate_with_report(value, raw_text).map(|(receipt, _)| receipt)
}

/// Validate and also return every field that was dropped.
pub fn validate_with_report(
    value: &Value,
    raw_text: &str,
) -> Result<(StructuredReceipt, Vec<FieldRejection>), ValidationError> {
    let object = value
        .as_object()
        .ok_or(ValidationError::NotAnObject(json_type(value)))?;

    let items = match object.get("items") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(items)) => items.as_slice(),
        Some(other) => return Err(ValidationError::ItemsNotSequence(json_type(other))),
    };

    let mut validator = Validator {
        object,
        rejections: Vec::new(),
    };
    let mut receipt = StructuredReceipt::empty(raw_text, ExtractionMethod::Ai);

    receipt.merchant_name = validator.text("merchant_name");
    receipt.payment_method = validator.text("payment_method").map(|m| m.to_uppercase());
    receipt.receipt_number = validator.text("receipt_number");
    receipt.cashier = validator.text("cashier");
    receipt.purchased_at = validator.timestamp("purchased_at");

    for field in AmountField::ALL {
        let amount = validator.amount(field.key());
        receipt.set_amount(field, amount);
    }

    receipt.items = items
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| validator.item(index, entry))
        .collect();

    for rejection in &validator.rejections {
        warn!(field = %rejection.field, reason = %rejection.reason, "Dropped invalid field");
    }

    Ok((receipt, validator.rejections))
}

struct Validator<'a> {
    object: &'a Map<String, Value>,
    rejections: Vec<FieldRejection>,
}

impl<'a> Validator<'a> {
    /// Present, non-null value of a top-level field.
    fn field(&self, key: &str) -> Option<&'a Value> {
        self.object.get(key).filter(|v| !v.is_null())
    }

    fn reject(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.rejections.push(FieldRejection::new(field, reason));
    }

    fn text(&mut self, key: &str) -> Option<String> {
        let value = self.field(key)?;
        match value.as_str() {
            Some(s) => non_empty(s),
            None => {
                let reason = format!("expected a string, found {}", json_type(value));
                self.reject(key, reason);
                None
            }
        }
    }

    fn timestamp(&mut self, key: &str) -> Option<NaiveDateTime> {
        let value = self.field(key)?;
        let Some(raw) = value.as_str() else {
            let reason = format!("expected a date string, found {}", json_type(value));
            self.reject(key, reason);
            return None;
        };

        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
            return None;
        }

        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            self.reject(key, format!("unrecognized date '{}'", raw));
        }
        parsed
    }

    fn amount(&mut self, key: &str) -> Option<Decimal> {
        let value = self.field(key)?;
        check_amount(value).map_err(|reason| self.reject(key, reason)).ok()
    }

    fn item(&mut self, index: usize, entry: &Value) -> Option<LineItem> {
        let path = format!("items[{}]", index);

        let Some(object) = entry.as_object() else {
            self.reject(path, format!("expected an object, found {}", json_type(entry)));
            return None;
        };

        let text = |key: &str| object.get(key).and_then(Value::as_str).and_then(non_empty);
        let name = text("item_name").or_else(|| text("name"));

        let Some(name) = name else {
            self.reject(format!("{}.item_name", path), "missing or empty item name");
            return None;
        };

        let mut item = LineItem::named(name);

        if let Some(value) = object.get("quantity").filter(|v| !v.is_null()) {
            match amount_from_json(value).filter(|q| *q > Decimal::ZERO) {
                Some(quantity) => item = item.with_quantity(quantity),
                None => self.reject(
                    format!("{}.quantity", path),
                    format!("quantity must be positive, got {}; using 1", value),
                ),
            }
        }

        for key in ["unit_price", "total_price"] {
            let Some(value) = object.get(key).filter(|v| !v.is_null()) else {
                continue;
            };
            match check_amount(value) {
                Ok(price) if key == "unit_price" => item = item.with_unit_price(Some(price)),
                Ok(price) => item = item.with_total_price(Some(price)),
                Err(reason) => self.reject(format!("{}.{}", path, key), reason),
            }
        }

        Some(item)
    }
}

fn check_amount(value: &Value) -> Result<Decimal, String> {
    if let Some(amount) = amount_from_json(value) {
        return Ok(amount);
    }
    match value {
        Value::Number(_) => Err(format!("negative amount {}", value)),
        Value::String(s) => Err(format!("unparseable amount '{}'", s)),
        other => Err(format!("expected an amount, found {}", json_type(other))),
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Parse the timestamp forms a model typically emits. Offsets are dropped and
/// the wall-clock time is kept as printed on the receipt.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    if let Some(dt) = FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt);
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_full_record() {
        let value = json!({
            "merchant_name": " ACME STORE ",
            "purchased_at": "2024-01-15T14:30:00",
            "total_amount": 7.70,
            "subtotal": "7.00",
            "tax_amount": 0.7,
            "tip_amount": null,
            "payment_method": "visa",
            "receipt_number": "1001",
            "cashier": "",
            "items": [
                {"name": "Coffee", "quantity": 2, "unit_price": 3.50, "total_price": 7.00}
            ]
        });

        let (receipt, rejections) = validate_with_report(&value, "raw").unwrap();

        assert!(rejections.is_empty());
        assert_eq!(receipt.merchant_name.as_deref(), Some("ACME STORE"));
        assert_eq!(receipt.purchased_at, Some(at(2024, 1, 15, 14, 30, 0)));
        assert_eq!(receipt.total_amount, Some(dec("7.70")));
        assert_eq!(receipt.subtotal, Some(dec("7.00")));
        assert_eq!(receipt.tax_amount, Some(dec("0.7")));
        assert_eq!(receipt.tip_amount, None);
        assert_eq!(receipt.payment_method.as_deref(), Some("VISA"));
        assert_eq!(receipt.receipt_number.as_deref(), Some("1001"));
        assert_eq!(receipt.cashier, None);
        assert_eq!(
            receipt.items,
            vec![LineItem::named("Coffee")
                .with_quantity(dec("2"))
                .with_unit_price(Some(dec("3.50")))
                .with_total_price(Some(dec("7.00")))]
        );
        assert_eq!(receipt.raw_text, "raw");
        assert_eq!(receipt.extraction_method, ExtractionMethod::Ai);
    }

    #[test]
    fn test_invalid_field_is_isolated() {
        let value = json!({
            "merchant_name": "ACME STORE",
            "total_amount": 7.70,
            "tax_amount": "banana",
            "items": []
        });

        let (receipt, rejections) = validate_with_report(&value, "raw").unwrap();

        assert_eq!(receipt.tax_amount, None);
        assert_eq!(receipt.merchant_name.as_deref(), Some("ACME STORE"));
        assert_eq!(receipt.total_amount, Some(dec("7.70")));
        assert_eq!(receipt.extraction_method, ExtractionMethod::Ai);
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].field, "tax_amount");
    }

    #[test]
    fn test_negative_amount_dropped_not_zeroed() {
        let value = json!({"total_amount": -5.0, "subtotal": "-1.00"});
        let (receipt, rejections) = validate_with_report(&value, "raw").unwrap();
        assert_eq!(receipt.total_amount, None);
        assert_eq!(receipt.subtotal, None);
        assert_eq!(rejections.len(), 2);
    }

    #[test]
    fn test_whole_record_failures() {
        assert_eq!(
            validate(&json!([1, 2]), "raw"),
            Err(ValidationError::NotAnObject("array"))
        );
        assert_eq!(
            validate(&json!("text"), "raw"),
            Err(ValidationError::NotAnObject("string"))
        );
        assert_eq!(
            validate(&json!({"items": "Coffee"}), "raw"),
            Err(ValidationError::ItemsNotSequence("string"))
        );
    }

    #[test]
    fn test_missing_items_is_empty() {
        let receipt = validate(&json!({"items": null}), "raw").unwrap();
        assert!(receipt.items.is_empty());
        let receipt = validate(&json!({}), "raw").unwrap();
        assert!(receipt.items.is_empty());
        assert!(receipt.is_blank());
    }

    #[test]
    fn test_item_rules() {
        let value = json!({
            "items": [
                {"item_name": "Tea", "quantity": 0, "unit_price": "1.50"},
                {"name": "Scone", "quantity": -2, "total_price": -3.00},
                {"item_name": "   "},
                "Bagel 2.00",
                {"item_name": "Juice", "quantity": "3"}
            ]
        });

        let (receipt, rejections) = validate_with_report(&value, "raw").unwrap();

        assert_eq!(
            receipt.items,
            vec![
                LineItem::named("Tea").with_unit_price(Some(dec("1.50"))),
                LineItem::named("Scone"),
                LineItem::named("Juice").with_quantity(dec("3")),
            ]
        );
        let fields: Vec<&str> = rejections.iter().map(|r| r.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "items[0].quantity",
                "items[1].quantity",
                "items[1].total_price",
                "items[2].item_name",
                "items[3]",
            ]
        );
    }

    #[test]
    fn test_item_name_alias_used_when_primary_unusable() {
        let value = json!({
            "items": [
                {"item_name": 42, "name": "Coffee"},
                {"item_name": "  ", "name": "Latte"},
                {"item_name": ["Tea"]}
            ]
        });

        let (receipt, rejections) = validate_with_report(&value, "raw").unwrap();

        assert_eq!(receipt.items, vec![LineItem::named("Coffee"), LineItem::named("Latte")]);
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].field, "items[2].item_name");
    }

    #[test]
    fn test_non_string_text_field_dropped() {
        let (receipt, rejections) =
            validate_with_report(&json!({"cashier": 42, "receipt_number": "A-1"}), "raw").unwrap();
        assert_eq!(receipt.cashier, None);
        assert_eq!(receipt.receipt_number.as_deref(), Some("A-1"));
        assert_eq!(rejections[0].field, "cashier");
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let receipt = validate(&json!({"store_phone": "555-0100", "total_amount": 1}), "raw").unwrap();
        assert_eq!(receipt.total_amount, Some(dec("1")));
    }

    #[test]
    fn test_timestamp_formats() {
        assert_eq!(parse_timestamp("2024-01-15T14:30:00Z"), Some(at(2024, 1, 15, 14, 30, 0)));
        assert_eq!(
            parse_timestamp("2024-01-15T14:30:00+02:00"),
            Some(at(2024, 1, 15, 14, 30, 0))
        );
        assert_eq!(parse_timestamp("2024-01-15T14:30:00.250").map(|d| d.date()), NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(parse_timestamp("2024-01-15 14:30:05"), Some(at(2024, 1, 15, 14, 30, 5)));
        assert_eq!(parse_timestamp("2024-01-15"), Some(at(2024, 1, 15, 0, 0, 0)));
        assert_eq!(parse_timestamp("15/01/2024"), None);
    }

    #[test]
    fn test_bad_date_rejected() {
        let (receipt, rejections) =
            validate_with_report(&json!({"purchased_at": "yesterday", "merchant_name": "X"}), "raw").unwrap();
        assert_eq!(receipt.purchased_at, None);
        assert_eq!(receipt.merchant_name.as_deref(), Some("X"));
        assert_eq!(rejections[0].field, "purchased_at");
    }
}
