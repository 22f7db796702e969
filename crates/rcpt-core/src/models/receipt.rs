//! Receipt data models produced by the extraction pipeline.

use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;

/// Unstructured OCR output for one receipt.
///
/// Construction rejects empty and whitespace-only text; the content is
/// otherwise kept exactly as produced by the text source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawText(String);

impl RawText {
    pub fn new(text: impl Into<String>) -> Result<Self, InvalidInputError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(InvalidInputError::Empty);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RawText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonical structured receipt, whichever path produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredReceipt {
    /// Date and time of purchase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchased_at: Option<NaiveDateTime>,

    /// Store or restaurant name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,

    /// Amount paid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip_amount: Option<Decimal>,

    /// Payment method, uppercased (CASH, VISA, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,

    /// Receipt or transaction number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cashier: Option<String>,

    /// Purchased items in receipt order. Empty means none were detected.
    #[serde(default)]
    pub items: Vec<LineItem>,

    /// Verbatim OCR text the record was extracted from.
    pub raw_text: String,

    /// Which path produced this record.
    pub extraction_method: ExtractionMethod,
}

/// A single purchased item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Item label as printed (best effort).
    pub item_name: String,

    /// Quantity, always positive.
    #[serde(default = "default_quantity")]
    pub quantity: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Decimal>,
}

fn default_quantity() -> Decimal {
    Decimal::ONE
}

impl LineItem {
    /// Item with quantity 1 and no prices.
    pub fn named(item_name: impl Into<String>) -> Self {
        Self {
            item_name: item_name.into(),
            quantity: Decimal::ONE,
            unit_price: None,
            total_price: None,
        }
    }

    /// Set the quantity; non-positive values leave the current quantity.
    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        if quantity > Decimal::ZERO {
            self.quantity = quantity;
        }
        self
    }

    pub fn with_unit_price(mut self, price: Option<Decimal>) -> Self {
        self.unit_price = price.filter(|p| !p.is_sign_negative());
        self
    }

    pub fn with_total_price(mut self, price: Option<Decimal>) -> Self {
        self.total_price = price.filter(|p| !p.is_sign_negative());
        self
    }
}

/// Provenance of a [`StructuredReceipt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionMethod {
    /// Produced by the text-generation service and accepted by the validator.
    #[serde(rename = "AI")]
    Ai,
    /// Produced by the rule-based parser.
    #[serde(rename = "FALLBACK")]
    Fallback,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::Ai => f.write_str("AI"),
            ExtractionMethod::Fallback => f.write_str("FALLBACK"),
        }
    }
}

/// The four monetary summary fields of a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmountField {
    Total,
    Subtotal,
    Tax,
    Tip,
}

impl AmountField {
    pub const ALL: [AmountField; 4] = [
        AmountField::Total,
        AmountField::Subtotal,
        AmountField::Tax,
        AmountField::Tip,
    ];

    /// JSON key of the field.
    pub fn key(&self) -> &'static str {
        match self {
            AmountField::Total => "total_amount",
            AmountField::Subtotal => "subtotal",
            AmountField::Tax => "tax_amount",
            AmountField::Tip => "tip_amount",
        }
    }
}

impl StructuredReceipt {
    /// Create an empty receipt carrying only its raw text and provenance.
    pub fn empty(raw_text: impl Into<String>, extraction_method: ExtractionMethod) -> Self {
        Self {
            purchased_at: None,
            merchant_name: None,
            total_amount: None,
            subtotal: None,
            tax_amount: None,
            tip_amount: None,
            payment_method: None,
            receipt_number: None,
            cashier: None,
            items: Vec::new(),
            raw_text: raw_text.into(),
            extraction_method,
        }
    }

    pub fn amount(&self, field: AmountField) -> Option<Decimal> {
        match field {
            AmountField::Total => self.total_amount,
            AmountField::Subtotal => self.subtotal,
            AmountField::Tax => self.tax_amount,
            AmountField::Tip => self.tip_amount,
        }
    }

    /// Set a monetary field. Negative values clear it instead.
    pub fn set_amount(&mut self, field: AmountField, value: Option<Decimal>) {
        let value = value.filter(|v| !v.is_sign_negative());
        match field {
            AmountField::Total => self.total_amount = value,
            AmountField::Subtotal => self.subtotal = value,
            AmountField::Tax => self.tax_amount = value,
            AmountField::Tip => self.tip_amount = value,
        }
    }

    /// Whether nothing beyond the raw text was extracted.
    pub fn is_blank(&self) -> bool {
        self.purchased_at.is_none()
            && self.merchant_name.is_none()
            && AmountField::ALL.iter().all(|f| self.amount(*f).is_none())
            && self.payment_method.is_none()
            && self.receipt_number.is_none()
            && self.cashier.is_none()
            && self.items.is_empty()
    }

    /// Sum of item totals, if every item has one and the sum is representable.
    pub fn items_total(&self) -> Option<Decimal> {
        if self.items.is_empty() {
            return None;
        }
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |sum, i| sum.checked_add(i.total_price?))
    }

    /// Check the arithmetic of the extracted figures and return any issues found.
    ///
    /// These are warnings about the source document or the extraction, not
    /// errors; the receipt stays valid either way. Checks whose arithmetic
    /// overflows are skipped.
    pub fn consistency_issues(&self) -> Vec<String> {
        let tolerance = Decimal::new(1, 2);
        let mut issues = Vec::new();

        if let (Some(total), Some(subtotal)) = (self.total_amount, self.subtotal) {
            let expected = subtotal
                .checked_add(self.tax_amount.unwrap_or_default())
                .and_then(|sum| sum.checked_add(self.tip_amount.unwrap_or_default()));
            if let Some(expected) = expected.filter(|e| differs(*e, total, tolerance)) {
                issues.push(format!(
                    "Subtotal + tax + tip ({}) differs from total ({})",
                    expected, total
                ));
            }
        }

        if let Some(items_total) = self.items_total() {
            let (label, reference) = match (self.subtotal, self.total_amount) {
                (Some(subtotal), _) => ("subtotal", Some(subtotal)),
                (None, Some(total)) => ("total", Some(total)),
                (None, None) => ("", None),
            };
            if let Some(reference) = reference {
                if differs(items_total, reference, tolerance) {
                    issues.push(format!(
                        "Line item total ({}) differs from {} ({})",
                        items_total, label, reference
                    ));
                }
            }
        }

        for item in &self.items {
            if let (Some(unit), Some(total)) = (item.unit_price, item.total_price) {
                let expected = unit.checked_mul(item.quantity);
                if expected.is_some_and(|e| differs(e, total, tolerance)) {
                    issues.push(format!(
                        "Item '{}': {} x {} does not match {}",
                        item.item_name, item.quantity, unit, total
                    ));
                }
            }
        }

        issues
    }
}

fn differs(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    a.checked_sub(b).is_some_and(|d| d.abs() > tolerance)
}
