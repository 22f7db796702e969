//! Rule-based line matchers for the fallback parser.
//!
//! Every rule is a pure function of a single trimmed line. Merging the
//! resulting updates into a receipt is the parser's job.

pub mod dates;
pub mod items;
pub mod labels;
pub mod merchant;
pub mod patterns;
pub mod totals;

pub use dates::{parse_date_time, DateRule};
pub use items::ItemRule;
pub use labels::{CashierRule, PaymentRule, ReceiptNumberRule};
pub use merchant::MerchantRule;
pub use totals::TotalsRule;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::models::receipt::{AmountField, LineItem};

/// A single line rule.
pub trait LineRule: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Extract a field update from one line.
    fn apply(&self, line: &str) -> Option<ExtractionMatch<FieldUpdate>>;

    /// Whether this rule owns the line, even when no value could be read.
    ///
    /// Owned lines are never offered to the item and merchant rules.
    fn claims(&self, line: &str) -> bool {
        self.apply(line).is_some()
    }
}

/// A value produced by a rule for one receipt field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Merchant(String),
    PurchasedAt(NaiveDateTime),
    Amount(AmountField, Decimal),
    PaymentMethod(String),
    ReceiptNumber(String),
    Cashier(String),
    Item(LineItem),
}

/// A rule hit with its confidence and the line it came from.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0). Labeled matches outrank bare keywords.
    pub confidence: f32,
    /// Source line that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            source: source.into(),
        }
    }
}

/// Collapse runs of whitespace into single spaces.
pub(crate) fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
