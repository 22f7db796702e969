//! Labeled summary amounts: total, subtotal, tax and tip.

use regex::Regex;
use rust_decimal::Decimal;

use crate::models::receipt::AmountField;
use crate::money::normalize_amount;

use super::patterns::{CURRENCY_MARKER, SUBTOTAL_LABEL, TAX_LABEL, TIP_LABEL, TOTAL_LABEL};
use super::{ExtractionMatch, FieldUpdate, LineRule};

/// Reads `<label> <amount>` lines.
///
/// One label per line, checked in the order subtotal, tax, tip, total so
/// that "Subtotal" or "Total Tax" never count as the grand total.
#[derive(Debug, Default)]
pub struct TotalsRule;

impl TotalsRule {
    pub fn new() -> Self {
        Self
    }

    /// The label found on the line and the byte offset where it ends.
    pub fn label(&self, line: &str) -> Option<(AmountField, usize)> {
        let labels: [(AmountField, &Regex); 4] = [
            (AmountField::Subtotal, &SUBTOTAL_LABEL),
            (AmountField::Tax, &TAX_LABEL),
            (AmountField::Tip, &TIP_LABEL),
            (AmountField::Total, &TOTAL_LABEL),
        ];

        labels
            .iter()
            .find_map(|(field, re)| re.find(line).map(|m| (*field, m.end())))
    }
}

impl LineRule for TotalsRule {
    fn name(&self) -> &'static str {
        "totals"
    }

    fn apply(&self, line: &str) -> Option<ExtractionMatch<FieldUpdate>> {
        let (field, end) = self.label(line)?;
        let amount = trailing_amount(&line[end..])?;
        Some(ExtractionMatch::new(FieldUpdate::Amount(field, amount), 0.95, line))
    }

    fn claims(&self, line: &str) -> bool {
        self.label(line).is_some()
    }
}

/// The last numeric token of a line, ignoring bare currency markers.
pub fn trailing_amount(text: &str) -> Option<Decimal> {
    let token = text
        .split_whitespace()
        .rev()
        .map(|t| t.trim_start_matches(':'))
        .find(|t| !t.is_empty() && !CURRENCY_MARKER.is_match(t))?;

    normalize_amount(token)
}
