//! Labeled text fields: payment method, receipt number and cashier.

use crate::money::has_cents;

use super::items::parse_item;
use super::patterns::{
    CARD_MASK, CASHIER, CASHIER_LABEL, HASH_NUMBER, PAYMENT_CONTEXT, PAYMENT_KEYWORD,
    PAYMENT_LABELED, RECEIPT_NUMBER,
};
use super::{squash_whitespace, ExtractionMatch, FieldUpdate, LineRule};

/// `Payment method: Visa`, `Paid with Debit`, or a bare `CASH`/`VISA` keyword.
///
/// Labeled matches carry a higher confidence so that they replace an earlier
/// bare keyword. A bare keyword only counts when nothing else on the line
/// reads as a product name, so `Gift Card 25.00` and `Cash & Carry` are left
/// for the item and merchant rules.
#[derive(Debug, Default)]
pub struct PaymentRule;

impl PaymentRule {
    pub fn new() -> Self {
        Self
    }
}

impl LineRule for PaymentRule {
    fn name(&self) -> &'static str {
        "payment"
    }

    fn apply(&self, line: &str) -> Option<ExtractionMatch<FieldUpdate>> {
        if let Some(caps) = PAYMENT_LABELED.captures(line) {
            let method = canonical_payment(&caps[1]);
            return Some(ExtractionMatch::new(FieldUpdate::PaymentMethod(method), 0.95, line));
        }

        let caps = PAYMENT_KEYWORD.captures(line)?;
        if !is_tender_line(line) {
            return None;
        }
        let method = canonical_payment(&caps[1]);
        Some(ExtractionMatch::new(FieldUpdate::PaymentMethod(method), 0.6, line))
    }
}

/// Every word left after removing payment keywords is tender vocabulary, a
/// card mask or a number.
fn is_tender_line(line: &str) -> bool {
    let rest = PAYMENT_KEYWORD.replace_all(line, " ");
    let rest = PAYMENT_CONTEXT.replace_all(&rest, " ");
    rest.split_whitespace()
        .all(|word| CARD_MASK.is_match(word) || !word.chars().any(char::is_alphabetic))
}

fn canonical_payment(raw: &str) -> String {
    let method = squash_whitespace(raw).to_uppercase();
    match method.as_str() {
        "MASTER CARD" => "MASTERCARD".to_string(),
        _ => method,
    }
}

/// `Receipt #: 1001`, `Trans 4821`, `Order No. A-17`, or a bare `#1001`.
///
/// A bare `#` number on a priced line is part of an item name (`Burger #2 9.99`).
#[derive(Debug, Default)]
pub struct ReceiptNumberRule;

impl ReceiptNumberRule {
    pub fn new() -> Self {
        Self
    }
}

impl LineRule for ReceiptNumberRule {
    fn name(&self) -> &'static str {
        "receipt_number"
    }

    fn apply(&self, line: &str) -> Option<ExtractionMatch<FieldUpdate>> {
        let labeled = RECEIPT_NUMBER
            .captures_iter(line)
            .map(|caps| caps[1].trim_end_matches('.').to_string())
            .find(|value| is_receipt_number(value));

        if let Some(number) = labeled {
            return Some(ExtractionMatch::new(FieldUpdate::ReceiptNumber(number), 0.9, line));
        }

        if parse_item(line).is_some() {
            return None;
        }
        HASH_NUMBER.captures(line).map(|caps| {
            ExtractionMatch::new(FieldUpdate::ReceiptNumber(caps[1].to_string()), 0.5, line)
        })
    }
}

/// Must carry a digit and must not be a price.
fn is_receipt_number(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_digit()) && !has_cents(value)
}

/// `Cashier: Jane Doe`, `Served by Tom`, `Server Maria`.
///
/// Any line carrying a cashier label is claimed, even when the name is only
/// an id.
#[derive(Debug, Default)]
pub struct CashierRule;

impl CashierRule {
    pub fn new() -> Self {
        Self
    }
}

impl LineRule for CashierRule {
    fn name(&self) -> &'static str {
        "cashier"
    }

    fn apply(&self, line: &str) -> Option<ExtractionMatch<FieldUpdate>> {
        let caps = CASHIER.captures(line)?;
        let name = caps[1].trim_end_matches(['.', '-', '\'']).to_string();
        if name.is_empty() {
            return None;
        }
        Some(ExtractionMatch::new(FieldUpdate::Cashier(name), 0.85, line))
    }

    fn claims(&self, line: &str) -> bool {
        CASHIER_LABEL.is_match(line)
    }
}
