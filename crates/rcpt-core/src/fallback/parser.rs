//! Rule-based receipt parser.

use std::time::Instant;

use tracing::{debug, info};

use crate::models::config::{FallbackConfig, TieBreak};
use crate::models::receipt::{ExtractionMethod, StructuredReceipt};

use super::rules::{
    CashierRule, DateRule, ExtractionMatch, FieldUpdate, ItemRule, LineRule, MerchantRule,
    PaymentRule, ReceiptNumberRule, TotalsRule,
};

/// Deterministic parser that never fails.
///
/// Each trimmed, non-empty line is offered to the label rules first (date,
/// totals, payment, receipt number, cashier). A line claimed by any of them is
/// done; otherwise it is tried as an item and, near the top of the receipt,
/// as the merchant name. The first line is the exception: when a label word
/// claimed it without yielding a value (`Tip Top Cafe`), it is still offered
/// as the merchant name.
pub struct FallbackParser {
    config: FallbackConfig,
    label_rules: Vec<Box<dyn LineRule>>,
    item_rule: ItemRule,
    merchant_rule: MerchantRule,
}

/// Confidence of the values kept so far, for fields where a labeled match
/// may replace a bare one.
#[derive(Debug, Default)]
struct Kept {
    payment_method: f32,
    receipt_number: f32,
}

impl FallbackParser {
    pub fn new(config: FallbackConfig) -> Self {
        Self {
            config,
            label_rules: vec![
                Box::new(DateRule::new()),
                Box::new(TotalsRule::new()),
                Box::new(PaymentRule::new()),
                Box::new(ReceiptNumberRule::new()),
                Box::new(CashierRule::new()),
            ],
            item_rule: ItemRule::new(),
            merchant_rule: MerchantRule::new(),
        }
    }

    /// Parse raw receipt text. The result is tagged `FALLBACK` and keeps the
    /// text verbatim.
    pub fn parse(&self, raw_text: &str) -> StructuredReceipt {
        let start = Instant::now();
        let mut receipt = StructuredReceipt::empty(raw_text, ExtractionMethod::Fallback);
        let mut kept = Kept::default();

        let lines = raw_text.lines().map(str::trim).filter(|l| !l.is_empty());

        for (index, line) in lines.enumerate() {
            let mut claimed = false;
            let mut matched = false;

            for rule in &self.label_rules {
                match rule.apply(line) {
                    Some(hit) => {
                        debug!(
                            rule = rule.name(),
                            line = %hit.source,
                            confidence = hit.confidence,
                            "Rule matched"
                        );
                        self.merge(&mut receipt, &mut kept, hit);
                        claimed = true;
                        matched = true;
                    }
                    None => claimed |= rule.claims(line),
                }
            }

            if claimed {
                if index == 0 && !matched {
                    self.try_merchant(&mut receipt, &mut kept, line);
                }
                continue;
            }

            if let Some(hit) = self.item_rule.apply(line) {
                debug!(
                    rule = self.item_rule.name(),
                    line = %hit.source,
                    confidence = hit.confidence,
                    "Rule matched"
                );
                self.merge(&mut receipt, &mut kept, hit);
                continue;
            }

            if self.in_merchant_window(index) {
                self.try_merchant(&mut receipt, &mut kept, line);
            }
        }

        info!(
            items = receipt.items.len(),
            merchant = receipt.merchant_name.is_some(),
            total = receipt.total_amount.is_some(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Fallback parse complete"
        );

        receipt
    }

    fn try_merchant(&self, receipt: &mut StructuredReceipt, kept: &mut Kept, line: &str) {
        if receipt.merchant_name.is_some() {
            return;
        }
        if let Some(hit) = self.merchant_rule.apply(line) {
            debug!(
                rule = self.merchant_rule.name(),
                line = %hit.source,
                confidence = hit.confidence,
                "Rule matched"
            );
            self.merge(receipt, kept, hit);
        }
    }

    fn in_merchant_window(&self, index: usize) -> bool {
        let window = self.config.merchant_scan_lines;
        window == 0 || index < window
    }

    fn merge(&self, receipt: &mut StructuredReceipt, kept: &mut Kept, hit: ExtractionMatch<FieldUpdate>) {
        let confidence = hit.confidence;

        match hit.value {
            FieldUpdate::Merchant(name) => {
                receipt.merchant_name.get_or_insert(name);
            }
            FieldUpdate::PurchasedAt(at) => {
                receipt.purchased_at.get_or_insert(at);
            }
            FieldUpdate::Amount(field, value) => {
                let replace = match self.config.totals_tie_break {
                    TieBreak::Last => true,
                    TieBreak::First => receipt.amount(field).is_none(),
                };
                if replace {
                    receipt.set_amount(field, Some(value));
                }
            }
            FieldUpdate::PaymentMethod(method) => {
                if receipt.payment_method.is_none() || confidence > kept.payment_method {
                    receipt.payment_method = Some(method);
                    kept.payment_method = confidence;
                }
            }
            FieldUpdate::ReceiptNumber(number) => {
                if receipt.receipt_number.is_none() || confidence > kept.receipt_number {
                    receipt.receipt_number = Some(number);
                    kept.receipt_number = confidence;
                }
            }
            FieldUpdate::Cashier(name) => {
                receipt.cashier.get_or_insert(name);
            }
            FieldUpdate::Item(item) => receipt.items.push(item),
        }
    }
}

impl Default for FallbackParser {
    fn default() -> Self {
        Self::new(FallbackConfig::default())
    }
}

/// Parse raw text with the default fallback settings.
pub fn parse_fallback(raw_text: &str) -> StructuredReceipt {
    FallbackParser::default().parse(raw_text)
}
