//! Line item extraction.
//!
//! An item line is a description followed by up to three numbers:
//!
//! ```text
//! Coffee 2 3.50 7.00      quantity, unit price, total
//! Bagel 2 5.00            quantity, total
//! Muffin 2.50 5.00        unit price, total
//! Water 1.25              total
//! Tea 2 @ 1.50            quantity, unit price
//! 2x Scone 6.00           quantity, total
//! ```

use rust_decimal::Decimal;

use crate::models::receipt::LineItem;
use crate::money::{has_cents, normalize_amount};

use super::patterns::{BOILERPLATE, NON_ITEM_LABEL, QUANTITY_MARKER};
use super::{squash_whitespace, ExtractionMatch, FieldUpdate, LineRule};

/// Integer tokens at or above this are product codes, not quantities.
const CODE_THRESHOLD: i64 = 1000;

#[derive(Debug, Default)]
pub struct ItemRule;

impl ItemRule {
    pub fn new() -> Self {
        Self
    }
}

impl LineRule for ItemRule {
    fn name(&self) -> &'static str {
        "item"
    }

    fn apply(&self, line: &str) -> Option<ExtractionMatch<FieldUpdate>> {
        if NON_ITEM_LABEL.is_match(line) || BOILERPLATE.is_match(line) {
            return None;
        }
        parse_item(line).map(|item| ExtractionMatch::new(FieldUpdate::Item(item), 0.7, line))
    }
}

/// How the quantity was written, when it was written with a marker.
#[derive(Debug, Clone, Copy, PartialEq)]
enum QuantityHint {
    /// `2 @ 1.50`: the following number is a unit price.
    At(Decimal),
    /// `2x` or `x2`: the following number is a line total.
    Times(Decimal),
}

#[derive(Debug, Clone, Copy)]
struct Number {
    value: Decimal,
    integer: bool,
}

/// Parse a single line into an item, if it has the shape of one.
pub fn parse_item(line: &str) -> Option<LineItem> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let last = tokens.last()?;
    if !has_cents(last) {
        return None;
    }

    let mut rest: &[&str] = &tokens;
    let mut numbers: Vec<Number> = Vec::with_capacity(3);
    let mut hint = None;

    while let Some((token, head)) = rest.split_last() {
        if numbers.len() == 3 {
            break;
        }

        if let Some(quantity) = quantity_marker(token) {
            hint = Some(QuantityHint::Times(quantity));
            rest = head;
            break;
        }

        if *token == "@" || token.eq_ignore_ascii_case("x") {
            rest = head;
            if let Some((quantity_token, before)) = head.split_last() {
                if let Some(quantity) = plain_number(quantity_token).filter(|n| n.value > Decimal::ZERO) {
                    hint = Some(if *token == "@" {
                        QuantityHint::At(quantity.value)
                    } else {
                        QuantityHint::Times(quantity.value)
                    });
                    rest = before;
                }
            }
            break;
        }

        match plain_number(token) {
            Some(number) => {
                numbers.push(number);
                rest = head;
            }
            None => break,
        }
    }

    // "2x Scone 6.00"
    if hint.is_none() {
        if let Some((first, tail)) = rest.split_first() {
            if let Some(quantity) = quantity_marker(first) {
                hint = Some(QuantityHint::Times(quantity));
                rest = tail;
            }
        }
    }

    let description = description(rest)?;
    numbers.reverse();

    let item = LineItem::named(description);
    let item = match (numbers.as_slice(), hint) {
        ([quantity, unit, total], _) => item
            .with_quantity(quantity.value)
            .with_unit_price(Some(unit.value))
            .with_total_price(Some(total.value)),
        ([unit, total], Some(QuantityHint::At(quantity) | QuantityHint::Times(quantity))) => item
            .with_quantity(quantity)
            .with_unit_price(Some(unit.value))
            .with_total_price(Some(total.value)),
        ([quantity, total], None) if quantity.integer => item
            .with_quantity(quantity.value)
            .with_unit_price(exact_unit_price(total.value, quantity.value))
            .with_total_price(Some(total.value)),
        ([unit, total], None) => {
            let item = match whole_quantity(total.value, unit.value) {
                Some(quantity) => item.with_quantity(quantity),
                None => item,
            };
            item.with_unit_price(Some(unit.value))
                .with_total_price(Some(total.value))
        }
        ([unit], Some(QuantityHint::At(quantity))) => item
            .with_quantity(quantity)
            .with_unit_price(Some(unit.value))
            .with_total_price(unit.value.checked_mul(quantity)),
        ([total], Some(QuantityHint::Times(quantity))) => item
            .with_quantity(quantity)
            .with_unit_price(exact_unit_price(total.value, quantity))
            .with_total_price(Some(total.value)),
        ([total], None) => item
            .with_unit_price(Some(total.value))
            .with_total_price(Some(total.value)),
        _ => return None,
    };

    Some(item)
}

fn plain_number(token: &str) -> Option<Number> {
    let value = normalize_amount(token)?;
    let integer = !token.contains(['.', ',']);
    if integer && value >= Decimal::from(CODE_THRESHOLD) {
        return None;
    }
    Some(Number { value, integer })
}

fn quantity_marker(token: &str) -> Option<Decimal> {
    let caps = QUANTITY_MARKER.captures(token)?;
    let raw = caps.get(1).or_else(|| caps.get(2))?;
    normalize_amount(raw.as_str()).filter(|q| *q > Decimal::ZERO)
}

fn description(tokens: &[&str]) -> Option<String> {
    let joined = squash_whitespace(&tokens.join(" "));
    let name = joined
        .trim_end_matches(|c: char| matches!(c, '.' | ':' | '-' | '*' | '$'))
        .trim();

    if name.chars().any(char::is_alphabetic) {
        Some(name.to_string())
    } else {
        None
    }
}

/// `total / quantity` when it divides to whole cents.
fn exact_unit_price(total: Decimal, quantity: Decimal) -> Option<Decimal> {
    if quantity <= Decimal::ZERO {
        return None;
    }
    let unit = total.checked_div(quantity)?.round_dp(2);
    (unit.checked_mul(quantity)? == total).then_some(unit)
}

/// `total / unit` when it is a whole number greater than zero.
fn whole_quantity(total: Decimal, unit: Decimal) -> Option<Decimal> {
    if unit <= Decimal::ZERO {
        return None;
    }
    let ratio = total.checked_div(unit)?;
    (ratio.fract().is_zero() && ratio > Decimal::ZERO).then(|| ratio.trunc())
}
