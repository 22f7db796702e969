//! Monetary value normalization shared by the AI and fallback paths.
//!
//! One rule for every amount the pipeline sees: strip currency markers and
//! grouping characters, then decide which separator (if any) is the decimal
//! point from its position.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

lazy_static! {
    /// A single amount with optional currency marker and sign decorations.
    static ref AMOUNT_TOKEN: Regex = Regex::new(
        r"(?ix)^
        (?P<lead>[-(])?\s*
        (?:USD|EUR|GBP|PLN|CAD|AUD|CHF|JPY|SEK|NOK|DKK|INR|MXN|NZD|zł|kr|[$€£¥₹])?\s*
        (?P<sign>-)?\s*
        (?P<num>[.,]?\d(?:[\d.,'\s\u{00a0}]*\d)?)\s*
        (?:USD|EUR|GBP|PLN|CAD|AUD|CHF|JPY|SEK|NOK|DKK|INR|MXN|NZD|zł|kr|[$€£¥₹])?\s*
        (?P<trail>[-)])?
        $"
    ).unwrap();

    /// Ends in a separator followed by exactly two digits (cents).
    static ref CENTS_SUFFIX: Regex = Regex::new(r"\d[.,]\d{2}\D*$").unwrap();
}

/// Normalize a monetary string into a non-negative decimal.
///
/// `"$1,234.56"`, `"1234.56"` and `"1.234,56"` all yield `1234.56`.
/// Negative amounts and anything that is not a single amount yield `None`.
pub fn normalize_amount(s: &str) -> Option<Decimal> {
    let caps = AMOUNT_TOKEN.captures(s.trim())?;

    if caps.name("lead").is_some() || caps.name("sign").is_some() || caps.name("trail").is_some() {
        return None;
    }

    let number = canonical_number(&caps["num"])?;
    let value = Decimal::from_str(&number).ok()?;

    (!value.is_sign_negative()).then_some(value)
}

/// Whether a token is shaped like a price: an amount with exactly two
/// fractional digits.
pub fn has_cents(token: &str) -> bool {
    CENTS_SUFFIX.is_match(token.trim()) && normalize_amount(token).is_some()
}

/// Coerce a JSON value (number or string) into a non-negative amount.
pub fn amount_from_json(value: &Value) -> Option<Decimal> {
    let amount = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Decimal::from(i)
            } else {
                let s = n.to_string();
                Decimal::from_str(&s)
                    .or_else(|_| Decimal::from_scientific(&s))
                    .ok()?
            }
        }
        Value::String(s) => return normalize_amount(s),
        _ => return None,
    };

    (!amount.is_sign_negative()).then_some(amount)
}

/// Format an amount with two decimal places (e.g. `1234.50`).
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// Reduce a digit/separator run to `digits[.digits]`.
fn canonical_number(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    let decimal_pos = decimal_separator_position(&cleaned);

    let mut out = String::with_capacity(cleaned.len() + 1);
    for (i, c) in cleaned.char_indices() {
        if c.is_ascii_digit() {
            out.push(c);
        } else if Some(i) == decimal_pos {
            if out.is_empty() {
                out.push('0');
            }
            out.push('.');
        }
    }

    if out.is_empty() || out.ends_with('.') {
        return None;
    }
    Some(out)
}

/// Byte position of the separator acting as decimal point, if any.
fn decimal_separator_position(cleaned: &str) -> Option<usize> {
    let last_dot = cleaned.rfind('.');
    let last_comma = cleaned.rfind(',');

    match (last_dot, last_comma) {
        // Both kinds present: the rightmost one is the decimal point.
        (Some(d), Some(c)) => Some(d.max(c)),
        (Some(pos), None) | (None, Some(pos)) => {
            let sep = &cleaned[pos..pos + 1];
            let occurrences = cleaned.matches(sep).count();
            let trailing = cleaned.len() - pos - 1;

            if occurrences == 1 {
                // "1,234" groups thousands; "0,750" and "12,34" do not.
                let integer_part = cleaned[..pos].trim_start_matches('0');
                if trailing == 3 && !integer_part.is_empty() {
                    None
                } else {
                    Some(pos)
                }
            } else if trailing == 2 {
                Some(pos)
            } else {
                None
            }
        }
        (None, None) => None,
    }
}
