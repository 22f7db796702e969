use super::items::parse_item;
use super::patterns::BOILERPLATE;
use super::{squash_whitespace, ExtractionMatch, FieldUpdate, LineRule};

/// Merchant name candidate: a header line with text that is neither
/// boilerplate nor an item.
///
/// The parser only offers unclaimed lines from the top of the receipt.
#[derive(Debug, Default)]
pub struct MerchantRule;

impl MerchantRule {
    pub fn new() -> Self {
        Self
    }
}

impl LineRule for MerchantRule {
    fn name(&self) -> &'static str {
        "merchant"
    }

    fn apply(&self, line: &str) -> Option<ExtractionMatch<FieldUpdate>> {
        if !line.chars().any(char::is_alphabetic) || BOILERPLATE.is_match(line) {
            return None;
        }
        if parse_item(line).is_some() {
            return None;
        }

        let name = squash_whitespace(line.trim_matches(|c: char| c == '*' || c == '=' || c == '-'));
        if name.is_empty() {
            return None;
        }
        Some(ExtractionMatch::new(FieldUpdate::Merchant(name), 0.8, line))
    }
}
