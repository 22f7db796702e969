//! Common regex patterns for receipt line rules.
//!
//! Summary labels match either at the start of a line or as a whole word
//! followed by a colon or whitespace.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Summary amount labels, in per-line precedence order
    pub static ref SUBTOTAL_LABEL: Regex = Regex::new(
        r"(?i)(?:^\s*sub[\s\-]?total\b|\bsub[\s\-]?total(?:\s|:))"
    ).unwrap();

    pub static ref TAX_LABEL: Regex = Regex::new(
        r"(?i)(?:^\s*(?:sales\s+)?(?:tax|vat|gst|hst)\b|\b(?:sales\s+)?(?:tax|vat|gst|hst)(?:\s|:))"
    ).unwrap();

    pub static ref TIP_LABEL: Regex = Regex::new(
        r"(?i)(?:^\s*(?:tip|gratuity)\b|\b(?:tip|gratuity)(?:\s|:))"
    ).unwrap();

    pub static ref TOTAL_LABEL: Regex = Regex::new(
        r"(?i)(?:^\s*(?:grand\s+total|total(?:\s+due)?|amount\s+due|balance\s+due)\b|\b(?:grand\s+total|total(?:\s+due)?|amount\s+due|balance\s+due)(?:\s|:))"
    ).unwrap();

    pub static ref CURRENCY_MARKER: Regex = Regex::new(
        r"(?i)^(?:USD|EUR|GBP|PLN|CAD|AUD|CHF|zł|kr|[$€£¥₹])$"
    ).unwrap();

    // Dates
    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})\b"
    ).unwrap();

    pub static ref DATE_NUMERIC: Regex = Regex::new(
        r"\b(\d{1,2})([./\-])(\d{1,2})[./\-](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_DAY_MONTH_NAME: Regex = Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?[\s\-]+(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?,?[\s\-]+(\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_MONTH_NAME_DAY: Regex = Regex::new(
        r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b"
    ).unwrap();

    pub static ref TIME: Regex = Regex::new(
        r"(?:^|[^\d:])(\d{1,2}):(\d{2})(?::(\d{2}))?(?:\s*([AaPp])\.?[Mm]\.?)?(?:$|[^\d:])"
    ).unwrap();

    // Payment method
    pub static ref PAYMENT_LABELED: Regex = Regex::new(
        r"(?i)\b(?:payment\s+(?:method|type)|paid\s+(?:by|with)|tender(?:ed)?(?:\s+type)?)\b\s*[:\-]?\s*([A-Za-z]+(?:\s+(?:card|express|pay))?)"
    ).unwrap();

    pub static ref PAYMENT_KEYWORD: Regex = Regex::new(
        r"(?i)\b(american\s+express|master\s?card|visa|amex|discover|credit|debit|cash|card|apple\s+pay|google\s+pay)\b"
    ).unwrap();

    // Words that may sit next to a bare payment keyword on a tender line
    pub static ref PAYMENT_CONTEXT: Regex = Regex::new(
        r"(?i)\b(?:tender(?:ed)?|payment|paid|type|sale|purchase|chip|contactless|swiped?|approved|acct|account|ending|no|in)\b"
    ).unwrap();

    pub static ref CARD_MASK: Regex = Regex::new(
        r"(?i)^[x*•#]{2,}\d{0,4}$"
    ).unwrap();

    // Receipt / transaction number
    pub static ref RECEIPT_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:receipt|transaction|trans|txn|ref(?:erence)?|order|invoice|check|ticket)\b\s*(?:(?:no|num(?:ber)?|id)\b\.?|#)?\s*[:#]?\s*([A-Za-z0-9][A-Za-z0-9./\-]*)"
    ).unwrap();

    pub static ref HASH_NUMBER: Regex = Regex::new(
        r"(?:^|\s)#\s?(\d{2,})\b"
    ).unwrap();

    // Cashier
    pub static ref CASHIER_LABEL: Regex = Regex::new(
        r"(?i)\b(?:cashier|server|served\s+by|operator|clerk|associate)\b"
    ).unwrap();

    pub static ref CASHIER: Regex = Regex::new(
        r"(?i)\b(?:cashier|server|served\s+by|operator|clerk|associate)\b\s*(?:(?:name|id)\b)?\s*[:\-]?\s*([A-Za-z][A-Za-z.'\-]*(?:\s+[A-Za-z][A-Za-z.'\-]*)?)"
    ).unwrap();

    // Lines that never hold items or the merchant name
    pub static ref BOILERPLATE: Regex = Regex::new(
        r"(?i)\b(?:thank\s+you|thanks|customer\s+copy|merchant\s+copy|welcome|come\s+again|have\s+a\s+(?:nice|great)\s+day|receipt)\b"
    ).unwrap();

    // A whole line of label plus one value, so "Balance Bar 2.49" stays an item
    pub static ref NON_ITEM_LABEL: Regex = Regex::new(
        r"(?i)^\s*(?:change(?:\s+due)?|balance(?:\s+due)?|cash\s*back|amount(?:\s+(?:tendered|paid))?|tendered|savings|you\s+saved|points(?:\s+earned)?|approval(?:\s+code)?|auth(?:orization)?(?:\s+code)?|items?\s+sold)\s*[:#]?\s*\S*\s*$"
    ).unwrap();

    // Quantity markers: "2x", "x2", "2 @"
    pub static ref QUANTITY_MARKER: Regex = Regex::new(
        r"(?i)^(?:(\d+(?:[.,]\d+)?)x|x(\d+(?:[.,]\d+)?))$"
    ).unwrap();
}
