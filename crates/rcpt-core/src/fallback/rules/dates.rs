//! Purchase date/time extraction.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Captures;

use super::patterns::{
    DATE_DAY_MONTH_NAME, DATE_MONTH_NAME_DAY, DATE_NUMERIC, DATE_YMD, TIME,
};
use super::{ExtractionMatch, FieldUpdate, LineRule};

/// Recognizes the first calendar-valid date on a line, plus an optional time.
#[derive(Debug, Default)]
pub struct DateRule;

impl DateRule {
    pub fn new() -> Self {
        Self
    }
}

impl LineRule for DateRule {
    fn name(&self) -> &'static str {
        "date"
    }

    fn apply(&self, line: &str) -> Option<ExtractionMatch<FieldUpdate>> {
        parse_date_time(line).map(|dt| ExtractionMatch::new(FieldUpdate::PurchasedAt(dt), 0.9, line))
    }
}

/// Parse the first recognizable date on a line, combined with a time of day
/// if one is present. Date-only matches resolve to midnight.
pub fn parse_date_time(line: &str) -> Option<NaiveDateTime> {
    let date = parse_date(line)?;
    match parse_time(line) {
        Some(time) => Some(date.and_time(time)),
        None => date.and_hms_opt(0, 0, 0),
    }
}

fn parse_date(line: &str) -> Option<NaiveDate> {
    // YYYY-MM-DD, YYYY/MM/DD, YYYY.MM.DD
    for caps in DATE_YMD.captures_iter(line) {
        let year: i32 = caps[1].parse().ok()?;
        if let Some(date) = ymd(year, number(&caps, 2), number(&caps, 3)) {
            return Some(date);
        }
    }

    // MM/DD/YYYY, DD.MM.YYYY and friends
    for caps in DATE_NUMERIC.captures_iter(line) {
        let first = number(&caps, 1);
        let second = number(&caps, 3);
        let year = parse_year(&caps[4]);

        // Dots are day-first; slashes and dashes month-first unless impossible
        let candidates = if &caps[2] == "." || first > 12 {
            [(second, first), (first, second)]
        } else {
            [(first, second), (second, first)]
        };

        if let Some(date) = candidates
            .iter()
            .find_map(|&(month, day)| ymd(year, month, day))
        {
            return Some(date);
        }
    }

    // "15 January 2024"
    for caps in DATE_DAY_MONTH_NAME.captures_iter(line) {
        let month = month_to_number(&caps[2]);
        if let Some(date) = ymd(parse_year(&caps[3]), month, number(&caps, 1)) {
            return Some(date);
        }
    }

    // "January 15, 2024"
    for caps in DATE_MONTH_NAME_DAY.captures_iter(line) {
        let month = month_to_number(&caps[1]);
        if let Some(date) = ymd(parse_year(&caps[3]), month, number(&caps, 2)) {
            return Some(date);
        }
    }

    None
}

fn parse_time(line: &str) -> Option<NaiveTime> {
    let caps = TIME.captures(line)?;
    let mut hour = number(&caps, 1);
    let minute = number(&caps, 2);
    let second = caps.get(3).map(|m| m.as_str().parse().unwrap_or(0)).unwrap_or(0);

    if let Some(meridiem) = caps.get(4) {
        if hour == 0 || hour > 12 {
            return None;
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("p");
        hour = match (pm, hour) {
            (false, 12) => 0,
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, h) => h,
        };
    }

    NaiveTime::from_hms_opt(hour, minute, second)
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn number(caps: &Captures<'_>, group: usize) -> u32 {
    caps.get(group)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if year < 100 {
        // Two-digit year: assume 2000s for 00-50, 1900s for 51-99
        if year <= 50 {
            2000 + year
        } else {
            1900 + year
        }
    } else {
        year
    }
}

fn month_to_number(month: &str) -> u32 {
    let month = month.to_lowercase();
    match month.get(..3).unwrap_or(&month) {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => 0,
    }
}
