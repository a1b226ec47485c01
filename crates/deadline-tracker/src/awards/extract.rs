use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

const MONTHS: &str =
    "January|February|March|April|May|June|July|August|September|October|November|December";

fn month_day_year() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(r"(?i)\b(?:{MONTHS})\s+[0-9]{{1,2}},\s*[0-9]{{4}}\b"))
            .expect("month-day-year pattern compiles")
    })
}

fn iso_date() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b[0-9]{4}-[0-9]{2}-[0-9]{2}\b").expect("iso date pattern compiles")
    })
}

/// Find the first date-shaped token in `text`.
///
/// A long-form date such as `March 3, 2025` always wins and is returned exactly
/// as written. Otherwise the first `YYYY-MM-DD` token is rendered in the same
/// long form; if that token is not a real calendar date nothing is returned.
pub fn extract_deadline(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }

    if let Some(found) = month_day_year().find(text) {
        return Some(found.as_str().to_string());
    }

    let token = iso_date().find(text)?;
    let date = NaiveDate::parse_from_str(token.as_str(), "%Y-%m-%d").ok()?;
    Some(long_form(date))
}

/// `2025-01-03` -> `January 3, 2025`.
pub fn long_form(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}
