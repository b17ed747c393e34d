//! Post-processing and type coercion of matched content

use crate::extract::schema::{FieldType, PostProcess};
use crate::extract::FieldValue;
use crate::url::resolve_link;
use chrono::{DateTime, NaiveDate};
use url::Url;

/// Formats tried in order for `date` fields; the first that parses wins
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
    "%d.%m.%Y",
];

/// Applies post-processing steps in declaration order
pub fn post_process(raw: &str, steps: &[PostProcess]) -> String {
    steps.iter().fold(raw.to_string(), |value, step| match step {
        PostProcess::Trim => value.trim().to_string(),
        PostProcess::Clean => collapse_whitespace(&value),
        PostProcess::Normalize => {
            let visible: String = value
                .chars()
                .map(|c| if c.is_control() { ' ' } else { c })
                .collect();
            collapse_whitespace(&visible)
        }
        PostProcess::Lowercase => value.to_lowercase(),
        PostProcess::Uppercase => value.to_uppercase(),
    })
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Converts matched text into a typed value
///
/// Returns `None` when the text cannot be read as `field_type`; the caller
/// keeps the raw text and flags the field as malformed.
pub fn coerce(raw: &str, field_type: FieldType, base_url: &Url) -> Option<FieldValue> {
    match field_type {
        FieldType::Text => Some(FieldValue::Text(raw.trim().to_string())),
        FieldType::Html => Some(FieldValue::Html(raw.trim().to_string())),
        FieldType::Number => parse_number(raw).map(FieldValue::Number),
        FieldType::Url => resolve_link(raw.trim(), base_url).map(|u| FieldValue::Url(u.to_string())),
        FieldType::Date => parse_date(raw).map(FieldValue::Date),
    }
}

/// Parses a number after dropping currency symbols, thousands separators and
/// other non-numeric characters
///
/// Only digits, `.` and `-` survive; the remainder must be a finite float.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parses a calendar date from the known formats
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMATS[0]) {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.date_naive());
    }

    DATE_FORMATS[1..]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}
