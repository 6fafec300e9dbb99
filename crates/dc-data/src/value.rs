//! Scalar helpers shared by inference and filtering

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use dc_core::Record;
use serde_json::Value;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %b %Y", "%b %d, %Y"];

/// Find a column in a row, falling back to a case-insensitive match on the key
pub fn lookup<'a>(row: &'a Record, column: &str) -> Option<&'a Value> {
    if let Some(value) = row.get(column) {
        return Some(value);
    }
    let wanted = column.to_lowercase();
    row.iter()
        .find(|(key, _)| key.to_lowercase() == wanted)
        .map(|(_, value)| value)
}

/// Numeric reading of a cell; only finite numbers count
pub fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Parse a calendar date or date-time string
pub fn parse_date_str(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Timestamp reading of a cell. Strings are parsed as dates, numbers are
/// epoch milliseconds; anything else has no timestamp.
pub fn as_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => parse_date_str(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.naive_utc()),
        _ => None,
    }
}

/// Calendar-day key (`YYYY-MM-DD`) for a date cell
pub fn day_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => parse_date_str(s).map(|dt| dt.date().format("%Y-%m-%d").to_string()),
        _ => None,
    }
}

/// Text form of a cell used for equality comparisons
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_lookup_ignores_case() {
        let r = row(json!({ "Region": "N" }));
        assert_eq!(lookup(&r, "region"), Some(&json!("N")));
        assert_eq!(lookup(&r, "zone"), None);
    }

    #[test]
    fn test_lookup_prefers_exact_key() {
        let r = row(json!({ "region": "lower", "REGION": "upper" }));
        assert_eq!(lookup(&r, "REGION"), Some(&json!("upper")));
    }

    #[test]
    fn test_as_number() {
        assert_eq!(as_number(&json!(" 12.5 ")), Some(12.5));
        assert_eq!(as_number(&json!(3)), Some(3.0));
        assert_eq!(as_number(&json!("NaN")), None);
        assert_eq!(as_number(&json!("inf")), None);
        assert_eq!(as_number(&json!(true)), None);
    }

    #[test]
    fn test_date_formats() {
        assert!(parse_date_str("2024-03-05").is_some());
        assert!(parse_date_str("2024-03-05T10:15:00Z").is_some());
        assert!(parse_date_str("03/05/2024").is_some());
        assert!(parse_date_str("2024-13-45").is_none());
        assert!(parse_date_str("north").is_none());
    }

    #[test]
    fn test_day_key_normalizes_times() {
        assert_eq!(day_key(&json!("2024-03-05 23:59:00")), Some("2024-03-05".into()));
        assert_eq!(day_key(&json!(20240305)), None);
    }
}
