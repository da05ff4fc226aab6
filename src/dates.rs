//! Day-granularity date handling.
//!
//! Register cells carry dates in whatever shape the spreadsheet produced:
//! serial numbers, "DD.MM.YYYY" strings, ISO strings, or nothing at all.
//! Everything is normalized here, at the boundary, to a midnight timestamp;
//! the rest of the crate never inspects raw date cells itself.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Localized fallback shown wherever a date is absent.
pub const NOT_SPECIFIED: &str = "Не вказано";

/// Sheets count days from this epoch (day 0 of the serial date system).
const SHEET_EPOCH: (i32, u32, u32) = (1899, 12, 30);

static ZERO_WIDTH: Lazy<Regex> =
    Lazy::new(|| Regex::new("[\u{200B}-\u{200D}\u{FEFF}]").expect("valid zero-width pattern"));

/// A date value as it enters the core: either already a calendar day, or
/// raw external text still to be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayValue<'a> {
    Day(NaiveDate),
    Text(&'a str),
}

impl<'a> From<NaiveDate> for DayValue<'a> {
    fn from(d: NaiveDate) -> Self {
        DayValue::Day(d)
    }
}

/// Normalize to a calendar day. `None` means "unparseable, exclude from
/// consideration"; callers never treat it as an error.
pub fn parse_day(input: DayValue<'_>) -> Option<NaiveDate> {
    match input {
        DayValue::Day(d) => Some(d),
        DayValue::Text(s) => parse_day_text(s),
    }
}

/// Milliseconds since the Unix epoch at midnight (UTC) of the calendar day.
pub fn day_timestamp(input: DayValue<'_>) -> Option<i64> {
    parse_day(input).map(midnight_millis)
}

/// Day of a raw cell value: strings are parsed, numbers are treated as
/// spreadsheet serial dates (fractional time-of-day discarded).
pub fn cell_day(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_day_text(s),
        Value::Number(n) => serial_day(n.as_f64()?),
        _ => None,
    }
}

/// `day_timestamp` over a raw cell value.
pub fn cell_day_timestamp(value: &Value) -> Option<i64> {
    cell_day(value).map(midnight_millis)
}

/// Compare two dates at day granularity. Returns false (never panics)
/// when either side fails to normalize or the operator is unknown.
/// Equality accepts `=`, `==` and `===` as synonyms.
pub fn compare(a: DayValue<'_>, operator: &str, b: DayValue<'_>) -> bool {
    let (Some(t1), Some(t2)) = (day_timestamp(a), day_timestamp(b)) else {
        return false;
    };
    match operator {
        ">" => t1 > t2,
        "<" => t1 < t2,
        ">=" => t1 >= t2,
        "<=" => t1 <= t2,
        "=" | "==" | "===" => t1 == t2,
        _ => false,
    }
}

/// Display form of a date cell: "DD.MM.YYYY", the localized sentinel for a
/// blank cell, or the raw text unchanged when it does not parse as a date.
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => NOT_SPECIFIED.to_string(),
        Value::String(s) if s.trim().is_empty() => NOT_SPECIFIED.to_string(),
        other => match cell_day(other) {
            Some(d) => format_day(d),
            None => match other {
                Value::String(s) => s.clone(),
                v => v.to_string(),
            },
        },
    }
}

pub fn format_day(d: NaiveDate) -> String {
    d.format("%d.%m.%Y").to_string()
}

fn midnight_millis(d: NaiveDate) -> i64 {
    d.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

fn serial_day(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let (y, m, d) = SHEET_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_signed(Duration::days(serial.floor() as i64))
}

fn parse_day_text(text: &str) -> Option<NaiveDate> {
    let clean = ZERO_WIDTH.replace_all(text, "");
    let clean = clean.trim();
    if clean.is_empty() {
        return None;
    }

    // "DD.MM.YYYY" first: the dominant register format.
    if clean.contains('.') {
        let parts: Vec<&str> = clean.split('.').collect();
        if parts.len() == 3 {
            let day = parts[0].trim().parse::<u32>().ok();
            let month = parts[1].trim().parse::<u32>().ok();
            let year = parts[2].trim().parse::<i32>().ok();
            if let (Some(day), Some(month), Some(year)) = (day, month, year) {
                if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
                    return Some(d);
                }
            }
        }
    }

    // Free-form fallbacks: ISO date, ISO datetime, slash forms.
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(clean, fmt) {
            return Some(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(clean) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(clean, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn dotted_string_matches_native_day() {
        let t = day_timestamp(DayValue::Text("27.01.2026")).unwrap();
        assert_eq!(t, day_timestamp(DayValue::Day(day(2026, 1, 27))).unwrap());
    }

    #[test]
    fn dotted_string_with_zero_width_garbage() {
        assert_eq!(
            parse_day(DayValue::Text("\u{FEFF}01.06.2026\u{200B}")),
            Some(day(2026, 6, 1))
        );
    }

    #[test]
    fn iso_fallback() {
        assert_eq!(parse_day(DayValue::Text("2026-06-01")), Some(day(2026, 6, 1)));
        assert_eq!(
            parse_day(DayValue::Text("2026-06-01T10:30:00+03:00")),
            Some(day(2026, 6, 1))
        );
    }

    #[test]
    fn unparseable_is_none_not_error() {
        assert_eq!(parse_day(DayValue::Text("")), None);
        assert_eq!(parse_day(DayValue::Text("   ")), None);
        assert_eq!(parse_day(DayValue::Text("завтра")), None);
        assert_eq!(parse_day(DayValue::Text("32.13.2026")), None);
    }

    #[test]
    fn serial_cells_resolve_to_days() {
        // 2026-06-01 is serial 46174 in the 1899-12-30 system.
        assert_eq!(cell_day(&json!(46174)), Some(day(2026, 6, 1)));
        assert_eq!(cell_day(&json!(46174.75)), Some(day(2026, 6, 1)));
    }

    #[test]
    fn compare_false_on_any_unparseable_operand() {
        for op in [">", "<", ">=", "<=", "=", "==", "==="] {
            assert!(!compare(DayValue::Text("junk"), op, DayValue::Day(day(2026, 1, 1))));
            assert!(!compare(DayValue::Day(day(2026, 1, 1)), op, DayValue::Text("")));
        }
    }

    #[test]
    fn compare_operators_and_equality_synonyms() {
        let a = DayValue::Text("01.06.2026");
        let b = DayValue::Day(day(2026, 6, 2));
        assert!(compare(a, "<", b));
        assert!(compare(b, ">", a));
        assert!(compare(a, "<=", a));
        for eq in ["=", "==", "==="] {
            assert!(compare(a, eq, DayValue::Day(day(2026, 6, 1))));
        }
        assert!(!compare(a, "<>", b));
    }

    #[test]
    fn compare_ignores_time_of_day() {
        assert!(compare(
            DayValue::Text("2026-06-01T23:59:00+00:00"),
            "=",
            DayValue::Day(day(2026, 6, 1)),
        ));
    }

    #[test]
    fn display_formatting() {
        assert_eq!(format_cell(&json!("01.06.2026")), "01.06.2026");
        assert_eq!(format_cell(&json!("2026-06-01")), "01.06.2026");
        assert_eq!(format_cell(&json!("")), NOT_SPECIFIED);
        assert_eq!(format_cell(&Value::Null), NOT_SPECIFIED);
        // Non-empty text that is not a date passes through untouched.
        assert_eq!(format_cell(&json!("до кінця місяця")), "до кінця місяця");
    }
}
