//! Scalar cell coercions shared by every register scan.
//!
//! Registers mix types freely: checkbox columns yield booleans on one sheet
//! and the literal strings "TRUE"/"FALSE" on another, amounts arrive as
//! numbers or digit strings. These helpers pin down one interpretation.

use serde_json::Value;

/// A blank cell for synthesized rows.
pub fn blank() -> Value {
    Value::String(String::new())
}

pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Display text of a scalar; blank for `Null`, trimmed for strings.
pub fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Value::Number(n) => format_number(n.as_f64().unwrap_or(0.0)),
        other => other.to_string(),
    }
}

/// Numeric value of a cell: a number, or a string holding one.
pub fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Checkbox truth: boolean `true` or the literal string "TRUE".
pub fn is_true(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim() == "TRUE",
        _ => false,
    }
}

/// Scalar equality across sheets: numeric when both sides are numbers (so
/// `500` matches `"500.00"`), normalized text otherwise.
pub fn eq(a: &Value, b: &Value) -> bool {
    match (number(a), number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => text(a) == text(b),
    }
}

/// A cell from a possibly-ragged row; absent cells read as blank.
pub fn at(row: &[Value], col_1based: u32) -> Value {
    row.get(col_1based.saturating_sub(1) as usize)
        .cloned()
        .unwrap_or(Value::Null)
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_detection() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!("")));
        assert!(is_blank(&json!("  ")));
        assert!(!is_blank(&json!(0)));
        assert!(!is_blank(&json!("x")));
    }

    #[test]
    fn truthy_flags() {
        assert!(is_true(&json!(true)));
        assert!(is_true(&json!("TRUE")));
        assert!(is_true(&json!(" TRUE ")));
        assert!(!is_true(&json!("true")));
        assert!(!is_true(&json!(false)));
        assert!(!is_true(&json!(1)));
    }

    #[test]
    fn numbers_from_cells() {
        assert_eq!(number(&json!(500)), Some(500.0));
        assert_eq!(number(&json!("500.00")), Some(500.0));
        assert_eq!(number(&json!("не число")), None);
        assert_eq!(number(&json!(true)), None);
    }

    #[test]
    fn cross_type_equality() {
        assert!(eq(&json!(500), &json!("500.00")));
        assert!(eq(&json!("ТОВ Тест "), &json!("ТОВ Тест")));
        assert!(eq(&Value::Null, &json!("")));
        assert!(!eq(&json!("500"), &json!("501")));
    }

    #[test]
    fn ragged_row_access() {
        let row = vec![json!("a"), json!("b")];
        assert_eq!(at(&row, 1), json!("a"));
        assert_eq!(at(&row, 5), Value::Null);
    }

    #[test]
    fn number_text_has_no_spurious_fraction() {
        assert_eq!(text(&json!(15000.0)), "15000");
        assert_eq!(text(&json!(15000.5)), "15000.5");
    }
}
