//! Cell values and the normalizer that decides whether two values are the same.
//!
//! Every "did this actually change" decision (direct commits and paste alike)
//! goes through [`equals`]. The rules:
//!
//! - Empty values pass through; an empty value and blank text compare equal.
//! - Numbers pass through.
//! - Text matching `-?digits[,digits]*[.digits]` becomes a number with the
//!   separators stripped, anything else is trimmed text.
//! - Lookup values compare by id only.
//! - Numbers are equal when they differ by less than `f64::EPSILON`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static NUMERIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?\d[\d,]*(\.\d+)?$").expect("numeric pattern is valid")
});

/// A value chosen from a lookup column's option list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupValue {
    pub id: String,
    pub label: String,
}

/// An untyped cell value. Interpretation is deferred to the column's data type.
///
/// Serialized untagged, so JSON `null`, numbers, strings and `{id, label}`
/// objects map directly onto the variants.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Lookup(LookupValue),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn lookup(id: impl Into<String>, label: impl Into<String>) -> Self {
        CellValue::Lookup(LookupValue { id: id.into(), label: label.into() })
    }

    /// Empty, or text that is blank after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Plain string form without any type-specific formatting.
    pub fn raw_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => canonical_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Lookup(l) => l.label.clone(),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// Canonical comparable form of a [`CellValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum ComparableValue {
    Missing,
    Number(f64),
    Text(String),
}

/// Parse text against the numeric pattern, stripping thousands separators.
pub fn parse_numeric(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if !NUMERIC_PATTERN.is_match(trimmed) {
        return None;
    }
    trimmed.replace(',', "").parse::<f64>().ok()
}

fn normalize_text(text: &str) -> ComparableValue {
    match parse_numeric(text) {
        Some(n) => ComparableValue::Number(n),
        None => ComparableValue::Text(text.trim().to_string()),
    }
}

/// Convert a value into its canonical comparable form.
pub fn normalize(value: &CellValue) -> ComparableValue {
    match value {
        CellValue::Empty => ComparableValue::Missing,
        CellValue::Number(n) => ComparableValue::Number(*n),
        CellValue::Text(s) => normalize_text(s),
        CellValue::Lookup(l) => normalize_text(&l.id),
    }
}

/// Compare two already-normalized values.
pub fn comparable_eq(a: &ComparableValue, b: &ComparableValue) -> bool {
    use ComparableValue::*;
    match (a, b) {
        (Number(x), Number(y)) => (x - y).abs() < f64::EPSILON,
        (Text(x), Text(y)) => x == y,
        (Missing, Missing) => true,
        (Missing, Text(t)) | (Text(t), Missing) => t.is_empty(),
        _ => false,
    }
}

/// True if `a` and `b` normalize to the same value.
pub fn equals(a: &CellValue, b: &CellValue) -> bool {
    comparable_eq(&normalize(a), &normalize(b))
}

/// Canonical string for a number: no scientific notation, -0 folded to 0,
/// at most 15 decimals with trailing zeros trimmed.
pub fn canonical_number(n: f64) -> String {
    if !n.is_finite() {
        if n.is_nan() { return "NaN".to_string(); }
        return if n > 0.0 { "INF".to_string() } else { "-INF".to_string() };
    }

    let n0 = if n == 0.0 { 0.0 } else { n };

    // Integer fast path: no decimal point needed
    if n0.fract() == 0.0 && n0.abs() < 9e15 {
        format!("{:.0}", n0)
    } else {
        let mut s = format!("{:.15}", n0);
        while s.contains('.') && s.ends_with('0') { s.pop(); }
        if s.ends_with('.') { s.pop(); }
        s
    }
}

/// Insert `,` between groups of three integer digits.
pub fn group_thousands(canonical: &str) -> String {
    let (sign, rest) = match canonical.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", canonical),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };
    if !int_part.chars().all(|c| c.is_ascii_digit()) {
        return canonical.to_string();
    }

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands_separator_equal() {
        assert!(equals(&CellValue::text("1,234"), &CellValue::Number(1234.0)));
    }

    #[test]
    fn test_trailing_zero_decimals_equal() {
        assert!(equals(&CellValue::text("1234.00"), &CellValue::Number(1234.0)));
        assert!(!equals(&CellValue::text("1234.01"), &CellValue::Number(1234.0)));
    }

    #[test]
    fn test_negative_numbers() {
        assert!(equals(&CellValue::text("-1,000.5"), &CellValue::Number(-1000.5)));
        assert_eq!(normalize(&CellValue::text(" -42 ")), ComparableValue::Number(-42.0));
    }

    #[test]
    fn test_non_numeric_text_is_trimmed() {
        assert_eq!(normalize(&CellValue::text("  abc ")), ComparableValue::Text("abc".into()));
        assert!(equals(&CellValue::text("abc "), &CellValue::text(" abc")));
        assert!(!equals(&CellValue::text("abc"), &CellValue::text("ABC")));
        // Not the numeric pattern: stays text
        assert_eq!(normalize(&CellValue::text("12%")), ComparableValue::Text("12%".into()));
        assert_eq!(normalize(&CellValue::text(".5")), ComparableValue::Text(".5".into()));
        assert_eq!(normalize(&CellValue::text("1e5")), ComparableValue::Text("1e5".into()));
    }

    #[test]
    fn test_empty_and_blank() {
        assert!(equals(&CellValue::Empty, &CellValue::Empty));
        assert!(equals(&CellValue::Empty, &CellValue::text("   ")));
        assert!(!equals(&CellValue::Empty, &CellValue::Number(0.0)));
        assert!(!equals(&CellValue::Empty, &CellValue::text("0")));
    }

    #[test]
    fn test_lookup_compares_by_id() {
        let a = CellValue::lookup("A", "Alpha");
        let b = CellValue::lookup("A", "Renamed");
        assert!(equals(&a, &b));
        assert!(equals(&a, &CellValue::text("A")));
        assert!(!equals(&a, &CellValue::lookup("B", "Alpha")));
    }

    #[test]
    fn test_number_vs_text_unequal() {
        assert!(!equals(&CellValue::Number(1.0), &CellValue::text("one")));
    }

    #[test]
    fn test_canonical_number() {
        assert_eq!(canonical_number(1234.0), "1234");
        assert_eq!(canonical_number(-0.0), "0");
        assert_eq!(canonical_number(0.25), "0.25");
        assert_eq!(canonical_number(1e20), "100000000000000000000");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1234567.5"), "1,234,567.5");
        assert_eq!(group_thousands("-1000"), "-1,000");
        assert_eq!(group_thousands("999"), "999");
        assert_eq!(group_thousands("NaN"), "NaN");
    }

    #[test]
    fn test_serde_untagged() {
        let values: Vec<CellValue> =
            serde_json::from_str(r#"[null, 3.5, "x", {"id": "A", "label": "Alpha"}]"#).unwrap();
        assert_eq!(values[0], CellValue::Empty);
        assert_eq!(values[1], CellValue::Number(3.5));
        assert_eq!(values[2], CellValue::text("x"));
        assert_eq!(values[3], CellValue::lookup("A", "Alpha"));
    }
}
