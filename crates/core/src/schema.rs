//! Column schema and per-data-type behavior.
//!
//! Formatting, parsing and comparison are looked up in a single table indexed
//! by [`DataType`], so adding a type means adding one row to `BEHAVIORS`.

use std::fmt::Write;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::value::{self, canonical_number, group_thousands, parse_numeric, CellValue, LookupValue};

/// Storage format for date values.
pub const ISO_DATE: &str = "%Y-%m-%d";

/// Date formats accepted from typed or pasted text, tried in order.
const DATE_INPUT_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Text,
    Numeric,
    Date,
    Percent,
    Lookup,
    Image,
    Calculated,
}

impl DataType {
    pub const ALL: [DataType; 7] = [
        DataType::Text,
        DataType::Numeric,
        DataType::Date,
        DataType::Percent,
        DataType::Lookup,
        DataType::Image,
        DataType::Calculated,
    ];

    fn behavior(self) -> &'static TypeBehavior {
        let behavior = &BEHAVIORS[self as usize];
        debug_assert_eq!(behavior.data_type, self, "BEHAVIORS out of order");
        behavior
    }

    /// Whether cells of this type can ever be edited in place.
    pub fn allows_edit(self) -> bool {
        self.behavior().editable
    }
}

/// Display settings shared by every formatter.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayOptions {
    pub group_thousands: bool,
    pub date_format: String,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            group_thousands: true,
            date_format: ISO_DATE.to_string(),
        }
    }
}

impl DisplayOptions {
    /// Options for text handed to an in-place editor: ungrouped numbers, ISO dates.
    pub fn for_editing() -> Self {
        Self {
            group_thousands: false,
            date_format: ISO_DATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupOption {
    pub id: String,
    pub label: String,
}

impl LookupOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { id: id.into(), label: label.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "dataType", default)]
    pub data_type: DataType,
    #[serde(default = "default_editable")]
    pub editable: bool,
    #[serde(rename = "lookupOptions", default, skip_serializing_if = "Vec::is_empty")]
    pub lookup_options: Vec<LookupOption>,
}

fn default_editable() -> bool {
    true
}

impl ColumnDescriptor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            data_type,
            editable: true,
            lookup_options: Vec::new(),
        }
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn with_lookup_options(mut self, options: Vec<LookupOption>) -> Self {
        self.lookup_options = options;
        self
    }

    /// Editable flag combined with the data type's own rule (calculated
    /// columns are never editable).
    pub fn is_editable(&self) -> bool {
        self.editable && self.data_type.allows_edit()
    }

    /// Find an option by id, falling back to a case-insensitive label match.
    pub fn find_option(&self, text: &str) -> Option<&LookupOption> {
        let needle = text.trim();
        self.lookup_options
            .iter()
            .find(|o| o.id == needle)
            .or_else(|| {
                self.lookup_options
                    .iter()
                    .find(|o| o.label.eq_ignore_ascii_case(needle))
            })
    }

    /// Resolve a bare lookup id (or label) to the full `{id, label}` shape.
    /// Values that are not lookup candidates are returned unchanged.
    pub fn resolve_value(&self, value: CellValue) -> CellValue {
        if self.data_type != DataType::Lookup {
            return value;
        }
        let text = match &value {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => canonical_number(*n),
            _ => return value,
        };
        match self.find_option(&text) {
            Some(option) => CellValue::Lookup(LookupValue {
                id: option.id.clone(),
                label: option.label.clone(),
            }),
            None => value,
        }
    }

    /// Display string for a value in this column.
    pub fn format(&self, value: &CellValue, options: &DisplayOptions) -> String {
        (self.data_type.behavior().format)(value, self, options)
    }

    /// Text handed to an in-place editor for this value.
    pub fn edit_text(&self, value: &CellValue) -> String {
        self.format(value, &DisplayOptions::for_editing())
    }

    /// Interpret typed or pasted text as a value for this column.
    pub fn parse(&self, text: &str) -> CellValue {
        if text.trim().is_empty() {
            return CellValue::Empty;
        }
        (self.data_type.behavior().parse)(text, self)
    }

    /// Type-aware equality used by the edit pipeline.
    pub fn values_equal(&self, a: &CellValue, b: &CellValue) -> bool {
        (self.data_type.behavior().compare)(a, b, self)
    }
}

// ============================================================================
// Dispatch table
// ============================================================================

type FormatFn = fn(&CellValue, &ColumnDescriptor, &DisplayOptions) -> String;
type ParseFn = fn(&str, &ColumnDescriptor) -> CellValue;
type CompareFn = fn(&CellValue, &CellValue, &ColumnDescriptor) -> bool;

struct TypeBehavior {
    data_type: DataType,
    format: FormatFn,
    parse: ParseFn,
    compare: CompareFn,
    editable: bool,
}

/// Indexed by `DataType as usize`; order must match the enum.
static BEHAVIORS: [TypeBehavior; 7] = [
    TypeBehavior { data_type: DataType::Text, format: format_raw, parse: parse_text, compare: compare_plain, editable: true },
    TypeBehavior { data_type: DataType::Numeric, format: format_number, parse: parse_number, compare: compare_plain, editable: true },
    TypeBehavior { data_type: DataType::Date, format: format_date, parse: parse_date, compare: compare_plain, editable: true },
    TypeBehavior { data_type: DataType::Percent, format: format_percent, parse: parse_percent, compare: compare_plain, editable: true },
    TypeBehavior { data_type: DataType::Lookup, format: format_raw, parse: parse_lookup, compare: compare_lookup, editable: true },
    TypeBehavior { data_type: DataType::Image, format: format_raw, parse: parse_text, compare: compare_plain, editable: true },
    TypeBehavior { data_type: DataType::Calculated, format: format_raw, parse: parse_text, compare: compare_plain, editable: false },
];

fn format_raw(value: &CellValue, _: &ColumnDescriptor, _: &DisplayOptions) -> String {
    value.raw_text()
}

fn format_number(value: &CellValue, _: &ColumnDescriptor, options: &DisplayOptions) -> String {
    let n = match value {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => match parse_numeric(s) {
            Some(n) => n,
            None => return s.clone(),
        },
        other => return other.raw_text(),
    };
    let canonical = canonical_number(n);
    if options.group_thousands {
        group_thousands(&canonical)
    } else {
        canonical
    }
}

fn format_percent(value: &CellValue, column: &ColumnDescriptor, options: &DisplayOptions) -> String {
    if value.is_blank() {
        return String::new();
    }
    let number = format_number(value, column, options);
    if parse_numeric(&number).is_some() {
        format!("{number}%")
    } else {
        number
    }
}

fn format_date(value: &CellValue, _: &ColumnDescriptor, options: &DisplayOptions) -> String {
    match value {
        CellValue::Text(s) => match NaiveDate::parse_from_str(s.trim(), ISO_DATE) {
            // A format that cannot render a bare date (time fields, bad specifiers) shows the stored text.
            Ok(date) => {
                let mut out = String::new();
                match write!(out, "{}", date.format(&options.date_format)) {
                    Ok(()) => out,
                    Err(_) => s.clone(),
                }
            }
            Err(_) => s.clone(),
        },
        other => other.raw_text(),
    }
}

fn parse_text(text: &str, _: &ColumnDescriptor) -> CellValue {
    CellValue::Text(text.to_string())
}

fn parse_number(text: &str, _: &ColumnDescriptor) -> CellValue {
    match parse_numeric(text) {
        Some(n) => CellValue::Number(n),
        None => CellValue::Text(text.trim().to_string()),
    }
}

fn parse_percent(text: &str, column: &ColumnDescriptor) -> CellValue {
    let trimmed = text.trim();
    parse_number(trimmed.strip_suffix('%').unwrap_or(trimmed), column)
}

fn parse_date(text: &str, _: &ColumnDescriptor) -> CellValue {
    let trimmed = text.trim();
    for format in DATE_INPUT_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return CellValue::Text(date.format(ISO_DATE).to_string());
        }
    }
    CellValue::Text(trimmed.to_string())
}

fn parse_lookup(text: &str, column: &ColumnDescriptor) -> CellValue {
    column.resolve_value(CellValue::Text(text.trim().to_string()))
}

fn compare_plain(a: &CellValue, b: &CellValue, _: &ColumnDescriptor) -> bool {
    value::equals(a, b)
}

fn compare_lookup(a: &CellValue, b: &CellValue, column: &ColumnDescriptor) -> bool {
    let a = column.resolve_value(a.clone());
    let b = column.resolve_value(b.clone());
    value::equals(&a, &b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_column() -> ColumnDescriptor {
        ColumnDescriptor::new("status", "Status", DataType::Lookup).with_lookup_options(vec![
            LookupOption::new("A", "Alpha"),
            LookupOption::new("B", "Beta"),
        ])
    }

    #[test]
    fn test_table_order_matches_enum() {
        for data_type in DataType::ALL {
            assert_eq!(data_type.behavior().data_type, data_type);
        }
    }

    #[test]
    fn test_calculated_never_editable() {
        let mut col = ColumnDescriptor::new("total", "Total", DataType::Calculated);
        col.editable = true;
        assert!(!col.is_editable());
        assert!(ColumnDescriptor::new("n", "N", DataType::Numeric).is_editable());
        assert!(!ColumnDescriptor::new("n", "N", DataType::Numeric).read_only().is_editable());
    }

    #[test]
    fn test_lookup_bare_id_resolves() {
        let col = status_column();
        let resolved = col.resolve_value(CellValue::text("A"));
        assert_eq!(resolved, CellValue::lookup("A", "Alpha"));
        assert!(col.values_equal(&CellValue::lookup("A", "Alpha"), &CellValue::text("A")));
        assert!(!col.values_equal(&CellValue::lookup("A", "Alpha"), &CellValue::text("B")));
    }

    #[test]
    fn test_lookup_label_resolves() {
        let col = status_column();
        assert_eq!(col.parse("beta"), CellValue::lookup("B", "Beta"));
        assert!(col.values_equal(&CellValue::text("Alpha"), &CellValue::text("A")));
        // Unknown stays as text so a validator can flag it
        assert_eq!(col.parse("Gamma"), CellValue::text("Gamma"));
    }

    #[test]
    fn test_number_format_and_parse() {
        let col = ColumnDescriptor::new("amount", "Amount", DataType::Numeric);
        let opts = DisplayOptions::default();
        assert_eq!(col.format(&CellValue::Number(1234567.25), &opts), "1,234,567.25");
        assert_eq!(col.edit_text(&CellValue::Number(1234567.25)), "1234567.25");
        assert_eq!(col.parse("1,234"), CellValue::Number(1234.0));
        assert_eq!(col.parse(" n/a "), CellValue::text("n/a"));
        assert_eq!(col.parse("   "), CellValue::Empty);
    }

    #[test]
    fn test_percent_round_trip() {
        let col = ColumnDescriptor::new("rate", "Rate", DataType::Percent);
        let opts = DisplayOptions::default();
        let shown = col.format(&CellValue::Number(12.5), &opts);
        assert_eq!(shown, "12.5%");
        assert_eq!(col.parse(&shown), CellValue::Number(12.5));
        assert_eq!(col.format(&CellValue::Empty, &opts), "");
    }

    #[test]
    fn test_date_formats() {
        let col = ColumnDescriptor::new("due", "Due", DataType::Date);
        assert_eq!(col.parse("2024/03/05"), CellValue::text("2024-03-05"));
        assert_eq!(col.parse("03/05/2024"), CellValue::text("2024-03-05"));
        assert_eq!(col.parse("soon"), CellValue::text("soon"));

        let opts = DisplayOptions { group_thousands: true, date_format: "%d.%m.%Y".into() };
        assert_eq!(col.format(&CellValue::text("2024-03-05"), &opts), "05.03.2024");
    }

    #[test]
    fn test_lookup_displays_label() {
        let col = status_column();
        let opts = DisplayOptions::default();
        assert_eq!(col.format(&CellValue::lookup("B", "Beta"), &opts), "Beta");
    }

    #[test]
    fn test_column_serde_defaults() {
        let col: ColumnDescriptor =
            serde_json::from_str(r#"{"id": "name", "displayName": "Name"}"#).unwrap();
        assert_eq!(col.data_type, DataType::Text);
        assert!(col.editable);
        assert!(col.lookup_options.is_empty());

        let col: ColumnDescriptor = serde_json::from_str(
            r#"{"id": "s", "displayName": "S", "dataType": "lookup", "editable": false,
                "lookupOptions": [{"id": "A", "label": "Alpha"}]}"#,
        )
        .unwrap();
        assert_eq!(col.data_type, DataType::Lookup);
        assert!(!col.editable);
        assert_eq!(col.lookup_options.len(), 1);
    }

    #[test]
    fn test_date_format_without_date_rendering_falls_back() {
        let col = ColumnDescriptor::new("due", "Due", DataType::Date);
        let value = CellValue::text("2024-03-05");
        for fmt in ["%Y-%m-%d %H:%M", "%Q", "%d.%m.%Y %S"] {
            let options = DisplayOptions { date_format: fmt.to_string(), ..DisplayOptions::default() };
            assert_eq!(col.format(&value, &options), "2024-03-05", "format {fmt}");
        }
    }
}
