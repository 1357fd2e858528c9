//! Dataset files and cell coordinate arguments.
//!
//! A dataset is one JSON document: `{ "columns": [...], "rows": [...] }`,
//! using the same column and row shapes the editor works with.

use std::path::Path;

use serde::{Deserialize, Serialize};

use gridedit_core::{CellPosition, CellRange, CellValue, ColumnDescriptor, RowRecord};
use gridedit_engine::CellValidator;

use crate::CliError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub rows: Vec<RowRecord>,
    /// Column ids that must not be left blank.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Dataset {
    pub fn from_json(contents: &str) -> Result<Self, CliError> {
        serde_json::from_str(contents).map_err(|e| CliError::parse(format!("invalid dataset: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, CliError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
        let dataset = Self::from_json(&contents)?;
        log::info!("loaded {}: {} columns, {} rows", path.display(), dataset.columns.len(), dataset.rows.len());
        Ok(dataset)
    }

    /// Validator enforcing `required` columns, or None when there are none.
    pub fn validator(&self) -> Option<Box<dyn CellValidator>> {
        if self.required.is_empty() {
            return None;
        }
        let required = self.required.clone();
        Some(Box::new(move |_row: &str, column: &str, value: &CellValue| {
            (required.iter().any(|c| c == column) && value.is_blank()).then(|| "value is required".to_string())
        }))
    }
}

/// Parse `ROW,COL` (0-based).
pub fn parse_position(s: &str) -> Result<CellPosition, CliError> {
    let (row, col) = s
        .split_once(',')
        .ok_or_else(|| CliError::args(format!("invalid position '{s}'")).with_hint("expected ROW,COL, e.g. 2,0"))?;
    let row = row.trim().parse::<usize>().map_err(|_| CliError::args(format!("invalid row in '{s}'")))?;
    let col = col.trim().parse::<usize>().map_err(|_| CliError::args(format!("invalid column in '{s}'")))?;
    Ok(CellPosition::new(row, col))
}

/// Parse `R1,C1:R2,C2` or a single `R,C`.
pub fn parse_range(s: &str) -> Result<CellRange, CliError> {
    match s.split_once(':') {
        Some((start, end)) => Ok(CellRange::spanning(parse_position(start)?, parse_position(end)?)),
        None => {
            let pos = parse_position(s)?;
            Ok(CellRange::single(pos.row, pos.col))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridedit_core::DataType;

    #[test]
    fn test_parse_dataset() {
        let dataset = Dataset::from_json(
            r#"{
                "columns": [
                    {"id": "name", "displayName": "Name"},
                    {"id": "qty", "displayName": "Qty", "dataType": "numeric"}
                ],
                "rows": [
                    {"id": "r1", "values": {"name": "Ada", "qty": 3}},
                    {"id": "r2"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(dataset.columns[1].data_type, DataType::Numeric);
        assert_eq!(dataset.rows[0].value("qty"), &CellValue::Number(3.0));
        assert_eq!(dataset.rows[1].value("name"), &CellValue::Empty);
    }

    #[test]
    fn test_bad_dataset_is_parse_error() {
        let err = Dataset::from_json("{").unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_PARSE);
    }

    #[test]
    fn test_parse_range_normalizes() {
        assert_eq!(parse_range("3,1:0,0").unwrap(), CellRange::new(0, 0, 3, 1));
        assert_eq!(parse_range("2,2").unwrap(), CellRange::single(2, 2));
        assert!(parse_range("a,b").is_err());
        assert!(parse_range("1").is_err());
    }

    #[test]
    fn test_required_columns_validator() {
        let dataset = Dataset::from_json(r#"{"columns": [{"id": "name", "displayName": "Name"}], "required": ["name"]}"#).unwrap();
        let validator = dataset.validator().unwrap();
        assert_eq!(validator.validate("r1", "name", &CellValue::Empty).as_deref(), Some("value is required"));
        assert_eq!(validator.validate("r1", "name", &CellValue::text("x")), None);
        assert_eq!(validator.validate("r1", "other", &CellValue::Empty), None);
        assert!(Dataset::default().validator().is_none());
    }
}
