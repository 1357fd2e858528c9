//! Row records and the ordered row store of a loaded section.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::cell::KEY_SEPARATOR;
use crate::value::CellValue;

static EMPTY: CellValue = CellValue::Empty;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowRecord {
    pub id: String,
    #[serde(default)]
    pub values: BTreeMap<String, CellValue>,
}

impl RowRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), values: BTreeMap::new() }
    }

    pub fn with_value(mut self, column_id: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.values.insert(column_id.into(), value.into());
        self
    }

    /// Value for a column; missing entries read as empty.
    pub fn value(&self, column_id: &str) -> &CellValue {
        self.values.get(column_id).unwrap_or(&EMPTY)
    }
}

/// Rows in display order with an id index.
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    rows: Vec<RowRecord>,
    index: HashMap<String, usize>,
}

impl RowStore {
    /// Build from records. Rows with a duplicate id are dropped (first wins),
    /// as are rows whose id is empty or contains the cell key separator.
    pub fn new(records: Vec<RowRecord>) -> Self {
        let mut store = Self::default();
        for record in records {
            if !is_valid_row_id(&record.id) {
                log::warn!("dropping row with unusable id '{}'", record.id);
                continue;
            }
            if store.index.contains_key(&record.id) {
                log::warn!("dropping row with duplicate id '{}'", record.id);
                continue;
            }
            store.push(record);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RowRecord> {
        self.rows.get(index)
    }

    pub fn by_id(&self, id: &str) -> Option<&RowRecord> {
        self.index.get(id).map(|&i| &self.rows[i])
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowRecord> {
        self.rows.iter()
    }

    /// Append a row. Returns false (and changes nothing) if the id exists
    /// or cannot appear in a cell key.
    pub fn push(&mut self, record: RowRecord) -> bool {
        if !is_valid_row_id(&record.id) || self.index.contains_key(&record.id) {
            return false;
        }
        self.index.insert(record.id.clone(), self.rows.len());
        self.rows.push(record);
        true
    }

    /// Overwrite one stored value.
    pub fn set_value(&mut self, row_id: &str, column_id: &str, value: CellValue) -> bool {
        let Some(&i) = self.index.get(row_id) else {
            return false;
        };
        let values = &mut self.rows[i].values;
        if matches!(value, CellValue::Empty) {
            values.remove(column_id);
        } else {
            values.insert(column_id.to_string(), value);
        }
        true
    }

    /// Remove rows by id, preserving order of the rest. Returns the ids removed.
    pub fn remove_ids(&mut self, ids: &BTreeSet<String>) -> Vec<String> {
        let mut removed = Vec::new();
        self.rows.retain(|r| {
            if ids.contains(&r.id) {
                removed.push(r.id.clone());
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            self.reindex();
        }
        removed
    }

    fn reindex(&mut self) {
        self.index = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
    }
}

/// Row ids form the first half of a cell key, so they may not hold the separator.
fn is_valid_row_id(id: &str) -> bool {
    !id.is_empty() && !id.contains(KEY_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RowStore {
        RowStore::new(vec![
            RowRecord::new("a").with_value("name", "Ada"),
            RowRecord::new("b").with_value("name", "Bob"),
            RowRecord::new("c"),
        ])
    }

    #[test]
    fn test_lookup_by_id_and_position() {
        let rows = store();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.position("b"), Some(1));
        assert_eq!(rows.by_id("a").unwrap().value("name"), &CellValue::text("Ada"));
        assert_eq!(rows.get(2).unwrap().value("name"), &CellValue::Empty);
    }

    #[test]
    fn test_duplicate_ids_dropped() {
        let rows = RowStore::new(vec![
            RowRecord::new("a").with_value("n", 1i64),
            RowRecord::new("a").with_value("n", 2i64),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.by_id("a").unwrap().value("n"), &CellValue::Number(1.0));
    }

    #[test]
    fn test_separator_in_row_id_rejected() {
        let mut rows = RowStore::new(vec![RowRecord::new("a|b"), RowRecord::new(""), RowRecord::new("c")]);
        assert_eq!(rows.len(), 1);
        assert!(!rows.push(RowRecord::new("x|y")));
        assert!(rows.push(RowRecord::new("x-y")));
        assert_eq!(rows.position("x-y"), Some(1));
    }

    #[test]
    fn test_remove_reindexes() {
        let mut rows = store();
        let removed = rows.remove_ids(&BTreeSet::from(["a".to_string(), "zz".to_string()]));
        assert_eq!(removed, vec!["a".to_string()]);
        assert_eq!(rows.position("b"), Some(0));
        assert_eq!(rows.position("c"), Some(1));
        assert!(!rows.contains("a"));
    }

    #[test]
    fn test_push_rejects_existing_id() {
        let mut rows = store();
        assert!(!rows.push(RowRecord::new("b")));
        assert!(rows.push(RowRecord::new("d")));
        assert_eq!(rows.position("d"), Some(3));
    }

    #[test]
    fn test_set_value_empty_removes_entry() {
        let mut rows = store();
        assert!(rows.set_value("a", "name", CellValue::Empty));
        assert!(rows.by_id("a").unwrap().values.is_empty());
        assert!(!rows.set_value("missing", "name", CellValue::Number(1.0)));
    }
}
