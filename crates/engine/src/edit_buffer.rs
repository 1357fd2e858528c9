//! Dirty-cell tracking relative to the last saved baseline.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use gridedit_core::{CellKey, CellValue, ColumnDescriptor};

/// Baseline and pending value of one dirty cell.
///
/// `original_value` is captured at the first edit since the last save or
/// cancel and is never overwritten by later edits to the same cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRecord {
    #[serde(rename = "originalValue")]
    pub original_value: CellValue,
    #[serde(rename = "currentValue")]
    pub current_value: CellValue,
}

/// What a single commit did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Entry inserted or updated: the cell is dirty.
    Recorded,
    /// Value matched the baseline and an existing entry was removed.
    Reverted,
    /// Value matched the baseline and the cell was already clean.
    Unchanged,
}

impl CommitOutcome {
    /// True if a change was recorded.
    pub fn is_recorded(&self) -> bool {
        matches!(self, CommitOutcome::Recorded)
    }

    /// True if dirty state of the cell changed either way.
    pub fn touched(&self) -> bool {
        !matches!(self, CommitOutcome::Unchanged)
    }
}

/// At most one [`EditRecord`] per [`CellKey`]; never stores a no-op.
#[derive(Debug, Default)]
pub struct EditBuffer {
    entries: FxHashMap<CellKey, EditRecord>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dirty cells.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &CellKey) -> Option<&EditRecord> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &CellKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Value an edit must be compared against: the captured original if the
    /// cell is already dirty, otherwise the live stored value.
    pub fn baseline<'a>(&'a self, key: &CellKey, live: &'a CellValue) -> &'a CellValue {
        match self.entries.get(key) {
            Some(record) => &record.original_value,
            None => live,
        }
    }

    /// Record `new_value` for `key` given its `baseline`.
    pub fn record(
        &mut self,
        key: CellKey,
        column: &ColumnDescriptor,
        baseline: CellValue,
        new_value: CellValue,
    ) -> CommitOutcome {
        if column.values_equal(&baseline, &new_value) {
            return match self.entries.remove(&key) {
                Some(_) => CommitOutcome::Reverted,
                None => CommitOutcome::Unchanged,
            };
        }

        match self.entries.get_mut(&key) {
            Some(record) => record.current_value = new_value,
            None => {
                self.entries.insert(key, EditRecord { original_value: baseline, current_value: new_value });
            }
        }
        CommitOutcome::Recorded
    }

    pub fn remove(&mut self, key: &CellKey) -> Option<EditRecord> {
        self.entries.remove(key)
    }

    /// Drop every entry, returning the keys that were dirty.
    pub fn clear(&mut self) -> Vec<CellKey> {
        let mut keys: Vec<CellKey> = self.entries.drain().map(|(k, _)| k).collect();
        keys.sort();
        keys
    }

    /// Keep only entries for which `keep` returns true; returns the keys dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&CellKey) -> bool) -> Vec<CellKey> {
        let mut dropped = Vec::new();
        self.entries.retain(|key, _| {
            if keep(key) {
                true
            } else {
                dropped.push(key.clone());
                false
            }
        });
        dropped.sort();
        dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &EditRecord)> {
        self.entries.iter()
    }

    /// Ordered copy of every entry, as handed to the save collaborator.
    pub fn snapshot(&self) -> BTreeMap<CellKey, EditRecord> {
        self.entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridedit_core::DataType;

    fn numeric() -> ColumnDescriptor {
        ColumnDescriptor::new("qty", "Qty", DataType::Numeric)
    }

    #[test]
    fn test_first_edit_captures_original() {
        let mut buf = EditBuffer::new();
        let key = CellKey::new("r1", "qty");
        let outcome = buf.record(key.clone(), &numeric(), CellValue::Number(5.0), CellValue::Number(6.0));
        assert_eq!(outcome, CommitOutcome::Recorded);

        let baseline = buf.baseline(&key, &CellValue::Number(6.0)).clone();
        assert_eq!(baseline, CellValue::Number(5.0));
        buf.record(key.clone(), &numeric(), baseline, CellValue::Number(7.0));

        let record = buf.get(&key).unwrap();
        assert_eq!(record.original_value, CellValue::Number(5.0));
        assert_eq!(record.current_value, CellValue::Number(7.0));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_revert_to_baseline_removes_entry() {
        let mut buf = EditBuffer::new();
        let key = CellKey::new("r1", "qty");
        buf.record(key.clone(), &numeric(), CellValue::Number(5.0), CellValue::Number(6.0));
        let outcome = buf.record(key.clone(), &numeric(), CellValue::Number(5.0), CellValue::text("5.00"));
        assert_eq!(outcome, CommitOutcome::Reverted);
        assert!(buf.is_empty());

        let outcome = buf.record(key, &numeric(), CellValue::Number(5.0), CellValue::text("5"));
        assert_eq!(outcome, CommitOutcome::Unchanged);
    }

    #[test]
    fn test_retain_reports_dropped() {
        let mut buf = EditBuffer::new();
        for row in ["a", "b", "c"] {
            buf.record(CellKey::new(row, "qty"), &numeric(), CellValue::Empty, CellValue::Number(1.0));
        }
        let dropped = buf.retain(|k| k.row_id() != "b");
        assert_eq!(dropped, vec![CellKey::new("b", "qty")]);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_snapshot_is_ordered() {
        let mut buf = EditBuffer::new();
        buf.record(CellKey::new("b", "qty"), &numeric(), CellValue::Empty, CellValue::Number(1.0));
        buf.record(CellKey::new("a", "qty"), &numeric(), CellValue::Empty, CellValue::Number(2.0));
        let keys: Vec<String> = buf.snapshot().keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["a|qty", "b|qty"]);
    }
}
