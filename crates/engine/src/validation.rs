//! Validation gateway
//!
//! Wraps the host-supplied per-cell validator and records its verdicts keyed
//! the same way as the edit buffer. The error map is independent of dirty
//! state: a cell may be dirty without an error and vice versa.
//!
//! The validator is called synchronously and must return a definitive answer;
//! there is no provisional state.

use rustc_hash::FxHashMap;

use gridedit_core::{CellKey, CellValue};

use crate::collab::CellValidator;

/// Result of checking one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Valid,
    Invalid { message: String },
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        !self.is_valid()
    }
}

/// Per-cell validation errors plus the optional validator that produces them.
#[derive(Default)]
pub struct ValidationGateway {
    validator: Option<Box<dyn CellValidator>>,
    errors: FxHashMap<CellKey, String>,
}

impl std::fmt::Debug for ValidationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationGateway")
            .field("has_validator", &self.validator.is_some())
            .field("errors", &self.errors)
            .finish()
    }
}

impl ValidationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validator(validator: Box<dyn CellValidator>) -> Self {
        Self { validator: Some(validator), errors: FxHashMap::default() }
    }

    /// Install or remove the validator. Existing errors are kept.
    pub fn set_validator(&mut self, validator: Option<Box<dyn CellValidator>>) {
        self.validator = validator;
    }

    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }

    /// Run the validator for one cell and store or clear its error.
    /// Without a validator every value is valid.
    pub fn check(&mut self, key: &CellKey, value: &CellValue) -> ValidationResult {
        let verdict = self
            .validator
            .as_ref()
            .and_then(|v| v.validate(key.row_id(), key.column_id(), value));

        match verdict {
            Some(message) => {
                log::debug!("validation failed for {key}: {message}");
                self.errors.insert(key.clone(), message.clone());
                ValidationResult::Invalid { message }
            }
            None => {
                self.errors.remove(key);
                ValidationResult::Valid
            }
        }
    }

    /// Forget any error for `key`. Returns true if one was stored.
    pub fn clear_key(&mut self, key: &CellKey) -> bool {
        self.errors.remove(key).is_some()
    }

    pub fn clear(&mut self) -> Vec<CellKey> {
        let mut keys: Vec<CellKey> = self.errors.drain().map(|(k, _)| k).collect();
        keys.sort();
        keys
    }

    /// Number of cells currently in error.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_for(&self, key: &CellKey) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellKey, &str)> {
        self.errors.iter().map(|(k, m)| (k, m.as_str()))
    }

    /// Keep only errors for which `keep` returns true; returns the keys dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&CellKey) -> bool) -> Vec<CellKey> {
        let mut dropped = Vec::new();
        self.errors.retain(|key, _| {
            let kept = keep(key);
            if !kept {
                dropped.push(key.clone());
            }
            kept
        });
        dropped.sort();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positive_only() -> ValidationGateway {
        ValidationGateway::with_validator(Box::new(|_row: &str, _col: &str, value: &CellValue| {
            match value {
                CellValue::Number(n) if *n < 0.0 => Some("must be positive".to_string()),
                _ => None,
            }
        }))
    }

    #[test]
    fn test_no_validator_is_always_valid() {
        let mut gateway = ValidationGateway::new();
        let result = gateway.check(&CellKey::new("r1", "qty"), &CellValue::Number(-1.0));
        assert!(result.is_valid());
        assert!(!gateway.has_errors());
    }

    #[test]
    fn test_store_then_clear_on_fix() {
        let mut gateway = positive_only();
        let key = CellKey::new("r1", "qty");

        let result = gateway.check(&key, &CellValue::Number(-1.0));
        assert!(result.is_invalid());
        assert_eq!(gateway.error_for(&key), Some("must be positive"));

        gateway.check(&key, &CellValue::Number(3.0));
        assert_eq!(gateway.error_for(&key), None);
        assert_eq!(gateway.len(), 0);
    }

    #[test]
    fn test_validator_sees_key_parts() {
        let mut gateway = ValidationGateway::with_validator(Box::new(
            |row: &str, col: &str, _value: &CellValue| Some(format!("{row}/{col}")),
        ));
        gateway.check(&CellKey::new("r7", "name"), &CellValue::Empty);
        assert_eq!(gateway.error_for(&CellKey::new("r7", "name")), Some("r7/name"));
    }

    #[test]
    fn test_retain_prunes_rows() {
        let mut gateway = positive_only();
        gateway.check(&CellKey::new("a", "qty"), &CellValue::Number(-1.0));
        gateway.check(&CellKey::new("b", "qty"), &CellValue::Number(-2.0));

        let dropped = gateway.retain(|k| k.row_id() != "a");
        assert_eq!(dropped, vec![CellKey::new("a", "qty")]);
        assert!(gateway.error_for(&CellKey::new("b", "qty")).is_some());
    }
}
