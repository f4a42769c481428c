//! Projection masks supplied by callers.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A projection mask: field name to `true`, `false` or a nested mask.
///
/// Deserializes from the JSON shape callers already use, e.g.
/// `{"title": true, "meta": {"description": true}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectMask(BTreeMap<String, SelectValue>);

/// A single mask entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectValue {
    /// Force-include (`true`) or force-exclude (`false`).
    Bool(bool),
    /// Mask for a composite field.
    Nested(SelectMask),
}

/// How mask entries are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectMode {
    /// Only named entries are selected.
    #[default]
    Include,
    /// Everything is selected except entries set to `false`.
    Exclude,
}

/// Shared empty mask, used for block shapes that select nothing.
pub(crate) static EMPTY_MASK: SelectMask = SelectMask(BTreeMap::new());

impl SelectMask {
    /// Create an empty mask.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a mask from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Force-include a field.
    pub fn include(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into(), SelectValue::Bool(true));
        self
    }

    /// Force-exclude a field.
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.0.insert(name.into(), SelectValue::Bool(false));
        self
    }

    /// Set a nested mask for a composite field.
    pub fn nested(mut self, name: impl Into<String>, mask: SelectMask) -> Self {
        self.0.insert(name.into(), SelectValue::Nested(mask));
        self
    }

    /// Get the entry for a field.
    pub fn get(&self, name: &str) -> Option<&SelectValue> {
        self.0.get(name)
    }

    /// Check if the mask has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn has_exclusion(&self) -> bool {
        self.0.values().any(|value| match value {
            SelectValue::Bool(selected) => !selected,
            SelectValue::Nested(mask) => mask.has_exclusion(),
        })
    }
}

impl SelectMode {
    /// Infer the mode from a mask: any `false` entry, at any depth, makes it
    /// exclusive.
    pub fn infer(mask: &SelectMask) -> Self {
        if mask.has_exclusion() {
            SelectMode::Exclude
        } else {
            SelectMode::Include
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_builder() {
        let mask = SelectMask::new()
            .include("title")
            .exclude("body")
            .nested("meta", SelectMask::new().include("description"));

        assert_eq!(mask.len(), 3);
        assert_eq!(mask.get("title"), Some(&SelectValue::Bool(true)));
        assert_eq!(mask.get("body"), Some(&SelectValue::Bool(false)));
        assert!(matches!(mask.get("meta"), Some(SelectValue::Nested(m)) if m.len() == 1));
        assert!(mask.get("missing").is_none());
    }

    #[test]
    fn test_mask_from_json() {
        let mask = SelectMask::from_json(r#"{"title": true, "meta": {"image": false}}"#).unwrap();
        assert_eq!(mask.get("title"), Some(&SelectValue::Bool(true)));
        assert!(matches!(mask.get("meta"), Some(SelectValue::Nested(_))));

        assert!(SelectMask::from_json(r#"{"title": "yes"}"#).is_err());
    }

    #[test]
    fn test_infer_mode() {
        assert_eq!(SelectMode::infer(&SelectMask::new()), SelectMode::Include);
        assert_eq!(
            SelectMode::infer(&SelectMask::new().include("a")),
            SelectMode::Include
        );
        assert_eq!(
            SelectMode::infer(&SelectMask::new().exclude("a")),
            SelectMode::Exclude
        );

        let deep = SelectMask::new().nested("g", SelectMask::new().exclude("secret"));
        assert_eq!(SelectMode::infer(&deep), SelectMode::Exclude);
    }

    #[test]
    fn test_empty_mask() {
        assert!(EMPTY_MASK.is_empty());
    }
}
