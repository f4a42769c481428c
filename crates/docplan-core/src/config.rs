//! Compiler configuration.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::query::Dialect;

/// Page size for join fields when neither the caller nor the field sets one.
pub const DEFAULT_JOIN_LIMIT: u32 = 10;

/// Configuration shared by every compilation of one planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// JSON aggregation syntax for join fields.
    pub dialect: Dialect,
    /// Suffix of locale overlay tables.
    pub locales_suffix: String,
    /// Suffix of relationship side tables.
    pub relationships_suffix: String,
    /// Suffix of many-valued text side tables.
    pub texts_suffix: String,
    /// Suffix of many-valued number side tables.
    pub numbers_suffix: String,
    /// Page size for join fields without an explicit or field-level limit.
    pub default_join_limit: u32,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Postgres,
            locales_suffix: "_locales".into(),
            relationships_suffix: "_rels".into(),
            texts_suffix: "_texts".into(),
            numbers_suffix: "_numbers".into(),
            default_join_limit: DEFAULT_JOIN_LIMIT,
        }
    }
}

impl CompilerConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Set the dialect.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the locale table suffix.
    pub fn locales_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.locales_suffix = suffix.into();
        self
    }

    /// Set the relationship table suffix.
    pub fn relationships_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.relationships_suffix = suffix.into();
        self
    }

    /// Set the default join page size.
    pub fn default_join_limit(mut self, limit: u32) -> Self {
        self.default_join_limit = limit;
        self
    }

    /// Name of the locale table for `table`.
    pub fn locales_table(&self, table: &str) -> String {
        format!("{}{}", table, self.locales_suffix)
    }

    /// Name of the relationship table for `table`.
    pub fn relationships_table(&self, table: &str) -> String {
        format!("{}{}", table, self.relationships_suffix)
    }

    /// Name of the text side table for `table`.
    pub fn texts_table(&self, table: &str) -> String {
        format!("{}{}", table, self.texts_suffix)
    }

    /// Name of the number side table for `table`.
    pub fn numbers_table(&self, table: &str) -> String {
        format!("{}{}", table, self.numbers_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.dialect, Dialect::Postgres);
        assert_eq!(config.default_join_limit, 10);
        assert_eq!(config.locales_table("pages"), "pages_locales");
        assert_eq!(config.relationships_table("pages"), "pages_rels");
        assert_eq!(config.texts_table("pages"), "pages_texts");
        assert_eq!(config.numbers_table("pages"), "pages_numbers");
    }

    #[test]
    fn test_builder() {
        let config = CompilerConfig::new()
            .dialect(Dialect::Sqlite)
            .locales_suffix("_l10n")
            .relationships_suffix("_relations")
            .default_join_limit(25);

        assert_eq!(config.dialect, Dialect::Sqlite);
        assert_eq!(config.locales_table("pages"), "pages_l10n");
        assert_eq!(config.relationships_table("pages"), "pages_relations");
        assert_eq!(config.default_join_limit, 25);
    }

    #[test]
    fn test_from_json_partial() {
        let config = CompilerConfig::from_json(r#"{"dialect": "sqlite"}"#).unwrap();
        assert_eq!(config.dialect, Dialect::Sqlite);
        assert_eq!(config.locales_suffix, "_locales");

        assert!(CompilerConfig::from_json(r#"{"dialect": "oracle"}"#).is_err());
    }
}
