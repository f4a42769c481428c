//! Physical table metadata consulted while compiling plans.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Read-only view of the physical storage schema.
///
/// Logical names are the snake-cased paths the compiler builds (e.g.
/// `pages_blocks_hero`); physical names are whatever the storage layer
/// actually created for them.
pub trait MetadataProvider {
    /// Map a logical table path to its physical table name.
    fn physical_table_name(&self, logical: &str) -> Option<String>;

    /// Check whether a physical table exists.
    fn table_exists(&self, table: &str) -> bool;

    /// Check whether a column exists on a physical table.
    fn column_exists(&self, table: &str, column: &str) -> bool;
}

/// A physical table and its columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDef {
    /// Physical table name.
    pub name: String,
    /// Column keys.
    pub columns: HashSet<String>,
}

impl TableDef {
    /// Create a table without columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: HashSet::new(),
        }
    }

    /// Add a column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.columns.insert(column.into());
        self
    }

    /// Add several columns.
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Check if the table has a column.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }
}

/// In-memory table catalog.
///
/// Tables are registered once at startup and then read concurrently by
/// planners; the catalog is `Send + Sync`.
#[derive(Debug, Default)]
pub struct TableCatalog {
    /// Physical tables keyed by name.
    tables: RwLock<HashMap<String, TableDef>>,
    /// Logical path to physical name, for tables whose names were shortened.
    name_map: RwLock<HashMap<String, String>>,
}

impl TableCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a physical table under its own name.
    pub fn register_table(&self, table: TableDef) {
        self.tables.write().insert(table.name.clone(), table);
    }

    /// Register a physical table under a logical path that differs from its
    /// physical name.
    pub fn register_mapped_table(&self, logical: impl Into<String>, table: TableDef) {
        self.name_map.write().insert(logical.into(), table.name.clone());
        self.register_table(table);
    }

    /// Builder form of [`register_table`](Self::register_table).
    pub fn with_table(self, table: TableDef) -> Self {
        self.register_table(table);
        self
    }

    /// Get a copy of a table definition.
    pub fn get_table(&self, name: &str) -> Option<TableDef> {
        self.tables.read().get(name).cloned()
    }

    /// List all physical table names.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl MetadataProvider for TableCatalog {
    fn physical_table_name(&self, logical: &str) -> Option<String> {
        if let Some(physical) = self.name_map.read().get(logical) {
            return Some(physical.clone());
        }
        self.tables
            .read()
            .contains_key(logical)
            .then(|| logical.to_string())
    }

    fn table_exists(&self, table: &str) -> bool {
        self.tables.read().contains_key(table)
    }

    fn column_exists(&self, table: &str, column: &str) -> bool {
        self.tables
            .read()
            .get(table)
            .is_some_and(|t| t.has_column(column))
    }
}
