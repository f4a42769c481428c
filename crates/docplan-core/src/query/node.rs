//! Plan nodes: the nested fetch description handed to the executor.

use std::collections::{BTreeMap, BTreeSet};

use docplan_proto::OrderDirection;
use serde::Serialize;

use super::join::{ComputedColumn, SqlFragment};
use crate::error::Error;

/// Key under which a locale overlay is nested.
pub const LOCALES_KEY: &str = "_locales";

/// Columns fetched for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSelection {
    /// Explicit projection.
    Only(BTreeSet<String>),
    /// Every column except the listed row-identity / linkage columns.
    AllExcept(BTreeSet<String>),
}

impl ColumnSelection {
    /// Select exactly the given columns.
    pub fn only<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnSelection::Only(columns.into_iter().map(Into::into).collect())
    }

    /// Select everything except the given columns.
    pub fn all_except<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnSelection::AllExcept(columns.into_iter().map(Into::into).collect())
    }

    /// Select every column.
    pub fn all() -> Self {
        ColumnSelection::AllExcept(BTreeSet::new())
    }

    /// Check if this is an explicit projection.
    pub fn is_explicit(&self) -> bool {
        matches!(self, ColumnSelection::Only(_))
    }

    /// Add a column to an explicit projection.
    ///
    /// Returns `false` (and does nothing) for wildcard selections, which
    /// already fetch the column.
    pub fn insert(&mut self, column: impl Into<String>) -> bool {
        match self {
            ColumnSelection::Only(columns) => columns.insert(column.into()),
            ColumnSelection::AllExcept(_) => false,
        }
    }

    /// Check whether a column would be fetched.
    pub fn selects(&self, column: &str) -> bool {
        match self {
            ColumnSelection::Only(columns) => columns.contains(column),
            ColumnSelection::AllExcept(excluded) => !excluded.contains(column),
        }
    }

    /// Number of explicitly selected columns (`None` for wildcards).
    pub fn explicit_len(&self) -> Option<usize> {
        match self {
            ColumnSelection::Only(columns) => Some(columns.len()),
            ColumnSelection::AllExcept(_) => None,
        }
    }
}

/// A child nesting of a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Nesting {
    /// Fetch the related row by id only.
    ById,
    /// Fetch the related rows with a nested plan.
    Plan(PlanNode),
}

impl Nesting {
    /// Get the nested plan, if any.
    pub fn as_plan(&self) -> Option<&PlanNode> {
        match self {
            Nesting::Plan(node) => Some(node),
            Nesting::ById => None,
        }
    }
}

/// A single ordering term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderTerm {
    /// Column to order by.
    pub column: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderTerm {
    /// Ascending order on a column.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Descending order on a column.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// One level of a fetch plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanNode {
    /// Physical table, when resolved.
    pub table: Option<String>,
    /// Columns to fetch.
    pub columns: ColumnSelection,
    /// Child nestings keyed by relation key.
    pub with: BTreeMap<String, Nesting>,
    /// Ordering of the rows of this level.
    pub order_by: Vec<OrderTerm>,
    /// Row limit for this level.
    pub limit: Option<u32>,
    /// Row filter for this level.
    pub filter: Option<SqlFragment>,
    /// Computed columns keyed by alias.
    pub extras: BTreeMap<String, ComputedColumn>,
}

impl Default for PlanNode {
    fn default() -> Self {
        Self {
            table: None,
            columns: ColumnSelection::all(),
            with: BTreeMap::new(),
            order_by: Vec::new(),
            limit: None,
            filter: None,
            extras: BTreeMap::new(),
        }
    }
}

impl PlanNode {
    /// Create a node fetching every column of an unnamed relation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node for a physical table.
    pub fn for_table(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            ..Self::default()
        }
    }

    /// Set the column selection.
    pub fn with_columns(mut self, columns: ColumnSelection) -> Self {
        self.columns = columns;
        self
    }

    /// Add an ordering term.
    pub fn ordered_by(mut self, term: OrderTerm) -> Self {
        self.order_by.push(term);
        self
    }

    /// Get a nested plan by key.
    pub fn child(&self, key: &str) -> Option<&PlanNode> {
        self.with.get(key).and_then(Nesting::as_plan)
    }

    /// Check if a nesting (of any kind) exists under a key.
    pub fn has_child(&self, key: &str) -> bool {
        self.with.contains_key(key)
    }

    /// Get the locale overlay, if any.
    pub fn locales(&self) -> Option<&PlanNode> {
        self.child(LOCALES_KEY)
    }

    /// Check whether this node would fetch nothing but the locale
    /// discriminator.
    pub fn is_degenerate_locale(&self) -> bool {
        self.columns.explicit_len() == Some(1) && self.with.is_empty() && self.extras.is_empty()
    }

    /// Keys of all nestings, in order.
    pub fn child_keys(&self) -> Vec<&str> {
        self.with.keys().map(String::as_str).collect()
    }

    /// Stable digest of the whole tree, hex encoded.
    pub fn fingerprint(&self) -> Result<String, Error> {
        let bytes = serde_json::to_vec(self).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
    }

    /// Render the tree as pretty JSON for debugging output.
    pub fn to_json_pretty(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_selection_insert() {
        let mut only = ColumnSelection::only(["id"]);
        assert!(only.insert("title"));
        assert!(!only.insert("title"));
        assert!(only.selects("title"));
        assert!(!only.selects("body"));
        assert_eq!(only.explicit_len(), Some(2));

        let mut all = ColumnSelection::all_except(["_parentID"]);
        assert!(!all.insert("title"));
        assert!(all.selects("title"));
        assert!(!all.selects("_parentID"));
        assert_eq!(all.explicit_len(), None);
    }

    #[test]
    fn test_degenerate_locale() {
        let locale = PlanNode::new().with_columns(ColumnSelection::only(["_locale"]));
        assert!(locale.is_degenerate_locale());

        let populated = PlanNode::new().with_columns(ColumnSelection::only(["_locale", "title"]));
        assert!(!populated.is_degenerate_locale());

        let wildcard = PlanNode::new().with_columns(ColumnSelection::all_except(["id"]));
        assert!(!wildcard.is_degenerate_locale());

        let mut with_child = locale.clone();
        with_child.with.insert("author".into(), Nesting::ById);
        assert!(!with_child.is_degenerate_locale());
    }

    #[test]
    fn test_child_lookup() {
        let mut node = PlanNode::for_table("pages");
        node.with.insert("author".into(), Nesting::ById);
        node.with.insert(
            "items".into(),
            Nesting::Plan(PlanNode::for_table("pages_items").ordered_by(OrderTerm::asc("_order"))),
        );

        assert!(node.has_child("author"));
        assert!(node.child("author").is_none());
        assert_eq!(
            node.child("items").and_then(|c| c.table.as_deref()),
            Some("pages_items")
        );
        assert_eq!(node.child_keys(), vec!["author", "items"]);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let build = || {
            let mut node = PlanNode::for_table("pages")
                .with_columns(ColumnSelection::only(["id", "title"]));
            node.with.insert("_rels".into(), Nesting::Plan(PlanNode::new()));
            node
        };

        let a = build().fingerprint().unwrap();
        let b = build().fingerprint().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let other = PlanNode::for_table("posts").fingerprint().unwrap();
        assert_ne!(a, other);
    }
}
