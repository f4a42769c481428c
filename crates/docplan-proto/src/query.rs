//! Query IR types: filters, ordering and runtime join arguments.

use std::collections::BTreeMap;

use crate::error::Error;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Filter expression evaluated against the rows of a table.
///
/// The expression is only a description; turning it into an executable
/// condition is the job of a predicate compiler on the consuming side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterExpr {
    /// Field equals value.
    Eq { field: String, value: Value },
    /// Field not equals value.
    Ne { field: String, value: Value },
    /// Field less than value.
    Lt { field: String, value: Value },
    /// Field less than or equal to value.
    Le { field: String, value: Value },
    /// Field greater than value.
    Gt { field: String, value: Value },
    /// Field greater than or equal to value.
    Ge { field: String, value: Value },
    /// Field is in a set of values.
    In { field: String, values: Vec<Value> },
    /// Field is not in a set of values.
    NotIn { field: String, values: Vec<Value> },
    /// Field is null.
    IsNull { field: String },
    /// Field is not null.
    IsNotNull { field: String },
    /// Field matches a LIKE pattern.
    Like { field: String, pattern: String },
    /// Field does not match a LIKE pattern.
    NotLike { field: String, pattern: String },
    /// Field equals a column of the enclosing (outer) row.
    ///
    /// Used to correlate a subquery with the row currently being fetched.
    EqColumn { field: String, column: String },
    /// All conditions must be true.
    And(Vec<FilterExpr>),
    /// At least one condition must be true.
    Or(Vec<FilterExpr>),
}

impl FilterExpr {
    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a not-equal filter.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-than filter.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than filter.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an IN filter.
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        FilterExpr::In {
            field: field.into(),
            values,
        }
    }

    /// Create an IS NULL filter.
    pub fn is_null(field: impl Into<String>) -> Self {
        FilterExpr::IsNull {
            field: field.into(),
        }
    }

    /// Create a LIKE filter.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        FilterExpr::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Create a correlation filter against a column of the outer row.
    pub fn eq_column(field: impl Into<String>, column: impl Into<String>) -> Self {
        FilterExpr::EqColumn {
            field: field.into(),
            column: column.into(),
        }
    }

    /// Create an AND filter.
    pub fn and(exprs: Vec<FilterExpr>) -> Self {
        FilterExpr::And(exprs)
    }

    /// Create an OR filter.
    pub fn or(exprs: Vec<FilterExpr>) -> Self {
        FilterExpr::Or(exprs)
    }

    /// Combine two expressions with AND, flattening nested conjunctions.
    pub fn and_also(self, other: FilterExpr) -> Self {
        match (self, other) {
            (FilterExpr::And(mut left), FilterExpr::And(right)) => {
                left.extend(right);
                FilterExpr::And(left)
            }
            (FilterExpr::And(mut left), other) => {
                left.push(other);
                FilterExpr::And(left)
            }
            (this, FilterExpr::And(mut right)) => {
                right.insert(0, this);
                FilterExpr::And(right)
            }
            (this, other) => FilterExpr::And(vec![this, other]),
        }
    }

    /// Check whether the expression constrains nothing (an empty AND).
    pub fn is_empty(&self) -> bool {
        matches!(self, FilterExpr::And(exprs) if exprs.is_empty())
    }
}

/// Order specification for sorting results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Field to order by.
    pub field: String,
    /// Sort direction.
    #[serde(default)]
    pub direction: OrderDirection,
}

impl OrderSpec {
    /// Create an ascending order spec.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Create a descending order spec.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// Runtime arguments for a single join field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinArgs {
    /// Requested page size. `Some(0)` means unlimited.
    #[serde(default)]
    pub limit: Option<u32>,
    /// Ordering of the joined documents.
    #[serde(default)]
    pub sort: Vec<OrderSpec>,
    /// Additional filter on the joined documents.
    #[serde(default, rename = "where")]
    pub filter: Option<FilterExpr>,
}

impl JoinArgs {
    /// Create empty join arguments (field defaults apply).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the requested limit.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Add an ordering term.
    pub fn with_sort(mut self, order: OrderSpec) -> Self {
        self.sort.push(order);
        self
    }

    /// Set the filter.
    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Per-path join configuration: either explicit arguments or `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JoinPathArgs {
    /// `false` disables this join path; `true` is accepted as "use defaults".
    Toggle(bool),
    /// Explicit arguments.
    Args(JoinArgs),
}

impl JoinPathArgs {
    /// Check if this path is explicitly disabled.
    pub fn is_disabled(&self) -> bool {
        matches!(self, JoinPathArgs::Toggle(false))
    }

    /// Get the explicit arguments, if any.
    pub fn args(&self) -> Option<&JoinArgs> {
        match self {
            JoinPathArgs::Args(args) => Some(args),
            JoinPathArgs::Toggle(_) => None,
        }
    }
}

/// Runtime join arguments for one fetch, keyed by dotted schema path
/// (e.g. `"relatedPosts"`, `"meta.relatedPosts"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JoinQuery {
    /// `false` disables join resolution for the whole fetch.
    Toggle(bool),
    /// Arguments by dotted path.
    Paths(BTreeMap<String, JoinPathArgs>),
}

impl Default for JoinQuery {
    fn default() -> Self {
        JoinQuery::Paths(BTreeMap::new())
    }
}

impl JoinQuery {
    /// Create an empty join query (all joins resolved with defaults).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a join query that disables every join field.
    pub fn disabled() -> Self {
        JoinQuery::Toggle(false)
    }

    /// Parse a join query from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Check if join resolution is disabled globally.
    pub fn is_disabled(&self) -> bool {
        matches!(self, JoinQuery::Toggle(false))
    }

    /// Set explicit arguments for a path.
    pub fn with_args(self, path: impl Into<String>, args: JoinArgs) -> Self {
        self.with_path(path, JoinPathArgs::Args(args))
    }

    /// Disable a single path.
    pub fn disable_path(self, path: impl Into<String>) -> Self {
        self.with_path(path, JoinPathArgs::Toggle(false))
    }

    fn with_path(self, path: impl Into<String>, value: JoinPathArgs) -> Self {
        let mut paths = match self {
            JoinQuery::Paths(paths) => paths,
            JoinQuery::Toggle(_) => BTreeMap::new(),
        };
        paths.insert(path.into(), value);
        JoinQuery::Paths(paths)
    }

    /// Look up the configuration for a dotted path.
    pub fn get(&self, path: &str) -> Option<&JoinPathArgs> {
        match self {
            JoinQuery::Paths(paths) => paths.get(path),
            JoinQuery::Toggle(_) => None,
        }
    }
}
