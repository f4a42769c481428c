//! Join-field support: predicate compilation seam, correlated subqueries and
//! dialect-specific JSON aggregation.

use std::fmt;

use docplan_proto::{FilterExpr, OrderDirection, OrderSpec};
use serde::{Deserialize, Serialize};

use super::node::OrderTerm;
use crate::error::Error;

/// An opaque SQL fragment (condition or expression) produced elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SqlFragment(String);

impl SqlFragment {
    /// Wrap raw SQL text.
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// Get the SQL text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// JSON aggregation syntax family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `json_agg(json_build_object(..))`.
    #[default]
    Postgres,
    /// `json_group_array(json_object(..))`.
    Sqlite,
}

impl Dialect {
    /// Build an expression aggregating the rows of `source` into a JSON array
    /// of objects with the given keys, falling back to an empty array when
    /// there are no rows.
    pub fn json_array_of_objects(&self, source: &str, keys: &[&str]) -> SqlFragment {
        let pairs = keys
            .iter()
            .map(|key| format!("'{key}', \"{source}\".\"{key}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = match self {
            Dialect::Postgres => {
                format!("coalesce(json_agg(json_build_object({pairs})), '[]'::json)")
            }
            Dialect::Sqlite => {
                format!("coalesce(json_group_array(json_object({pairs})), '[]')")
            }
        };
        SqlFragment(sql)
    }
}

/// Context handed to the predicate compiler for a join field.
#[derive(Debug, Clone, Copy)]
pub struct JoinContext<'a> {
    /// Collection owning the join field.
    pub collection: &'a str,
    /// Table of the row being fetched (the correlation source).
    pub parent_table: &'a str,
    /// Collection on the other side of the join.
    pub target_collection: &'a str,
    /// Base table of the target collection.
    pub target_table: &'a str,
    /// Alias the compiled subquery will be known by.
    pub alias: &'a str,
    /// Locale requested for the fetch.
    pub locale: Option<&'a str>,
}

/// Output of the predicate compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledPredicate {
    /// Boolean condition; `None` means unconstrained.
    pub condition: Option<SqlFragment>,
    /// Ordering columns.
    pub order_by: Vec<OrderTerm>,
}

/// Compiles filter expressions and sort specifications into executable
/// conditions for a named table.
pub trait PredicateCompiler {
    /// Compile `filter` and `sort` against `table`.
    fn compile(
        &self,
        filter: Option<&FilterExpr>,
        sort: &[OrderSpec],
        table: &str,
        ctx: &JoinContext<'_>,
    ) -> Result<CompiledPredicate, Error>;
}

/// A correlated subquery selecting the joined document ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinSubquery {
    /// Table the subquery reads from.
    pub table: String,
    /// Output alias to source column.
    pub select: Vec<(String, String)>,
    /// Compiled correlation + user filter.
    pub condition: Option<SqlFragment>,
    /// Compiled ordering.
    pub order_by: Vec<OrderTerm>,
    /// Row limit (already including the look-ahead row).
    pub limit: Option<u32>,
}

impl JoinSubquery {
    /// Render the subquery.
    pub fn to_sql(&self) -> String {
        let columns = self
            .select
            .iter()
            .map(|(alias, column)| format!("\"{}\".\"{}\" as \"{}\"", self.table, column, alias))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("select {} from \"{}\"", columns, self.table);
        if let Some(condition) = &self.condition {
            sql.push_str(" where ");
            sql.push_str(condition.as_str());
        }
        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|term| {
                    let direction = match term.direction {
                        OrderDirection::Asc => "asc",
                        OrderDirection::Desc => "desc",
                    };
                    format!("\"{}\" {}", term.column, direction)
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" order by ");
            sql.push_str(&order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" limit {limit}"));
        }
        sql
    }
}

/// A computed column: a JSON array aggregated from a correlated subquery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputedColumn {
    /// Alias of the subquery.
    pub alias: String,
    /// Rows being aggregated.
    pub subquery: JoinSubquery,
    /// Aggregate expression over the subquery alias.
    pub aggregate: SqlFragment,
}

impl ComputedColumn {
    /// Build the aggregated column for a join subquery.
    pub fn json_array(alias: impl Into<String>, subquery: JoinSubquery, dialect: Dialect) -> Self {
        let alias = alias.into();
        let keys: Vec<&str> = subquery.select.iter().map(|(key, _)| key.as_str()).collect();
        let aggregate = dialect.json_array_of_objects(&alias, &keys);
        Self {
            alias,
            subquery,
            aggregate,
        }
    }

    /// Render the full scalar subquery expression.
    pub fn to_sql(&self) -> String {
        format!(
            "(select {} from ({}) as \"{}\")",
            self.aggregate,
            self.subquery.to_sql(),
            self.alias
        )
    }
}

/// Effective subquery limit for a requested page size: one extra row lets
/// the caller detect a next page; `0` means unlimited.
pub fn look_ahead_limit(requested: u32) -> Option<u32> {
    match requested {
        0 => None,
        n => Some(n.saturating_add(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subquery() -> JoinSubquery {
        JoinSubquery {
            table: "posts_rels".into(),
            select: vec![("id".into(), "parent".into())],
            condition: Some(SqlFragment::new("\"categoriesID\" = \"categories\".\"id\"")),
            order_by: vec![OrderTerm::desc("createdAt")],
            limit: look_ahead_limit(10),
        }
    }

    #[test]
    fn test_look_ahead_limit() {
        assert_eq!(look_ahead_limit(0), None);
        assert_eq!(look_ahead_limit(1), Some(2));
        assert_eq!(look_ahead_limit(10), Some(11));
        assert_eq!(look_ahead_limit(u32::MAX), Some(u32::MAX));
    }

    #[test]
    fn test_postgres_aggregate() {
        let sql = Dialect::Postgres.json_array_of_objects("posts_alias", &["id", "locale"]);
        assert_eq!(
            sql.as_str(),
            "coalesce(json_agg(json_build_object('id', \"posts_alias\".\"id\", 'locale', \"posts_alias\".\"locale\")), '[]'::json)"
        );
    }

    #[test]
    fn test_sqlite_aggregate() {
        let sql = Dialect::Sqlite.json_array_of_objects("posts_alias", &["id"]);
        assert_eq!(
            sql.as_str(),
            "coalesce(json_group_array(json_object('id', \"posts_alias\".\"id\")), '[]')"
        );
    }

    #[test]
    fn test_subquery_sql() {
        assert_eq!(
            subquery().to_sql(),
            "select \"posts_rels\".\"parent\" as \"id\" from \"posts_rels\" where \"categoriesID\" = \"categories\".\"id\" order by \"createdAt\" desc limit 11"
        );
    }

    #[test]
    fn test_computed_column_sql() {
        let column = ComputedColumn::json_array("posts_alias", subquery(), Dialect::Sqlite);
        let sql = column.to_sql();
        assert!(sql.starts_with("(select coalesce(json_group_array(json_object('id', \"posts_alias\".\"id\")), '[]') from (select"));
        assert!(sql.ends_with(") as \"posts_alias\")"));
    }
}
