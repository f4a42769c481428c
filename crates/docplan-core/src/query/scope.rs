//! Name scoping during the field walk.
//!
//! Every nesting level contributes one segment to three prefixes at once:
//! the column key prefix (`meta_`), the dotted schema path (`meta.`) used to
//! look up join arguments, and the snake-cased table path (`my_meta_`) used
//! to resolve nested array tables. They only change together.

use convert_case::{Case, Casing};

/// Snake-case a field name or slug for use in a table path.
pub fn to_snake_case(name: &str) -> String {
    name.to_case(Case::Snake)
}

/// Accumulated prefixes for the current nesting level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    path: String,
    dotted: String,
    table_path: String,
}

impl Scope {
    /// Scope of a row-addressable table (no prefix).
    pub fn root() -> Self {
        Self::default()
    }

    /// Scope for the fields of a named group or tab.
    pub fn child(&self, name: &str) -> Self {
        Self {
            path: format!("{}{}_", self.path, name),
            dotted: format!("{}{}.", self.dotted, name),
            table_path: format!("{}{}_", self.table_path, to_snake_case(name)),
        }
    }

    /// Column / relation key of a field on this level.
    pub fn key(&self, name: &str) -> String {
        format!("{}{}", self.path, name)
    }

    /// Dotted schema path of a field on this level.
    pub fn dotted(&self, name: &str) -> String {
        format!("{}{}", self.dotted, name)
    }

    /// Table path segment of a field on this level.
    pub fn table_key(&self, name: &str) -> String {
        format!("{}{}", self.table_path, to_snake_case(name))
    }

    /// Check if this is a root scope.
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }
}
