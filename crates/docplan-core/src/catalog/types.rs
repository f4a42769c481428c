//! Supporting definitions referenced by field descriptors.

use super::field::FieldDef;
use docplan_proto::OrderSpec;
use serde::{Deserialize, Serialize};

/// Target collection(s) of a relationship or upload field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationTarget {
    /// A single target collection.
    One(String),
    /// Several possible target collections (polymorphic).
    Many(Vec<String>),
}

impl RelationTarget {
    /// Check if the relationship can point at more than one collection.
    pub fn is_polymorphic(&self) -> bool {
        matches!(self, RelationTarget::Many(_))
    }

    /// Get the single target collection, if there is exactly one.
    pub fn single(&self) -> Option<&str> {
        match self {
            RelationTarget::One(collection) => Some(collection),
            RelationTarget::Many(_) => None,
        }
    }
}

/// A block shape: one member of a blocks field union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDef {
    /// Identifies the shape; also names its table.
    pub slug: String,
    /// Fields of the block.
    pub fields: Vec<FieldDef>,
}

impl BlockDef {
    /// Create a block definition.
    pub fn new(slug: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            slug: slug.into(),
            fields,
        }
    }
}

/// A block either defined in place or referenced from the schema's
/// reusable block registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockRef {
    /// Reference by slug.
    Slug(String),
    /// Inline definition.
    Inline(BlockDef),
}

impl BlockRef {
    /// Get the slug of the referenced block.
    pub fn slug(&self) -> &str {
        match self {
            BlockRef::Slug(slug) => slug,
            BlockRef::Inline(block) => &block.slug,
        }
    }
}

impl From<BlockDef> for BlockRef {
    fn from(block: BlockDef) -> Self {
        BlockRef::Inline(block)
    }
}

/// A tab within a tab set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabDef {
    /// Named tabs scope their fields like a group.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the tab's values are stored per locale.
    #[serde(default)]
    pub localized: bool,
    /// Fields of the tab.
    pub fields: Vec<FieldDef>,
}

impl TabDef {
    /// Create a named tab.
    pub fn named(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: Some(name.into()),
            localized: false,
            fields,
        }
    }

    /// Create an unnamed (presentational) tab.
    pub fn unnamed(fields: Vec<FieldDef>) -> Self {
        Self {
            name: None,
            localized: false,
            fields,
        }
    }
}

/// Definition of a join field: the inverse side of a relationship declared
/// on another collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDef {
    /// Collection holding the relationship.
    pub collection: String,
    /// Path of the relationship field in that collection.
    pub on: String,
    /// The relationship on the other side is many-valued (stored in `_rels`).
    #[serde(default)]
    pub has_many: bool,
    /// The relationship on the other side targets several collections.
    #[serde(default)]
    pub polymorphic: bool,
    /// The relationship on the other side is localized.
    #[serde(default)]
    pub localized: bool,
    /// Page size used when the caller does not pass one.
    #[serde(default)]
    pub default_limit: Option<u32>,
    /// Ordering used when the caller does not pass one.
    #[serde(default)]
    pub default_sort: Vec<OrderSpec>,
}

impl JoinDef {
    /// Create a join over `collection` by its relationship field `on`.
    pub fn new(collection: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            on: on.into(),
            has_many: false,
            polymorphic: false,
            localized: false,
            default_limit: None,
            default_sort: Vec::new(),
        }
    }

    /// The inverse relationship is many-valued.
    pub fn has_many(mut self) -> Self {
        self.has_many = true;
        self
    }

    /// The inverse relationship is polymorphic.
    pub fn polymorphic(mut self) -> Self {
        self.polymorphic = true;
        self
    }

    /// The inverse relationship is localized.
    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    /// Set the default page size.
    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = Some(limit);
        self
    }

    /// Add a default ordering term.
    pub fn with_default_sort(mut self, order: OrderSpec) -> Self {
        self.default_sort.push(order);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_target() {
        let one = RelationTarget::One("users".into());
        assert!(!one.is_polymorphic());
        assert_eq!(one.single(), Some("users"));

        let many = RelationTarget::Many(vec!["users".into(), "editors".into()]);
        assert!(many.is_polymorphic());
        assert_eq!(many.single(), None);
    }

    #[test]
    fn test_block_ref_slug() {
        assert_eq!(BlockRef::Slug("hero".into()).slug(), "hero");
        assert_eq!(BlockRef::from(BlockDef::new("cta", vec![])).slug(), "cta");
    }

    #[test]
    fn test_join_def_builder() {
        let join = JoinDef::new("posts", "categories")
            .has_many()
            .with_default_limit(25)
            .with_default_sort(OrderSpec::desc("createdAt"));

        assert!(join.has_many);
        assert!(!join.polymorphic);
        assert_eq!(join.default_limit, Some(25));
        assert_eq!(join.default_sort.len(), 1);
    }
}
