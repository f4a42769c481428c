//! Field descriptors for collections and blocks.

use super::types::{BlockRef, JoinDef, RelationTarget, TabDef};
use serde::{Deserialize, Serialize};

/// A field definition within a collection, block, array or group.
///
/// Field definitions deserialize from the familiar document-schema shape,
/// e.g. `{"type": "group", "name": "meta", "fields": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name. Layout-only kinds (row, collapsible) use an empty name.
    #[serde(default)]
    pub name: String,
    /// Whether values are stored per locale.
    #[serde(default)]
    pub localized: bool,
    /// Computed after fetch rather than stored.
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
    /// Field kind and kind-specific attributes.
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// The closed set of field kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FieldKind {
    /// Single-line text; many-valued text lives in the `_texts` side table.
    Text {
        #[serde(default)]
        has_many: bool,
    },
    /// Multi-line text.
    Textarea,
    /// Email address.
    Email,
    /// Source code.
    Code,
    /// Arbitrary JSON document.
    Json,
    /// Rich text document.
    RichText,
    /// Date / timestamp.
    Date,
    /// Geographic point.
    Point,
    /// Boolean.
    Checkbox,
    /// Radio group (single enumerated value).
    Radio,
    /// Number; many-valued numbers live in the `_numbers` side table.
    Number {
        #[serde(default)]
        has_many: bool,
    },
    /// Enumerated value; many-valued selects get their own side table.
    Select {
        #[serde(default)]
        options: Vec<String>,
        #[serde(default)]
        has_many: bool,
    },
    /// Reference to documents of another collection.
    Relationship {
        relation_to: RelationTarget,
        #[serde(default)]
        has_many: bool,
    },
    /// Reference to an upload-enabled collection.
    Upload {
        relation_to: RelationTarget,
        #[serde(default)]
        has_many: bool,
    },
    /// Named nesting stored in the parent row with a column prefix.
    Group { fields: Vec<FieldDef> },
    /// Ordered list of rows stored in a child table.
    Array { fields: Vec<FieldDef> },
    /// Ordered list of polymorphic rows, one table per block slug.
    Blocks { blocks: Vec<BlockRef> },
    /// Tab set; named tabs scope like groups, unnamed tabs are transparent.
    Tabs { tabs: Vec<TabDef> },
    /// Layout-only wrapper.
    Collapsible { fields: Vec<FieldDef> },
    /// Layout-only wrapper.
    Row { fields: Vec<FieldDef> },
    /// Inverse relation resolved at read time.
    Join(JoinDef),
    /// Not stored and not fetched.
    Virtual,
}

impl FieldDef {
    /// Create a field of the given kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            localized: false,
            is_virtual: false,
            kind,
        }
    }

    /// Create a single-valued text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text { has_many: false })
    }

    /// Create a single-valued number field.
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number { has_many: false })
    }

    /// Create a single-valued select field.
    pub fn select(name: impl Into<String>, options: Vec<String>) -> Self {
        Self::new(
            name,
            FieldKind::Select {
                options,
                has_many: false,
            },
        )
    }

    /// Create a single-valued relationship to one collection.
    pub fn relationship(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Relationship {
                relation_to: RelationTarget::One(collection.into()),
                has_many: false,
            },
        )
    }

    /// Create a relationship that may point at several collections.
    pub fn polymorphic_relationship(name: impl Into<String>, collections: Vec<String>) -> Self {
        Self::new(
            name,
            FieldKind::Relationship {
                relation_to: RelationTarget::Many(collections),
                has_many: false,
            },
        )
    }

    /// Create a single-valued upload field.
    pub fn upload(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Upload {
                relation_to: RelationTarget::One(collection.into()),
                has_many: false,
            },
        )
    }

    /// Create a group field.
    pub fn group(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self::new(name, FieldKind::Group { fields })
    }

    /// Create an array field.
    pub fn array(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self::new(name, FieldKind::Array { fields })
    }

    /// Create a blocks field.
    pub fn blocks(name: impl Into<String>, blocks: Vec<BlockRef>) -> Self {
        Self::new(name, FieldKind::Blocks { blocks })
    }

    /// Create a tab set.
    pub fn tabs(tabs: Vec<TabDef>) -> Self {
        Self::new("", FieldKind::Tabs { tabs })
    }

    /// Create a collapsible wrapper.
    pub fn collapsible(fields: Vec<FieldDef>) -> Self {
        Self::new("", FieldKind::Collapsible { fields })
    }

    /// Create a row wrapper.
    pub fn row(fields: Vec<FieldDef>) -> Self {
        Self::new("", FieldKind::Row { fields })
    }

    /// Create a join field.
    pub fn join(name: impl Into<String>, join: JoinDef) -> Self {
        Self::new(name, FieldKind::Join(join))
    }

    /// Create a virtual field.
    pub fn virtual_field(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Virtual)
    }

    /// Mark the field as localized.
    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    /// Mark the field as virtual (computed after fetch).
    pub fn with_virtual(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// Mark the field as many-valued. Kinds without a many-valued form are
    /// left unchanged.
    pub fn has_many(mut self) -> Self {
        match &mut self.kind {
            FieldKind::Text { has_many }
            | FieldKind::Number { has_many }
            | FieldKind::Select { has_many, .. }
            | FieldKind::Relationship { has_many, .. }
            | FieldKind::Upload { has_many, .. } => *has_many = true,
            _ => {}
        }
        self
    }

    /// Check if the field contributes nothing to a fetch.
    pub fn is_virtual(&self) -> bool {
        self.is_virtual || matches!(self.kind, FieldKind::Virtual)
    }

    /// Check if the field is a many-valued kind.
    pub fn is_has_many(&self) -> bool {
        match &self.kind {
            FieldKind::Text { has_many }
            | FieldKind::Number { has_many }
            | FieldKind::Select { has_many, .. }
            | FieldKind::Relationship { has_many, .. }
            | FieldKind::Upload { has_many, .. } => *has_many,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BlockDef;

    #[test]
    fn test_field_def_builder() {
        let field = FieldDef::text("tags").has_many().localized();

        assert_eq!(field.name, "tags");
        assert!(field.localized);
        assert!(field.is_has_many());
        assert!(!field.is_virtual());
    }

    #[test]
    fn test_has_many_ignored_for_composites() {
        let field = FieldDef::group("meta", vec![]).has_many();
        assert!(!field.is_has_many());
    }

    #[test]
    fn test_virtual_fields() {
        assert!(FieldDef::virtual_field("fullName").is_virtual());
        assert!(FieldDef::relationship("author", "users").with_virtual().is_virtual());
    }

    #[test]
    fn test_fields_from_json() {
        let fields: Vec<FieldDef> = serde_json::from_str(
            r#"[
                {"type": "text", "name": "title", "localized": true},
                {"type": "array", "name": "items", "fields": [{"type": "text", "name": "label"}]},
                {"type": "relationship", "name": "authors", "relationTo": ["users", "editors"], "hasMany": true},
                {"type": "blocks", "name": "layout", "blocks": ["hero", {"slug": "cta", "fields": []}]},
                {"type": "tabs", "tabs": [{"label": "Content", "fields": []}, {"name": "seo", "fields": []}]},
                {"type": "join", "name": "posts", "collection": "posts", "on": "category"}
            ]"#,
        )
        .unwrap();

        assert_eq!(fields.len(), 6);
        assert!(fields[0].localized);
        match &fields[1].kind {
            FieldKind::Array { fields } => assert_eq!(fields[0].name, "label"),
            other => panic!("Expected Array, got {:?}", other),
        }
        assert!(fields[2].is_has_many());
        match &fields[3].kind {
            FieldKind::Blocks { blocks } => {
                assert_eq!(blocks[0], BlockRef::Slug("hero".into()));
                assert_eq!(blocks[1], BlockRef::Inline(BlockDef::new("cta", vec![])));
            }
            other => panic!("Expected Blocks, got {:?}", other),
        }
        match &fields[4].kind {
            FieldKind::Tabs { tabs } => {
                assert!(tabs[0].name.is_none());
                assert_eq!(tabs[1].name.as_deref(), Some("seo"));
            }
            other => panic!("Expected Tabs, got {:?}", other),
        }
        match &fields[5].kind {
            FieldKind::Join(join) => {
                assert_eq!(join.collection, "posts");
                assert!(!join.has_many);
            }
            other => panic!("Expected Join, got {:?}", other),
        }
    }
}
