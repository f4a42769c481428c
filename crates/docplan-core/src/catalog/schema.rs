//! Schema bundle - the set of collections and reusable blocks a plan is
//! compiled against.

use super::field::FieldDef;
use super::types::{BlockDef, BlockRef};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A top-level collection: a named, row-addressable document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDef {
    /// Collection slug (unique within the schema).
    pub slug: String,
    /// Field definitions.
    pub fields: Vec<FieldDef>,
}

impl CollectionDef {
    /// Create an empty collection.
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field to the collection.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add several fields to the collection.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Get a top-level field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Collections plus the registry of reusable blocks referenced by slug.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaBundle {
    /// Collection definitions keyed by slug.
    #[serde(default)]
    pub collections: HashMap<String, CollectionDef>,
    /// Reusable block definitions keyed by slug.
    #[serde(default)]
    pub blocks: HashMap<String, BlockDef>,
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a schema bundle from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Add a collection to the schema.
    pub fn with_collection(mut self, collection: CollectionDef) -> Self {
        self.collections.insert(collection.slug.clone(), collection);
        self
    }

    /// Add a reusable block to the schema.
    pub fn with_block(mut self, block: BlockDef) -> Self {
        self.blocks.insert(block.slug.clone(), block);
        self
    }

    /// Get a collection by slug.
    pub fn get_collection(&self, slug: &str) -> Option<&CollectionDef> {
        self.collections.get(slug)
    }

    /// Get a reusable block by slug.
    pub fn get_block(&self, slug: &str) -> Option<&BlockDef> {
        self.blocks.get(slug)
    }

    /// Resolve a block reference to its definition.
    pub fn resolve_block<'a>(&'a self, block: &'a BlockRef) -> Result<&'a BlockDef, Error> {
        match block {
            BlockRef::Inline(def) => Ok(def),
            BlockRef::Slug(slug) => self
                .get_block(slug)
                .ok_or_else(|| Error::UnknownBlock(slug.clone())),
        }
    }

    /// List all collection slugs.
    pub fn collection_slugs(&self) -> Vec<&str> {
        self.collections.keys().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> SchemaBundle {
        let posts = CollectionDef::new("posts")
            .with_field(FieldDef::text("title"))
            .with_field(FieldDef::relationship("author", "users"));
        let users = CollectionDef::new("users").with_field(FieldDef::text("name"));

        SchemaBundle::new()
            .with_collection(posts)
            .with_collection(users)
            .with_block(BlockDef::new("hero", vec![FieldDef::text("heading")]))
    }

    #[test]
    fn test_schema_lookup() {
        let schema = sample_schema();

        let posts = schema.get_collection("posts").unwrap();
        assert!(posts.get_field("title").is_some());
        assert!(posts.get_field("missing").is_none());
        assert!(schema.get_collection("comments").is_none());

        let mut slugs = schema.collection_slugs();
        slugs.sort();
        assert_eq!(slugs, vec!["posts", "users"]);
    }

    #[test]
    fn test_resolve_block() {
        let schema = sample_schema();

        let hero_ref = BlockRef::Slug("hero".into());
        let hero = schema.resolve_block(&hero_ref).unwrap();
        assert_eq!(hero.fields.len(), 1);

        let inline = BlockRef::Inline(BlockDef::new("quote", vec![]));
        assert_eq!(schema.resolve_block(&inline).unwrap().slug, "quote");

        let err = schema
            .resolve_block(&BlockRef::Slug("missing".into()))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownBlock(slug) if slug == "missing"));
    }

    #[test]
    fn test_schema_from_json() {
        let schema = SchemaBundle::from_json(
            r#"{
                "collections": {
                    "pages": {"slug": "pages", "fields": [{"type": "text", "name": "title"}]}
                },
                "blocks": {
                    "hero": {"slug": "hero", "fields": []}
                }
            }"#,
        )
        .unwrap();

        assert!(schema.get_collection("pages").is_some());
        assert!(schema.get_block("hero").is_some());
        assert!(SchemaBundle::from_json("{\"collections\": 3}").is_err());
    }
}
