//! Schema catalog for docplan.
//!
//! The catalog holds the document schema (collections, fields, reusable
//! blocks) and the physical table metadata that plans are resolved against.

mod catalog;
mod field;
mod schema;
mod types;

pub use catalog::{MetadataProvider, TableCatalog, TableDef};
pub use field::{FieldDef, FieldKind};
pub use schema::{CollectionDef, SchemaBundle};
pub use types::{BlockDef, BlockRef, JoinDef, RelationTarget, TabDef};
