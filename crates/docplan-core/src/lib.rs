//! docplan Core - schema catalog, projection masks and fetch plan compilation.
//!
//! This crate compiles a recursive document schema plus per-call options
//! (projection mask, locale, join arguments) into a nested relational fetch
//! plan.
//!
//! ```
//! use docplan_core::catalog::{CollectionDef, FieldDef, SchemaBundle, TableCatalog, TableDef};
//! use docplan_core::query::{CompiledPredicate, FindArgs, FindManyPlanner, JoinContext, PredicateCompiler};
//! use docplan_core::select::SelectMask;
//! use docplan_core::Error;
//! use docplan_proto::{FilterExpr, OrderSpec};
//!
//! struct NoPredicates;
//!
//! impl PredicateCompiler for NoPredicates {
//!     fn compile(
//!         &self,
//!         _filter: Option<&FilterExpr>,
//!         _sort: &[OrderSpec],
//!         _table: &str,
//!         _ctx: &JoinContext<'_>,
//!     ) -> Result<CompiledPredicate, Error> {
//!         Ok(CompiledPredicate::default())
//!     }
//! }
//!
//! let schema = SchemaBundle::new().with_collection(
//!     CollectionDef::new("pages").with_field(FieldDef::text("title")),
//! );
//! let catalog = TableCatalog::new()
//!     .with_table(TableDef::new("pages").with_columns(["id", "title"]));
//!
//! let planner = FindManyPlanner::new(&schema, &catalog, &NoPredicates);
//! let args = FindArgs::new().with_select(SelectMask::new().include("title"));
//! let plan = planner.plan("pages", &args).unwrap();
//!
//! assert!(plan.columns.selects("title"));
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod query;
pub mod select;

pub use catalog::{
    BlockDef, BlockRef, CollectionDef, FieldDef, FieldKind, JoinDef, MetadataProvider,
    RelationTarget, SchemaBundle, TabDef, TableCatalog, TableDef,
};
pub use config::CompilerConfig;
pub use error::Error;
pub use query::{FindArgs, FindManyPlanner, PlanNode, PredicateCompiler};
pub use select::{SelectMask, SelectMode};

/// Re-export protocol types.
pub use docplan_proto as proto;
