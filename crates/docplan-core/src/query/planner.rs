//! Top-level planner for find-many fetches.
//!
//! The planner resolves the collection's table, seeds the root nestings for
//! side tables and the locale overlay, runs the [`Compiler`] over the
//! collection's fields and attaches every compiled block shape at the root.

use docplan_proto::JoinQuery;
use tracing::{debug, instrument};

use super::compiler::{attach_locales, Compiler, Frame};
use super::join::PredicateCompiler;
use super::node::{ColumnSelection, Nesting, OrderTerm, PlanNode};
use super::scope::{to_snake_case, Scope};
use crate::catalog::{MetadataProvider, SchemaBundle};
use crate::config::CompilerConfig;
use crate::error::Error;
use crate::select::{Projection, SelectMask, SelectMode};

/// Root nesting key of many-valued text values.
pub const TEXTS_KEY: &str = "_texts";
/// Root nesting key of many-valued number values.
pub const NUMBERS_KEY: &str = "_numbers";
/// Root nesting key of relationship rows.
pub const RELS_KEY: &str = "_rels";
/// Prefix of root nesting keys for block shapes.
pub const BLOCKS_PREFIX: &str = "_blocks_";

/// Per-call options of a find-many fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindArgs {
    /// Relationship population depth; `0` disables by-id nestings.
    pub depth: u32,
    /// Projection mask. `None` fetches everything.
    pub select: Option<SelectMask>,
    /// Mask mode. Inferred from the mask when not set.
    pub select_mode: Option<SelectMode>,
    /// Requested locale (`"all"` for every locale).
    pub locale: Option<String>,
    /// Join field arguments.
    pub joins: JoinQuery,
    /// Fetch from a versions table: join correlations use `parent`.
    pub versions: bool,
}

impl FindArgs {
    /// Create arguments with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the population depth.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Set the projection mask.
    pub fn with_select(mut self, mask: SelectMask) -> Self {
        self.select = Some(mask);
        self
    }

    /// Force the mask mode.
    pub fn with_select_mode(mut self, mode: SelectMode) -> Self {
        self.select_mode = Some(mode);
        self
    }

    /// Set the locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Set the join arguments.
    pub fn with_joins(mut self, joins: JoinQuery) -> Self {
        self.joins = joins;
        self
    }

    /// Set the join arguments from their JSON representation.
    pub fn with_joins_json(mut self, json: &str) -> Result<Self, Error> {
        self.joins = JoinQuery::from_json(json)?;
        Ok(self)
    }

    /// Plan against a versions table.
    pub fn versions(mut self) -> Self {
        self.versions = true;
        self
    }

    /// Effective mask mode.
    pub fn mode(&self) -> SelectMode {
        match (self.select_mode, &self.select) {
            (Some(mode), _) => mode,
            (None, Some(mask)) => SelectMode::infer(mask),
            (None, None) => SelectMode::Include,
        }
    }
}

/// Plans find-many fetches against one schema and metadata source.
pub struct FindManyPlanner<'a> {
    schema: &'a SchemaBundle,
    metadata: &'a dyn MetadataProvider,
    predicates: &'a dyn PredicateCompiler,
    config: CompilerConfig,
}

impl<'a> FindManyPlanner<'a> {
    /// Create a planner with the default configuration.
    pub fn new(
        schema: &'a SchemaBundle,
        metadata: &'a dyn MetadataProvider,
        predicates: &'a dyn PredicateCompiler,
    ) -> Self {
        Self {
            schema,
            metadata,
            predicates,
            config: CompilerConfig::default(),
        }
    }

    /// Use a custom configuration.
    pub fn with_config(mut self, config: CompilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Build the fetch plan for `collection`.
    #[instrument(skip(self, args), fields(depth = args.depth, masked = args.select.is_some()))]
    pub fn plan(&self, collection: &str, args: &FindArgs) -> Result<PlanNode, Error> {
        let collection_def = self
            .schema
            .get_collection(collection)
            .ok_or_else(|| Error::UnknownCollection(collection.to_string()))?;
        let table = self
            .metadata
            .physical_table_name(&to_snake_case(collection))
            .ok_or_else(|| Error::UnknownCollection(collection.to_string()))?;

        let masked = args.select.is_some();
        let columns = if masked {
            ColumnSelection::only(["id"])
        } else {
            ColumnSelection::all()
        };
        let mut root = PlanNode::for_table(&table).with_columns(columns);

        let side_tables = [
            (TEXTS_KEY, self.config.texts_table(&table)),
            (NUMBERS_KEY, self.config.numbers_table(&table)),
            (RELS_KEY, self.config.relationships_table(&table)),
        ];
        for (key, side_table) in side_tables {
            if !self.metadata.table_exists(&side_table) {
                debug!(table = %side_table, "side table missing, not nesting");
                continue;
            }
            let node = PlanNode::for_table(side_table)
                .with_columns(ColumnSelection::all_except(["id", "parent"]))
                .ordered_by(OrderTerm::asc("order"));
            root.with.insert(key.to_string(), Nesting::Plan(node));
        }

        let mut compiler = Compiler::new(
            self.schema,
            self.metadata,
            self.predicates,
            &self.config,
            args,
            collection,
            &table,
        );
        let mut locales = compiler.locales_node(&table, masked);
        let frame = Frame {
            scope: Scope::root(),
            projection: Projection::root(args.select.as_ref(), args.mode()),
            localized: false,
        };
        compiler.compile_fields(&collection_def.fields, &mut root, &mut locales, &table, &frame)?;
        let (blocks, used) = compiler.finish();

        if masked {
            for (key, needed) in [
                (TEXTS_KEY, used.texts),
                (NUMBERS_KEY, used.numbers),
                (RELS_KEY, used.rels),
            ] {
                if !needed && root.with.remove(key).is_some() {
                    debug!(key, "pruned unselected side table");
                }
            }
        }
        attach_locales(&mut root, locales, masked);

        let block_count = blocks.len();
        for (slug, node) in blocks {
            root.with
                .insert(format!("{}{}", BLOCKS_PREFIX, slug), Nesting::Plan(node));
        }

        debug!(table = %table, blocks = block_count, "plan compiled");
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CollectionDef, FieldDef, TableCatalog, TableDef};
    use crate::query::{CompiledPredicate, JoinContext};
    use docplan_proto::{FilterExpr, OrderSpec};

    struct NoPredicates;

    impl PredicateCompiler for NoPredicates {
        fn compile(
            &self,
            _filter: Option<&FilterExpr>,
            _sort: &[OrderSpec],
            _table: &str,
            _ctx: &JoinContext<'_>,
        ) -> Result<CompiledPredicate, Error> {
            Ok(CompiledPredicate::default())
        }
    }

    fn create_test_setup() -> (SchemaBundle, TableCatalog) {
        let schema = SchemaBundle::new().with_collection(
            CollectionDef::new("posts")
                .with_field(FieldDef::text("title"))
                .with_field(FieldDef::text("tags").has_many())
                .with_field(FieldDef::number("scores").has_many())
                .with_field(FieldDef::relationship("categories", "categories").has_many()),
        );
        let catalog = TableCatalog::new()
            .with_table(TableDef::new("posts").with_columns(["id", "title"]))
            .with_table(TableDef::new("posts_texts").with_columns(["id", "parent", "order", "text", "path"]))
            .with_table(TableDef::new("posts_numbers").with_columns(["id", "parent", "order", "number", "path"]))
            .with_table(TableDef::new("posts_rels").with_columns(["id", "parent", "order", "path", "categoriesID"]));
        (schema, catalog)
    }

    #[test]
    fn test_unknown_collection() {
        let (schema, catalog) = create_test_setup();
        let planner = FindManyPlanner::new(&schema, &catalog, &NoPredicates);

        let result = planner.plan("missing", &FindArgs::new());
        assert!(matches!(result, Err(Error::UnknownCollection(name)) if name == "missing"));
    }

    #[test]
    fn test_unmasked_plan_fetches_everything() {
        let (schema, catalog) = create_test_setup();
        let planner = FindManyPlanner::new(&schema, &catalog, &NoPredicates);

        let plan = planner.plan("posts", &FindArgs::new()).unwrap();
        assert_eq!(plan.table.as_deref(), Some("posts"));
        assert!(!plan.columns.is_explicit());
        assert_eq!(plan.child_keys(), vec!["_numbers", "_rels", "_texts"]);

        let rels = plan.child(RELS_KEY).unwrap();
        assert_eq!(rels.columns, ColumnSelection::all_except(["id", "parent"]));
        assert_eq!(rels.order_by, vec![OrderTerm::asc("order")]);
    }

    #[test]
    fn test_mask_prunes_unused_side_tables() {
        let (schema, catalog) = create_test_setup();
        let planner = FindManyPlanner::new(&schema, &catalog, &NoPredicates);

        let args = FindArgs::new().with_select(SelectMask::new().include("title").include("tags"));
        let plan = planner.plan("posts", &args).unwrap();

        assert_eq!(plan.columns, ColumnSelection::only(["id", "title"]));
        assert_eq!(plan.child_keys(), vec!["_texts"]);
    }

    #[test]
    fn test_missing_side_tables_are_not_seeded() {
        let schema = SchemaBundle::new()
            .with_collection(CollectionDef::new("notes").with_field(FieldDef::text("body")));
        let catalog = TableCatalog::new().with_table(TableDef::new("notes").with_columns(["id", "body"]));
        let planner = FindManyPlanner::new(&schema, &catalog, &NoPredicates);

        let plan = planner.plan("notes", &FindArgs::new()).unwrap();
        assert!(plan.with.is_empty());
    }

    #[test]
    fn test_find_args_joins_json() {
        let args = FindArgs::new()
            .with_joins_json(r#"{"relatedPosts": {"limit": 5}, "featuredPost": false}"#)
            .unwrap();
        let related = args.joins.get("relatedPosts").and_then(|p| p.args()).unwrap();
        assert_eq!(related.limit, Some(5));
        assert!(args.joins.get("featuredPost").unwrap().is_disabled());

        let result = FindArgs::new().with_joins_json("[1, 2]");
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[test]
    fn test_find_args_mode() {
        assert_eq!(FindArgs::new().mode(), SelectMode::Include);

        let exclusive = FindArgs::new().with_select(SelectMask::new().exclude("title"));
        assert_eq!(exclusive.mode(), SelectMode::Exclude);

        let forced = exclusive.clone().with_select_mode(SelectMode::Include);
        assert_eq!(forced.mode(), SelectMode::Include);
    }
}
