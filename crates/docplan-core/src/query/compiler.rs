//! The recursive field walk that turns a field list into plan nodes.
//!
//! One [`Compiler`] lives for exactly one top-level compilation. It owns the
//! block registry (every block slug is compiled at most once, no matter how
//! many blocks fields reference it) and the side-table flags the planner uses
//! to prune `_rels`, `_numbers` and `_texts` nestings under a projection.

use std::collections::{BTreeMap, HashMap};

use docplan_proto::{FilterExpr, JoinPathArgs, OrderSpec};
use tracing::{debug, trace, warn};

use super::join::{
    look_ahead_limit, ComputedColumn, JoinContext, JoinSubquery, PredicateCompiler,
};
use super::node::{ColumnSelection, Nesting, OrderTerm, PlanNode, LOCALES_KEY};
use super::planner::FindArgs;
use super::scope::{to_snake_case, Scope};
use crate::catalog::{BlockRef, FieldDef, FieldKind, JoinDef, MetadataProvider, SchemaBundle, TabDef};
use crate::config::CompilerConfig;
use crate::error::Error;
use crate::select::{Decision, Projection};

/// Side tables whose nesting is needed because a qualifying field was
/// selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SideTables {
    /// A many-valued or polymorphic relationship was selected.
    pub rels: bool,
    /// A many-valued number was selected.
    pub numbers: bool,
    /// A many-valued text was selected.
    pub texts: bool,
}

/// Per-level walk state that is cloned, never shared, into child levels.
#[derive(Debug, Clone)]
pub(crate) struct Frame<'a> {
    pub scope: Scope,
    pub projection: Projection<'a>,
    /// The field or one of its ancestors is localized.
    pub localized: bool,
}

pub(crate) struct Compiler<'a> {
    schema: &'a SchemaBundle,
    metadata: &'a dyn MetadataProvider,
    predicates: &'a dyn PredicateCompiler,
    config: &'a CompilerConfig,
    args: &'a FindArgs,
    /// Slug of the collection being fetched.
    collection: &'a str,
    /// Physical table of the collection being fetched.
    top_table: &'a str,
    blocks: BTreeMap<String, PlanNode>,
    /// Projection each block slug was compiled under.
    compiled_blocks: HashMap<String, Projection<'a>>,
    side_tables: SideTables,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(
        schema: &'a SchemaBundle,
        metadata: &'a dyn MetadataProvider,
        predicates: &'a dyn PredicateCompiler,
        config: &'a CompilerConfig,
        args: &'a FindArgs,
        collection: &'a str,
        top_table: &'a str,
    ) -> Self {
        Self {
            schema,
            metadata,
            predicates,
            config,
            args,
            collection,
            top_table,
            blocks: BTreeMap::new(),
            compiled_blocks: HashMap::new(),
            side_tables: SideTables::default(),
        }
    }

    /// Consume the compiler, returning compiled block nodes keyed by slug and
    /// the side-table flags.
    pub(crate) fn finish(self) -> (BTreeMap<String, PlanNode>, SideTables) {
        (self.blocks, self.side_tables)
    }

    /// Compile a field list into `node` (and its locale overlay).
    pub(crate) fn compile_fields(
        &mut self,
        fields: &'a [FieldDef],
        node: &mut PlanNode,
        locales: &mut Option<PlanNode>,
        table: &str,
        frame: &Frame<'a>,
    ) -> Result<(), Error> {
        for field in fields {
            self.compile_field(field, node, locales, table, frame)?;
        }
        Ok(())
    }

    fn compile_field(
        &mut self,
        field: &'a FieldDef,
        node: &mut PlanNode,
        locales: &mut Option<PlanNode>,
        table: &str,
        frame: &Frame<'a>,
    ) -> Result<(), Error> {
        if field.is_virtual() {
            trace!(field = %field.name, "skipping virtual field");
            return Ok(());
        }
        trace!(field = %field.name, table, "compiling field");

        match &field.kind {
            FieldKind::Collapsible { fields } | FieldKind::Row { fields } => {
                self.compile_fields(fields, node, locales, table, frame)
            }
            FieldKind::Tabs { tabs } => self.compile_tabs(tabs, node, locales, table, frame),
            FieldKind::Group { fields } => {
                let decision = frame.projection.decide(&field.name);
                let Some(projection) = frame.projection.descend(decision) else {
                    return Ok(());
                };
                let child = Frame {
                    scope: frame.scope.child(&field.name),
                    projection,
                    localized: frame.localized || field.localized,
                };
                self.compile_fields(fields, node, locales, table, &child)
            }
            FieldKind::Array { fields } => self.compile_array(field, fields, node, table, frame),
            FieldKind::Blocks { blocks } => self.compile_blocks(field, blocks, frame),
            FieldKind::Select { has_many: true, .. } => {
                self.compile_select_many(field, node, table, frame);
                Ok(())
            }
            FieldKind::Join(join) => self.compile_join(field, join, node, table, frame),
            FieldKind::Relationship {
                relation_to,
                has_many,
            }
            | FieldKind::Upload {
                relation_to,
                has_many,
            } => {
                if self.args.depth > 0
                    && !has_many
                    && relation_to.single().is_some()
                    && frame.projection.decide(&field.name) != Decision::Exclude
                {
                    let key = frame.scope.key(&field.name);
                    let localized = frame.localized || field.localized;
                    route(node, locales, localized)
                        .with
                        .insert(key, Nesting::ById);
                }
                self.compile_leaf(field, node, locales, table, frame);
                Ok(())
            }
            _ => {
                self.compile_leaf(field, node, locales, table, frame);
                Ok(())
            }
        }
    }

    fn compile_tabs(
        &mut self,
        tabs: &'a [TabDef],
        node: &mut PlanNode,
        locales: &mut Option<PlanNode>,
        table: &str,
        frame: &Frame<'a>,
    ) -> Result<(), Error> {
        for tab in tabs {
            let localized = frame.localized || tab.localized;
            let child = match &tab.name {
                Some(name) => {
                    let decision = frame.projection.decide(name);
                    let Some(projection) = frame.projection.descend(decision) else {
                        trace!(tab = %name, "tab excluded by projection");
                        continue;
                    };
                    Frame {
                        scope: frame.scope.child(name),
                        projection,
                        localized,
                    }
                }
                None => Frame {
                    localized,
                    ..frame.clone()
                },
            };
            self.compile_fields(&tab.fields, node, locales, table, &child)?;
        }
        Ok(())
    }

    fn compile_array(
        &mut self,
        field: &'a FieldDef,
        fields: &'a [FieldDef],
        node: &mut PlanNode,
        table: &str,
        frame: &Frame<'a>,
    ) -> Result<(), Error> {
        let decision = frame.projection.decide(&field.name);
        let Some(projection) = frame.projection.descend(decision) else {
            return Ok(());
        };

        let logical = format!("{}_{}", table, frame.scope.table_key(&field.name));
        let Some(array_table) = self.metadata.physical_table_name(&logical) else {
            if projection.is_empty() {
                debug!(table = %logical, "array table missing, nothing selected from it");
                return Ok(());
            }
            return Err(Error::UnresolvedTable(logical));
        };

        let partial = projection.is_partial();
        let mut child = self.row_node(&array_table, partial, &["id", "_order"]);
        let mut child_locales = self.locales_node(&array_table, partial);
        let child_frame = Frame {
            scope: Scope::root(),
            projection,
            localized: frame.localized || field.localized,
        };
        self.compile_fields(fields, &mut child, &mut child_locales, &array_table, &child_frame)?;
        attach_locales(&mut child, child_locales, partial);

        node.with
            .insert(frame.scope.key(&field.name), Nesting::Plan(child));
        Ok(())
    }

    fn compile_select_many(
        &mut self,
        field: &'a FieldDef,
        node: &mut PlanNode,
        table: &str,
        frame: &Frame<'a>,
    ) {
        if frame.projection.decide(&field.name) == Decision::Exclude {
            return;
        }
        let logical = format!("{}_{}", table, frame.scope.table_key(&field.name));
        let mut child = PlanNode::new()
            .with_columns(ColumnSelection::all_except(["id", "order", "parent"]))
            .ordered_by(OrderTerm::asc("order"));
        let Some(values_table) = self.metadata.physical_table_name(&logical) else {
            debug!(table = %logical, "select values table missing, not nesting");
            return;
        };
        child.table = Some(values_table);
        node.with
            .insert(frame.scope.key(&field.name), Nesting::Plan(child));
    }

    fn compile_blocks(
        &mut self,
        field: &'a FieldDef,
        blocks: &'a [BlockRef],
        frame: &Frame<'a>,
    ) -> Result<(), Error> {
        let decision = frame.projection.decide(&field.name);
        let Some(union) = frame.projection.descend(decision) else {
            return Ok(());
        };

        for block_ref in blocks {
            let block = self.schema.resolve_block(block_ref)?;

            // Per-slug entries of a union mask; an unselected shape still
            // gets a node, with an empty inclusive projection.
            let projection = if union.is_partial() {
                union
                    .descend(union.decide(&block.slug))
                    .unwrap_or_else(Projection::empty)
            } else {
                union
            };

            if let Some(compiled) = self.compiled_blocks.get(&block.slug) {
                if *compiled != projection {
                    debug!(
                        slug = %block.slug,
                        field = %field.name,
                        compiled = ?compiled,
                        requested = ?projection,
                        "block already compiled under a different projection, reusing"
                    );
                } else {
                    debug!(slug = %block.slug, "block already compiled, reusing");
                }
                continue;
            }

            let logical = format!(
                "{}_blocks_{}",
                self.top_table,
                to_snake_case(&block.slug)
            );
            let Some(block_table) = self.metadata.physical_table_name(&logical) else {
                if projection.is_empty() {
                    debug!(table = %logical, "block table missing, nothing selected from it");
                    continue;
                }
                return Err(Error::UnresolvedTable(logical));
            };
            self.compiled_blocks.insert(block.slug.clone(), projection);

            let partial = projection.is_partial();
            let mut block_node = self.row_node(&block_table, partial, &["id", "_order", "_path"]);
            let mut block_locales = self.locales_node(&block_table, partial);
            let child_frame = Frame {
                scope: Scope::root(),
                projection,
                localized: frame.localized || field.localized,
            };
            self.compile_fields(
                &block.fields,
                &mut block_node,
                &mut block_locales,
                &block_table,
                &child_frame,
            )?;
            attach_locales(&mut block_node, block_locales, partial);

            self.blocks.insert(block.slug.clone(), block_node);
        }
        Ok(())
    }

    fn compile_join(
        &mut self,
        field: &'a FieldDef,
        join: &'a JoinDef,
        node: &mut PlanNode,
        table: &str,
        frame: &Frame<'a>,
    ) -> Result<(), Error> {
        if self.args.joins.is_disabled() {
            return Ok(());
        }
        if frame.projection.decide(&field.name) == Decision::Exclude {
            return Ok(());
        }

        let path = frame.scope.dotted(&field.name);
        let path_args = self.args.joins.get(&path);
        if path_args.is_some_and(JoinPathArgs::is_disabled) {
            debug!(path = %path, "join disabled for path");
            return Ok(());
        }
        let args = path_args.and_then(JoinPathArgs::args);

        let requested = args
            .and_then(|a| a.limit)
            .or(join.default_limit)
            .unwrap_or(self.config.default_join_limit);
        let limit = look_ahead_limit(requested);
        let sort: &[OrderSpec] = match args {
            Some(a) if !a.sort.is_empty() => &a.sort,
            _ => &join.default_sort,
        };
        let user_filter = args.and_then(|a| a.filter.clone());

        let target_table = self
            .metadata
            .physical_table_name(&to_snake_case(&join.collection))
            .ok_or_else(|| Error::UnknownCollection(join.collection.clone()))?;

        let column_name = frame.scope.key(&field.name);
        let id_column = if self.args.versions { "parent" } else { "id" };
        let outer_id = format!("{}.{}", table, id_column);

        if join.has_many {
            let rels_table = self.config.relationships_table(&target_table);
            if !self.metadata.table_exists(&rels_table) {
                return Err(Error::UnresolvedTable(rels_table));
            }
            let alias = format!("{}_alias", column_name);

            let mut correlation = FilterExpr::and(vec![
                FilterExpr::eq_column(
                    format!("{}ID", to_snake_case(self.collection)),
                    outer_id,
                ),
                FilterExpr::eq("path", join.on.as_str()),
            ]);
            let mut select = vec![("id".to_string(), "parent".to_string())];
            if self.metadata.column_exists(&rels_table, "locale") {
                select.push(("locale".to_string(), "locale".to_string()));
                if let Some(locale) = self.args.locale.as_deref().filter(|l| *l != "all") {
                    correlation = correlation.and_also(FilterExpr::eq("locale", locale));
                }
            }
            let filter = match user_filter {
                Some(user) => correlation.and_also(user),
                None => correlation,
            };

            let ctx = JoinContext {
                collection: self.collection,
                parent_table: table,
                target_collection: &join.collection,
                target_table: &target_table,
                alias: &alias,
                locale: self.args.locale.as_deref(),
            };
            let compiled = self.predicates.compile(Some(&filter), sort, &rels_table, &ctx)?;

            let subquery = JoinSubquery {
                table: rels_table,
                select,
                condition: compiled.condition,
                order_by: compiled.order_by,
                limit,
            };
            debug!(column = %column_name, ?limit, "attaching aggregated join column");
            node.extras.insert(
                column_name,
                ComputedColumn::json_array(alias, subquery, self.config.dialect),
            );
        } else {
            let join_table = if join.localized {
                self.config.locales_table(&target_table)
            } else {
                target_table.clone()
            };
            let columns = if join.localized {
                ColumnSelection::only(["_locale", "_parentID"])
            } else {
                ColumnSelection::only(["id", "parent"])
            };

            let correlation = if join.polymorphic {
                FilterExpr::and(vec![
                    FilterExpr::eq(format!("{}.relationTo", join.on), self.collection),
                    FilterExpr::eq_column(format!("{}.value", join.on), outer_id),
                ])
            } else {
                FilterExpr::eq_column(join.on.as_str(), outer_id)
            };
            let filter = match user_filter {
                Some(user) => correlation.and_also(user),
                None => correlation,
            };

            let ctx = JoinContext {
                collection: self.collection,
                parent_table: table,
                target_collection: &join.collection,
                target_table: &target_table,
                alias: &column_name,
                locale: self.args.locale.as_deref(),
            };
            let compiled = self.predicates.compile(Some(&filter), sort, &join_table, &ctx)?;

            let mut child = PlanNode::for_table(join_table).with_columns(columns);
            child.filter = compiled.condition;
            child.order_by = compiled.order_by;
            child.limit = limit;
            node.with.insert(column_name, Nesting::Plan(child));
        }
        Ok(())
    }

    /// Leaf data fields only matter under an explicit projection; otherwise
    /// the executor fetches the whole row.
    fn compile_leaf(
        &mut self,
        field: &'a FieldDef,
        node: &mut PlanNode,
        locales: &mut Option<PlanNode>,
        table: &str,
        frame: &Frame<'a>,
    ) {
        if !node.columns.is_explicit() {
            return;
        }
        if frame.projection.decide(&field.name) == Decision::Exclude {
            return;
        }

        let side_table = match &field.kind {
            FieldKind::Relationship {
                relation_to,
                has_many,
            }
            | FieldKind::Upload {
                relation_to,
                has_many,
            } if *has_many || relation_to.is_polymorphic() => Some(&mut self.side_tables.rels),
            FieldKind::Number { has_many: true } => Some(&mut self.side_tables.numbers),
            FieldKind::Text { has_many: true } => Some(&mut self.side_tables.texts),
            _ => None,
        };
        let stored_aside = side_table.is_some();
        if let Some(flag) = side_table {
            *flag = true;
        }

        let key = frame.scope.key(&field.name);
        match locales {
            Some(overlay) if frame.localized || field.localized => {
                overlay.columns.insert(key);
            }
            _ if self.metadata.column_exists(table, &key) => {
                node.columns.insert(key);
            }
            _ if stored_aside => {}
            _ => warn!(table, column = %key, "selected column does not exist, dropping"),
        }
    }

    /// Node for a row-addressable child table (array rows, block rows).
    fn row_node(&self, table: &str, partial: bool, identity: &[&str]) -> PlanNode {
        let columns = if partial {
            let mut columns = ColumnSelection::only(identity.iter().copied());
            if self.metadata.column_exists(table, "_locale") {
                columns.insert("_locale");
            }
            columns
        } else {
            ColumnSelection::all_except(["_parentID"])
        };
        PlanNode::for_table(table)
            .with_columns(columns)
            .ordered_by(OrderTerm::asc("_order"))
    }

    /// Locale overlay node for `table`, if its locale table exists.
    pub(crate) fn locales_node(&self, table: &str, partial: bool) -> Option<PlanNode> {
        let locales_table = self.config.locales_table(table);
        if !self.metadata.table_exists(&locales_table) {
            return None;
        }
        let columns = if partial {
            ColumnSelection::only(["_locale"])
        } else {
            ColumnSelection::all_except(["id", "_parentID"])
        };
        Some(PlanNode::for_table(locales_table).with_columns(columns))
    }
}

/// Node that receives a field's data: the locale overlay for localized
/// fields (when one exists), the level node otherwise.
fn route<'n>(
    node: &'n mut PlanNode,
    locales: &'n mut Option<PlanNode>,
    localized: bool,
) -> &'n mut PlanNode {
    match locales {
        Some(overlay) if localized => overlay,
        _ => node,
    }
}

/// Nest a locale overlay under `node`, unless the projection reduced it to
/// the locale discriminator alone.
pub(crate) fn attach_locales(node: &mut PlanNode, locales: Option<PlanNode>, partial: bool) {
    let Some(overlay) = locales else {
        return;
    };
    if partial && overlay.is_degenerate_locale() {
        debug!(table = ?overlay.table, "dropping degenerate locale overlay");
        return;
    }
    node.with.insert(LOCALES_KEY.to_string(), Nesting::Plan(overlay));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{TableCatalog, TableDef};
    use crate::query::CompiledPredicate;

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

    fn create_test_catalog() -> TableCatalog {
        TableCatalog::new()
            .with_table(TableDef::new("pages_items").with_columns(["id", "_order", "_parentID", "_locale", "label"]))
            .with_table(TableDef::new("pages_items_locales").with_columns(["id", "_locale", "_parentID", "caption"]))
            .with_table(TableDef::new("pages_blocks_hero").with_columns(["id", "_order", "_parentID", "_path"]))
    }

    #[test]
    fn test_row_node_columns() {
        let schema = SchemaBundle::new();
        let catalog = create_test_catalog();
        let config = CompilerConfig::default();
        let args = FindArgs::new();
        let compiler = Compiler::new(&schema, &catalog, &NoPredicates, &config, &args, "pages", "pages");

        let items = compiler.row_node("pages_items", true, &["id", "_order"]);
        assert_eq!(items.table.as_deref(), Some("pages_items"));
        assert_eq!(items.columns, ColumnSelection::only(["id", "_order", "_locale"]));
        assert_eq!(items.order_by, vec![OrderTerm::asc("_order")]);

        let hero = compiler.row_node("pages_blocks_hero", true, &["id", "_order", "_path"]);
        assert_eq!(hero.columns, ColumnSelection::only(["id", "_order", "_path"]));

        let full = compiler.row_node("pages_items", false, &["id", "_order"]);
        assert_eq!(full.columns, ColumnSelection::all_except(["_parentID"]));
    }

    #[test]
    fn test_locales_node() {
        let schema = SchemaBundle::new();
        let catalog = create_test_catalog();
        let config = CompilerConfig::default();
        let args = FindArgs::new();
        let compiler = Compiler::new(&schema, &catalog, &NoPredicates, &config, &args, "pages", "pages");

        let partial = compiler.locales_node("pages_items", true).unwrap();
        assert_eq!(partial.table.as_deref(), Some("pages_items_locales"));
        assert_eq!(partial.columns, ColumnSelection::only(["_locale"]));

        let full = compiler.locales_node("pages_items", false).unwrap();
        assert_eq!(full.columns, ColumnSelection::all_except(["id", "_parentID"]));

        assert!(compiler.locales_node("pages_blocks_hero", true).is_none());
    }

    #[test]
    fn test_attach_locales() {
        let overlay = || PlanNode::for_table("pages_items_locales").with_columns(ColumnSelection::only(["_locale"]));

        let mut node = PlanNode::for_table("pages_items");
        attach_locales(&mut node, Some(overlay()), true);
        assert!(!node.has_child(LOCALES_KEY));

        attach_locales(&mut node, Some(overlay()), false);
        assert!(node.has_child(LOCALES_KEY));

        let mut populated = overlay();
        populated.columns.insert("caption");
        let mut node = PlanNode::for_table("pages_items");
        attach_locales(&mut node, Some(populated), true);
        assert_eq!(
            node.locales().map(|l| l.columns.clone()),
            Some(ColumnSelection::only(["_locale", "caption"]))
        );

        let mut node = PlanNode::for_table("pages_items");
        attach_locales(&mut node, None, true);
        assert!(node.with.is_empty());
    }
}
