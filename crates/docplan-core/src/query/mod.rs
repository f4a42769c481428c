//! Plan compilation.
//!
//! This module turns a collection's field tree plus a [`FindArgs`] into a
//! nested [`PlanNode`] tree that an executor can run without consulting the
//! schema again.

mod compiler;
mod join;
mod node;
mod planner;
mod scope;

pub use join::{
    look_ahead_limit, CompiledPredicate, ComputedColumn, Dialect, JoinContext, JoinSubquery,
    PredicateCompiler, SqlFragment,
};
pub use node::{ColumnSelection, Nesting, OrderTerm, PlanNode, LOCALES_KEY};
pub use planner::{FindArgs, FindManyPlanner, BLOCKS_PREFIX, NUMBERS_KEY, RELS_KEY, TEXTS_KEY};
pub use scope::{to_snake_case, Scope};
