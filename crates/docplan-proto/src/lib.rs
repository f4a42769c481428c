//! docplan protocol types.
//!
//! This crate defines the caller-facing argument types consumed by the fetch
//! plan compiler in `docplan-core`.
//!
//! # Modules
//!
//! - [`value`] - Literal values used as filter operands
//! - [`query`] - Filter, ordering and runtime join argument types
//! - [`error`] - Protocol error types
//!
//! # Serialization
//!
//! All types derive `serde::Serialize` and `serde::Deserialize`, so join
//! arguments can be accepted as JSON:
//!
//! ```
//! use docplan_proto::JoinQuery;
//!
//! let joins = JoinQuery::from_json(r#"{"relatedPosts": {"limit": 5}}"#).unwrap();
//! assert!(!joins.is_disabled());
//! ```

pub mod error;
pub mod query;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use query::{FilterExpr, JoinArgs, JoinPathArgs, JoinQuery, OrderDirection, OrderSpec};
pub use value::Value;
