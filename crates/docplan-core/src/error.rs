//! Core error types.

use thiserror::Error;

/// Plan compilation errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A collection (fetch root or join target) has no physical table.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// A nested array or block table could not be resolved while the
    /// projection still selects from it.
    #[error("unresolved table: {0}")]
    UnresolvedTable(String),

    /// A block reference names a slug not registered in the schema bundle.
    #[error("unknown block: {0}")]
    UnknownBlock(String),

    /// The predicate compiler rejected a join filter or sort.
    #[error("predicate error: {0}")]
    Predicate(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] docplan_proto::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}
