//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Deserialization failed.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}
