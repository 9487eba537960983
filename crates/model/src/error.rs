use crate::filter::operation::BooleanOp;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// An operation name that no leaf filter understands.
    #[error("Unknown filter operation: {0}")]
    UnknownOperation(String),

    /// A composite with the wrong number of children (e.g. `NOT` with two).
    #[error("{op} filter expects exactly one child, found {found}")]
    InvalidArity { op: BooleanOp, found: usize },

    /// A stored literal that could not be decoded.
    #[error("Malformed filter literal: {0}")]
    MalformedLiteral(String),

    #[error("Filter serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
