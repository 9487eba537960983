use model::error::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    /// The request or a subquery names an entity the schema does not know.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    /// A property path segment that is neither a column nor an association.
    #[error("Unknown property '{property}' on entity '{entity}'")]
    UnknownProperty { entity: String, property: String },

    /// A path that starts with an entity name nothing has joined yet.
    #[error("Entity '{0}' is referenced but not part of the query")]
    UnjoinedEntity(String),

    /// A leaf is missing data its operation needs (join target, subquery, ...).
    #[error("{op} filter on '{property}' is missing its {missing}")]
    MissingOperand {
        op: String,
        property: String,
        missing: &'static str,
    },

    /// An operation that cannot be applied to the property it names.
    #[error("Operation {op} is not supported on '{property}': {reason}")]
    UnsupportedOperation {
        op: String,
        property: String,
        reason: String,
    },

    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),

    /// The compiled statement could not be rewritten for paging.
    #[error("Pagination error: {0}")]
    Pagination(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] ModelError),
}
