use planner::error::PlannerError;
use thiserror::Error;

/// All errors coming from the database/query layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Any SQL driver error.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// The query could not be compiled, or the backend has no capability
    /// table.
    #[error("Planner error: {0}")]
    Planner(#[from] PlannerError),

    /// A probe query returned something other than what it asked for.
    #[error("Probe error: {0}")]
    Probe(String),
}

/// Errors happening during adapter or connection setup.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// SQLx failed to build the connection or pool.
    #[error("SQLx connector creation failed: {0}")]
    Sqlx(#[from] sqlx::Error),
}
