use connectors::{error::AdapterError, sql::base::error::DbError};
use planner::error::PlannerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read input file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to deserialize the query request as JSON: {0}")]
    RequestDeserialize(#[from] serde_json::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("Failed to compile the query: {0}")]
    Planner(#[from] PlannerError),

    #[error("Failed to open the datasource: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}
