use crate::sql::base::error::{ConnectorError, DbError};
use async_trait::async_trait;
use model::{core::value::Value, query::compiled::CompiledQuery, records::row::RowData};
use planner::query::capabilities::BackendKind;
use std::collections::HashSet;
use tracing::debug;

#[async_trait]
pub trait SqlAdapter: Send + Sync {
    async fn connect(url: &str) -> Result<Self, ConnectorError>
    where
        Self: Sized;

    // Exec / Params
    async fn exec(&self, query: &str) -> Result<(), DbError>;
    async fn exec_params(&self, query: &str, params: Vec<Value>) -> Result<(), DbError>;

    async fn query_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<RowData>, DbError>;

    /// Runs a compiled query. Duplicate rows are dropped here when the
    /// backend could not apply `DISTINCT` itself.
    async fn fetch(&self, query: &CompiledQuery) -> Result<Vec<RowData>, DbError> {
        let rows = self.query_rows(&query.text, &query.params).await?;
        if !query.client_side_distinct {
            return Ok(rows);
        }

        let fetched = rows.len();
        let mut seen = HashSet::with_capacity(fetched);
        let rows: Vec<RowData> = rows
            .into_iter()
            .filter(|row| seen.insert(row.clone()))
            .collect();
        debug!("Dropped {} duplicate rows", fetched - rows.len());
        Ok(rows)
    }

    // Dialect & capabilities
    fn kind(&self) -> BackendKind;
}
