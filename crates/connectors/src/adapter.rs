use crate::{
    error::AdapterError,
    sql::{base::adapter::SqlAdapter, sqlite::adapter::SqliteAdapter},
};
use planner::query::capabilities::BackendKind;

#[derive(Clone)]
pub enum Adapter {
    Sqlite(SqliteAdapter),
}

impl Adapter {
    pub async fn sql(kind: &BackendKind, conn_str: &str) -> Result<Self, AdapterError> {
        match kind {
            BackendKind::Sqlite => {
                let adapter = SqliteAdapter::connect(conn_str).await?;
                Ok(Adapter::Sqlite(adapter))
            }
            other => Err(AdapterError::UnsupportedBackend(other.to_string())),
        }
    }

    pub fn get_sql(&self) -> &(dyn SqlAdapter + Send + Sync) {
        match self {
            Adapter::Sqlite(adapter) => adapter,
        }
    }
}
