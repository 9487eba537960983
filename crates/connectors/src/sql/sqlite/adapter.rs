use crate::sql::base::{
    adapter::SqlAdapter,
    error::{ConnectorError, DbError},
};
use async_trait::async_trait;
use model::{
    core::value::Value,
    records::row::{FieldValue, RowData},
};
use planner::query::capabilities::BackendKind;
use sqlx::{
    Column, Pool, Row, Sqlite, TypeInfo, ValueRef,
    query::Query,
    sqlite::{SqliteArguments, SqlitePoolOptions, SqliteRow},
};
use tracing::warn;

fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for p in params {
        query = match p {
            Value::Int(i) => query.bind(*i),
            Value::Uint(u) => query.bind(*u as i64),
            Value::Float(f) => query.bind(*f),
            Value::String(s) => query.bind(s.as_str()),
            Value::Boolean(b) => query.bind(*b),
            Value::Uuid(u) => query.bind(*u),
            Value::Date(d) => query.bind(*d),
            Value::Timestamp(t) => query.bind(*t),
            Value::List(_) => query.bind(p.to_string()),
            Value::Null => query.bind(None::<String>),
        };
    }
    query
}

fn to_row_data(row: &SqliteRow) -> Result<RowData, DbError> {
    let mut field_values = Vec::with_capacity(row.columns().len());
    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_string();
            match type_name.as_str() {
                "INTEGER" => Value::Int(row.try_get::<i64, _>(idx)?),
                "REAL" => Value::Float(row.try_get::<f64, _>(idx)?),
                "TEXT" => Value::String(row.try_get::<String, _>(idx)?),
                "BOOLEAN" => Value::Boolean(row.try_get::<bool, _>(idx)?),
                other => {
                    warn!("Unsupported SQLite value type {} in column {}", other, column.name());
                    Value::Null
                }
            }
        };
        field_values.push(FieldValue {
            name: column.name().to_string(),
            value,
        });
    }
    Ok(RowData::new(field_values))
}

#[derive(Clone)]
pub struct SqliteAdapter {
    pool: Pool<Sqlite>,
}

impl SqliteAdapter {
    /// A private in-memory database.
    pub async fn in_memory() -> Result<Self, ConnectorError> {
        Self::connect("sqlite::memory:").await
    }
}

#[async_trait]
impl SqlAdapter for SqliteAdapter {
    async fn connect(url: &str) -> Result<Self, ConnectorError> {
        // Every connection to `sqlite::memory:` opens its own database, and
        // it is gone once that connection closes.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;
        Ok(SqliteAdapter { pool })
    }

    async fn exec(&self, query: &str) -> Result<(), DbError> {
        sqlx::query(query).execute(&self.pool).await?;
        Ok(())
    }

    async fn exec_params(&self, query: &str, params: Vec<Value>) -> Result<(), DbError> {
        let query = sqlx::query(query);
        let bound_query = bind_values(query, &params);
        bound_query.execute(&self.pool).await?;
        Ok(())
    }

    async fn query_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<RowData>, DbError> {
        let rows = bind_values(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(to_row_data).collect()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }
}
