use crate::sql::base::{adapter::SqlAdapter, error::DbError};
use async_trait::async_trait;
use model::core::value::Value;
use planner::{query::capabilities::DialectCapabilities, settings::CaseProbeSettings};
use tracing::{info, warn};

#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    /// Refines `base` with what the live database reports.
    async fn detect(
        &self,
        adapter: &(dyn SqlAdapter + Send + Sync),
        base: DialectCapabilities,
    ) -> Result<DialectCapabilities, DbError>;
}

/// Decides whether string comparison on a reference column ignores case.
///
/// Only values whose upper and lower case forms differ byte-wise take part.
/// If each of those compares equal to both forms under the column's
/// collation, the collation folds case. When the column has no such values
/// the answer is unknown and the backend default is kept.
pub struct CaseSensitivityProbe {
    table: String,
    column: String,
}

impl CaseSensitivityProbe {
    pub fn new(settings: &CaseProbeSettings) -> Self {
        Self {
            table: settings.table.clone(),
            column: settings.column.clone(),
        }
    }

    pub fn sql(&self) -> String {
        let c = &self.column;
        let cased = format!("HEX(UPPER({c})) <> HEX(LOWER({c}))");
        format!(
            "SELECT COUNT(CASE WHEN {cased} THEN 1 END) AS cased, \
             COUNT(CASE WHEN {cased} AND {c} = UPPER({c}) AND {c} = LOWER({c}) THEN 1 END) AS folded \
             FROM {}",
            self.table
        )
    }
}

#[async_trait]
impl CapabilityProbe for CaseSensitivityProbe {
    async fn detect(
        &self,
        adapter: &(dyn SqlAdapter + Send + Sync),
        base: DialectCapabilities,
    ) -> Result<DialectCapabilities, DbError> {
        let rows = adapter.query_rows(&self.sql(), &[]).await?;
        let row = rows
            .first()
            .ok_or_else(|| DbError::Probe("case sensitivity probe returned no rows".into()))?;

        let count = |name: &str| match row.get_value(name) {
            Value::Int(n) => Ok(n),
            Value::Null => Ok(0),
            other => Err(DbError::Probe(format!(
                "expected a count for '{name}', got {other}"
            ))),
        };
        let cased = count("cased")?;
        let folded = count("folded")?;

        if cased == 0 {
            warn!(
                "Case sensitivity check found no cased values in {}.{}, keeping the {} default",
                self.table, self.column, base.backend
            );
            return Ok(base);
        }

        let case_insensitive = folded == cased;
        info!(
            "Probed {}.{}: case-insensitive = {}",
            self.table, self.column, case_insensitive
        );
        Ok(base.with_case_insensitive(case_insensitive))
    }
}
