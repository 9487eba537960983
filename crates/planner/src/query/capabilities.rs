//! What each supported backend can and cannot do, as far as query
//! generation is concerned.

use crate::error::PlannerError;
use std::{collections::BTreeSet, fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Postgres,
    MySql,
    SqlServer,
    Oracle,
    Db2,
    Sqlite,
    Other(String),
}

impl FromStr for BackendKind {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => BackendKind::Postgres,
            "mysql" | "mariadb" => BackendKind::MySql,
            "sqlserver" | "mssql" | "sql server" => BackendKind::SqlServer,
            "oracle" => BackendKind::Oracle,
            "db2" => BackendKind::Db2,
            "sqlite" => BackendKind::Sqlite,
            _ => BackendKind::Other(s.to_string()),
        })
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Postgres => write!(f, "postgres"),
            BackendKind::MySql => write!(f, "mysql"),
            BackendKind::SqlServer => write!(f, "sqlserver"),
            BackendKind::Oracle => write!(f, "oracle"),
            BackendKind::Db2 => write!(f, "db2"),
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Other(name) => write!(f, "{name}"),
        }
    }
}

/// How a page of rows is cut out of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingStyle {
    /// `LIMIT n OFFSET m`
    Limit,
    /// Numbered rows in a CTE, filtered on the row number.
    RowNumberCte,
    /// Nested selects filtered on `ROWNUM`.
    RowNum,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialectCapabilities {
    pub backend: BackendKind,
    pub distinct_without_projection: bool,
    pub backslash_escape_required: bool,
    pub reserved_wildcards: BTreeSet<char>,
    pub case_insensitive: bool,
    pub paging: PagingStyle,
}

impl DialectCapabilities {
    pub fn for_backend(backend: &BackendKind) -> Result<Self, PlannerError> {
        let (distinct, backslash, extra_wildcards, case_insensitive, paging): (
            bool,
            bool,
            &[char],
            bool,
            PagingStyle,
        ) = match backend {
            BackendKind::Postgres => (true, true, &[], false, PagingStyle::Limit),
            BackendKind::MySql => (true, true, &[], true, PagingStyle::Limit),
            BackendKind::SqlServer => (false, false, &['['], true, PagingStyle::RowNumberCte),
            BackendKind::Oracle => (false, false, &[], false, PagingStyle::RowNum),
            BackendKind::Db2 => (false, false, &[], false, PagingStyle::RowNumberCte),
            BackendKind::Sqlite => (true, false, &[], false, PagingStyle::Limit),
            BackendKind::Other(name) => {
                return Err(PlannerError::UnsupportedBackend(name.clone()));
            }
        };

        let mut reserved_wildcards = BTreeSet::from(['%', '_']);
        reserved_wildcards.extend(extra_wildcards.iter().copied());

        Ok(Self {
            backend: backend.clone(),
            distinct_without_projection: distinct,
            backslash_escape_required: backslash,
            reserved_wildcards,
            case_insensitive,
            paging,
        })
    }

    /// Overrides the default string comparison mode, usually with the
    /// answer of a probe query.
    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    pub fn with_paging(mut self, paging: PagingStyle) -> Self {
        self.paging = paging;
        self
    }

    /// Whether `SELECT DISTINCT` may be emitted for the given projection.
    pub fn can_use_distinct(&self, projected: &[String]) -> bool {
        !projected.is_empty() || self.distinct_without_projection
    }

    pub fn is_reserved_wildcard(&self, c: char) -> bool {
        self.reserved_wildcards.contains(&c)
    }
}
