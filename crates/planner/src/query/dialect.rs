//! Defines the `Dialect` trait for database-specific SQL syntax.

use crate::{error::PlannerError, query::capabilities::BackendKind};

pub trait Dialect: Send + Sync {
    /// Wraps an identifier (like a table or column name) in the correct
    /// quotation marks for the dialect.
    ///
    /// - PostgreSQL uses double quotes: `"my_column"`
    /// - MySQL uses backticks: `` `my_column` ``
    /// - SQL Server uses brackets: `[my_column]`
    fn quote_identifier(&self, ident: &str) -> String;

    /// Returns the placeholder for a parameterized query.
    ///
    /// - PostgreSQL uses `$1`, `$2`, etc.
    /// - MySQL uses `?`
    fn get_placeholder(&self, index: usize) -> String;

    /// Returns the name of the dialect (e.g., "PostgreSQL", "MySQL").
    fn name(&self) -> String;

    fn kind(&self) -> BackendKind;

    /// Renders the escape character of a `LIKE ... ESCAPE` clause as a string
    /// literal.
    fn escape_literal(&self, escape: char) -> String {
        format!("'{escape}'")
    }

    /// A row limit written right after `SELECT [DISTINCT]`, for dialects that
    /// have no trailing limit clause.
    fn limit_prefix(&self, _limit: usize) -> Option<String> {
        None
    }

    /// The `LIMIT` value meaning "all rows", for dialects that cannot write
    /// `OFFSET` without a limit.
    fn unbounded_limit(&self) -> Option<&'static str> {
        None
    }

    /// The window ordering used when numbering rows for pagination.
    fn row_number_order(&self) -> &'static str {
        ""
    }

    /// The clause that locks selected rows, if the dialect has one.
    fn lock_clause(&self) -> Option<&'static str> {
        Some("FOR UPDATE")
    }
}

/// Returns the dialect for a backend.
pub fn dialect_for(kind: &BackendKind) -> Result<Box<dyn Dialect>, PlannerError> {
    match kind {
        BackendKind::Postgres => Ok(Box::new(Postgres)),
        BackendKind::MySql => Ok(Box::new(MySql)),
        BackendKind::SqlServer => Ok(Box::new(SqlServer)),
        BackendKind::Oracle => Ok(Box::new(Oracle)),
        BackendKind::Db2 => Ok(Box::new(Db2)),
        BackendKind::Sqlite => Ok(Box::new(Sqlite)),
        BackendKind::Other(name) => Err(PlannerError::UnsupportedBackend(name.clone())),
    }
}

fn double_quoted(ident: &str) -> String {
    format!(r#""{}""#, ident.replace('"', "\"\""))
}

#[derive(Debug, Clone)]
pub struct Postgres;

impl Dialect for Postgres {
    fn quote_identifier(&self, ident: &str) -> String {
        double_quoted(ident)
    }

    fn get_placeholder(&self, index: usize) -> String {
        // PostgreSQL uses $1, $2, etc.
        format!("${}", index + 1)
    }

    fn name(&self) -> String {
        "PostgreSQL".into()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }
}

#[derive(Debug, Clone)]
pub struct MySql;

impl Dialect for MySql {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn get_placeholder(&self, _index: usize) -> String {
        // MySQL uses ?
        "?".into()
    }

    fn name(&self) -> String {
        "MySQL".into()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::MySql
    }

    fn unbounded_limit(&self) -> Option<&'static str> {
        Some("18446744073709551615")
    }

    fn escape_literal(&self, escape: char) -> String {
        // Backslash is itself an escape inside MySQL string literals.
        if escape == '\\' {
            "'\\\\'".into()
        } else {
            format!("'{escape}'")
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqlServer;

impl Dialect for SqlServer {
    fn quote_identifier(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
    }

    fn get_placeholder(&self, index: usize) -> String {
        format!("@P{}", index + 1)
    }

    fn name(&self) -> String {
        "SQL Server".into()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::SqlServer
    }

    fn limit_prefix(&self, limit: usize) -> Option<String> {
        Some(format!("TOP({limit})"))
    }

    fn row_number_order(&self) -> &'static str {
        "ORDER BY CURRENT_TIMESTAMP"
    }

    fn lock_clause(&self) -> Option<&'static str> {
        // Locking is expressed with table hints, not a trailing clause.
        None
    }
}

#[derive(Debug, Clone)]
pub struct Oracle;

impl Dialect for Oracle {
    fn quote_identifier(&self, ident: &str) -> String {
        double_quoted(ident)
    }

    fn get_placeholder(&self, index: usize) -> String {
        format!(":{}", index + 1)
    }

    fn name(&self) -> String {
        "Oracle".into()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Oracle
    }
}

#[derive(Debug, Clone)]
pub struct Db2;

impl Dialect for Db2 {
    fn quote_identifier(&self, ident: &str) -> String {
        double_quoted(ident)
    }

    fn get_placeholder(&self, _index: usize) -> String {
        "?".into()
    }

    fn name(&self) -> String {
        "DB2".into()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Db2
    }
}

#[derive(Debug, Clone)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn quote_identifier(&self, ident: &str) -> String {
        double_quoted(ident)
    }

    fn get_placeholder(&self, _index: usize) -> String {
        "?".into()
    }

    fn name(&self) -> String {
        "SQLite".into()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn unbounded_limit(&self) -> Option<&'static str> {
        Some("-1")
    }

    fn lock_clause(&self) -> Option<&'static str> {
        None
    }
}
