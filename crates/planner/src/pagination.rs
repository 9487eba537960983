//! Cuts a page out of a compiled `SELECT` on backends without
//! `LIMIT`/`OFFSET`.
//!
//! These rewrites work on the SQL text. They rely on the statement starting
//! with `SELECT`, on every top-level select column ending in `AS <alias>`
//! and on an optional trailing lock clause; the compiler always produces
//! statements of that shape.

use crate::{error::PlannerError, query::capabilities::PagingStyle, query::dialect::Dialect};
use tracing::debug;

const ROW_NUMBER_COLUMN: &str = "__row_nr__";

pub struct Paginator<'a> {
    dialect: &'a dyn Dialect,
    style: PagingStyle,
}

impl<'a> Paginator<'a> {
    pub fn new(dialect: &'a dyn Dialect, style: PagingStyle) -> Self {
        Self { dialect, style }
    }

    /// Rewrites `sql` to return at most `limit` rows (0 for no limit) after
    /// skipping `offset` rows.
    pub fn apply(&self, sql: &str, offset: usize, limit: usize) -> Result<String, PlannerError> {
        if offset == 0 && limit == 0 {
            return Ok(sql.to_string());
        }

        let (body, lock) = self.split_lock(sql);
        let paged = match self.style {
            PagingStyle::Limit => self.limit_offset(body, offset, limit),
            PagingStyle::RowNumberCte if offset == 0 => self.limit_only(body, limit)?,
            PagingStyle::RowNumberCte => self.row_number(body, offset, limit)?,
            PagingStyle::RowNum => rownum(body, offset, limit),
        };
        debug!(style = ?self.style, offset, limit, "Applied pagination");

        Ok(match lock {
            Some(lock) => format!("{paged} {lock}"),
            None => paged,
        })
    }

    /// Splits a trailing lock clause off the statement.
    fn split_lock<'s>(&self, sql: &'s str) -> (&'s str, Option<&'s str>) {
        let sql = sql.trim_end();
        if let Some(clause) = self.dialect.lock_clause() {
            let suffix = format!(" {clause}");
            if sql.len() > suffix.len() {
                let split = sql.len() - suffix.len();
                if sql.is_char_boundary(split) && sql[split..].eq_ignore_ascii_case(&suffix) {
                    return (&sql[..split], Some(&sql[split + 1..]));
                }
            }
        }
        (sql, None)
    }

    fn limit_offset(&self, sql: &str, offset: usize, limit: usize) -> String {
        let mut out = sql.to_string();
        if limit > 0 {
            out.push_str(&format!(" LIMIT {limit}"));
        } else if let Some(all) = self.dialect.unbounded_limit() {
            out.push_str(&format!(" LIMIT {all}"));
        }
        if offset > 0 {
            out.push_str(&format!(" OFFSET {offset}"));
        }
        out
    }

    fn limit_only(&self, sql: &str, limit: usize) -> Result<String, PlannerError> {
        match self.dialect.limit_prefix(limit) {
            Some(prefix) => insert_after_select(sql, &prefix),
            None => Ok(format!("{sql} FETCH FIRST {limit} ROWS ONLY")),
        }
    }

    fn row_number(&self, sql: &str, offset: usize, limit: usize) -> Result<String, PlannerError> {
        let aliases = select_aliases(sql)?;

        // A derived table may only be ordered when it is limited.
        let bound = if limit > 0 {
            offset + limit
        } else {
            i64::MAX as usize
        };
        let inner = match self.dialect.limit_prefix(bound) {
            Some(prefix) if has_top_level_order_by(sql) => insert_after_select(sql, &prefix)?,
            _ => sql.to_string(),
        };

        let upper = if limit > 0 {
            format!(" AND {ROW_NUMBER_COLUMN} <= {}", offset + limit)
        } else {
            String::new()
        };

        Ok(format!(
            "WITH query AS (SELECT inner_query.*, ROW_NUMBER() OVER ({order}) AS {ROW_NUMBER_COLUMN} FROM ({inner}) inner_query) SELECT {columns} FROM query WHERE {ROW_NUMBER_COLUMN} > {offset}{upper} ORDER BY {ROW_NUMBER_COLUMN}",
            order = self.dialect.row_number_order(),
            columns = aliases.join(", "),
        ))
    }
}

fn rownum(sql: &str, offset: usize, limit: usize) -> String {
    match (offset, limit) {
        (0, limit) => format!("SELECT * FROM ({sql}) WHERE ROWNUM <= {limit}"),
        (offset, 0) => format!(
            "SELECT * FROM (SELECT row_.*, ROWNUM rownum_ FROM ({sql}) row_) WHERE rownum_ > {offset}"
        ),
        (offset, limit) => format!(
            "SELECT * FROM (SELECT row_.*, ROWNUM rownum_ FROM ({sql}) row_ WHERE ROWNUM <= {}) WHERE rownum_ > {offset}",
            offset + limit
        ),
    }
}

/// Inserts `text` right after the leading `SELECT [DISTINCT]`.
fn insert_after_select(sql: &str, text: &str) -> Result<String, PlannerError> {
    let start = select_list_start(sql)?;
    Ok(format!("{}{} {}", &sql[..start], text, &sql[start..]))
}

/// Byte offset of the first select column.
fn select_list_start(sql: &str) -> Result<usize, PlannerError> {
    let head = sql.get(..7).unwrap_or_default();
    if !head.eq_ignore_ascii_case("SELECT ") {
        return Err(PlannerError::Pagination(format!(
            "statement does not start with SELECT: {sql}"
        )));
    }
    let rest = &sql[7..];
    let distinct = rest
        .get(..9)
        .is_some_and(|word| word.eq_ignore_ascii_case("DISTINCT "));
    Ok(if distinct { 16 } else { 7 })
}

/// Tracks whether a position is inside quotes or parentheses.
#[derive(Default)]
struct Scanner {
    depth: usize,
    quote: Option<char>,
}

impl Scanner {
    /// Feeds one character; true if it sits at the top level, outside any
    /// quote or parenthesis.
    fn top_level(&mut self, c: char) -> bool {
        if let Some(q) = self.quote {
            if c == q {
                self.quote = None;
            }
            return false;
        }
        match c {
            '\'' | '"' | '`' => {
                self.quote = Some(c);
                false
            }
            '[' => {
                self.quote = Some(']');
                false
            }
            '(' => {
                self.depth += 1;
                false
            }
            ')' => {
                self.depth = self.depth.saturating_sub(1);
                false
            }
            _ => self.depth == 0,
        }
    }
}

/// Byte offsets of every top-level occurrence of `keyword` (surrounded by
/// spaces).
fn top_level_keyword(sql: &str, keyword: &str) -> Vec<usize> {
    let needle = format!(" {keyword} ");
    let mut scanner = Scanner::default();
    let mut found = Vec::new();
    for (idx, c) in sql.char_indices() {
        if scanner.top_level(c)
            && c == ' '
            && sql
                .get(idx..idx + needle.len())
                .is_some_and(|s| s.eq_ignore_ascii_case(&needle))
        {
            found.push(idx);
        }
    }
    found
}

fn has_top_level_order_by(sql: &str) -> bool {
    !top_level_keyword(sql, "ORDER BY").is_empty()
}

/// The alias of every top-level select column, in order.
pub fn select_aliases(sql: &str) -> Result<Vec<String>, PlannerError> {
    let start = select_list_start(sql)?;
    let from = top_level_keyword(sql, "FROM")
        .into_iter()
        .find(|&idx| idx >= start)
        .ok_or_else(|| PlannerError::Pagination(format!("no FROM clause in: {sql}")))?;
    let list = &sql[start..from];

    let mut columns = Vec::new();
    let mut scanner = Scanner::default();
    let mut begin = 0;
    for (idx, c) in list.char_indices() {
        if scanner.top_level(c) && c == ',' {
            columns.push(&list[begin..idx]);
            begin = idx + 1;
        }
    }
    columns.push(&list[begin..]);

    columns
        .into_iter()
        .map(|column| {
            let column = column.trim();
            top_level_keyword(column, "AS")
                .last()
                .map(|&idx| column[idx + 4..].trim().to_string())
                .filter(|alias| !alias.is_empty())
                .ok_or_else(|| {
                    PlannerError::Pagination(format!("select column without alias: {column}"))
                })
        })
        .collect()
}
