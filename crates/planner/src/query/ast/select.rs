//! The SELECT statement a compiled filter query is rendered from.

use crate::query::ast::{
    common::{AliasedTable, JoinKind, OrderDir},
    expr::Expr,
};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Select {
    pub distinct: bool,

    /// Output columns. Top-level columns of a paged query carry `AS <alias>`
    /// so the pagination rewriter can name them again.
    pub columns: Vec<Expr>,

    /// The root entity's table under its class alias.
    pub from: Option<AliasedTable>,

    /// Joins in creation order.
    pub joins: Vec<JoinClause>,

    pub where_clause: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,

    /// Row lock suffix, always rendered last.
    pub lock: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub target: AliasedTable,
    pub on: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub direction: OrderDir,
}
