//! Defines the AST for SQL expressions.

use crate::query::ast::select::Select;
use model::core::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column or table identifier, e.g., `users` or `users.id`.
    Identifier(Ident),

    /// A bound parameter.
    Value(Value),

    /// A comparison, e.g., `column = ?`.
    BinaryOp(Box<BinaryOp>),

    /// `expr LIKE pattern [ESCAPE 'c']`
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        escape: Option<char>,
    },

    /// `expr [NOT] IN (a, b, ...)`
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },

    /// `expr [NOT] IN (SELECT ...)`
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Select>,
        negated: bool,
    },

    /// `[NOT] EXISTS (SELECT ...)`
    Exists { subquery: Box<Select>, negated: bool },

    /// `expr IS [NOT] NULL`
    IsNull { expr: Box<Expr>, negated: bool },

    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),

    /// A predicate no row satisfies, rendered as `1 = 0`.
    Never,

    /// A function call, e.g., `COUNT(*)` or `UPPER(name)`.
    FunctionCall(FunctionCall),

    /// Raw SQL text, emitted as is.
    Literal(String),

    /// An aliased expression, e.g. `COUNT(*) AS total_count`
    Alias { expr: Box<Expr>, alias: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub qualifier: Option<String>, // e.g., the 'users' in 'users.id'
    pub name: String,              // e.g., the 'id' in 'users.id'
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub left: Expr,
    pub op: BinaryOperator,
    pub right: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub wildcard: bool, // represents the '*' in 'COUNT(*)'
    pub distinct: bool, // COUNT(DISTINCT x)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,    // =
    NotEq, // <>
    Lt,    // <
    LtEq,  // <=
    Gt,    // >
    GtEq,  // >=
}

impl Expr {
    pub fn column(qualifier: &str, name: &str) -> Self {
        Expr::Identifier(Ident {
            qualifier: Some(qualifier.to_string()),
            name: name.to_string(),
        })
    }

    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Expr::BinaryOp(Box::new(BinaryOp { left, op, right }))
    }

    pub fn function(name: &str, args: Vec<Expr>) -> Self {
        Expr::FunctionCall(FunctionCall {
            name: name.to_string(),
            args,
            wildcard: false,
            distinct: false,
        })
    }

    pub fn alias(self, alias: &str) -> Self {
        Expr::Alias {
            expr: Box::new(self),
            alias: alias.to_string(),
        }
    }

    /// Conjunction of `exprs`, collapsing the single-element case.
    pub fn and(mut exprs: Vec<Expr>) -> Option<Self> {
        match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Expr::And(exprs)),
        }
    }

    /// Disjunction of `exprs`, collapsing the single-element case.
    pub fn or(mut exprs: Vec<Expr>) -> Option<Self> {
        match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Expr::Or(exprs)),
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Expr::And(_) | Expr::Or(_))
    }
}

impl BinaryOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
        }
    }
}
