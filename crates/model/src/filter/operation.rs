use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The operation a leaf filter applies to its property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    In,
    IsNull,
    NotNull,
    IsEmpty,
    ContainsAll,
    Join,
    LeftJoin,
    CollectionCondition,
    Subquery,
}

impl Operation {
    pub const ALL: [Operation; 16] = [
        Operation::Eq,
        Operation::Ne,
        Operation::Gt,
        Operation::Ge,
        Operation::Lt,
        Operation::Le,
        Operation::Like,
        Operation::In,
        Operation::IsNull,
        Operation::NotNull,
        Operation::IsEmpty,
        Operation::ContainsAll,
        Operation::Join,
        Operation::LeftJoin,
        Operation::CollectionCondition,
        Operation::Subquery,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Eq => "EQ",
            Operation::Ne => "NE",
            Operation::Gt => "GT",
            Operation::Ge => "GE",
            Operation::Lt => "LT",
            Operation::Le => "LE",
            Operation::Like => "LIKE",
            Operation::In => "IN",
            Operation::IsNull => "IS_NULL",
            Operation::NotNull => "NOT_NULL",
            Operation::IsEmpty => "IS_EMPTY",
            Operation::ContainsAll => "CONTAINS_ALL",
            Operation::Join => "JOIN",
            Operation::LeftJoin => "LEFT_JOIN",
            Operation::CollectionCondition => "COLLECTION_CONDITION",
            Operation::Subquery => "SUBQUERY",
        }
    }

    /// The operation that selects exactly the rows this one rejects, for the
    /// operations that have one.
    pub fn inverse(&self) -> Option<Operation> {
        match self {
            Operation::Eq => Some(Operation::Ne),
            Operation::Ne => Some(Operation::Eq),
            Operation::Gt => Some(Operation::Le),
            Operation::Le => Some(Operation::Gt),
            Operation::Lt => Some(Operation::Ge),
            Operation::Ge => Some(Operation::Lt),
            Operation::IsNull => Some(Operation::NotNull),
            Operation::NotNull => Some(Operation::IsNull),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == wanted)
            .ok_or_else(|| ModelError::UnknownOperation(s.to_string()))
    }
}

/// The boolean connective of a composite filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BooleanOp {
    And,
    Or,
    Not,
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BooleanOp::And => f.write_str("AND"),
            BooleanOp::Or => f.write_str("OR"),
            BooleanOp::Not => f.write_str("NOT"),
        }
    }
}

/// Where the pattern of a `LIKE` leaf may match inside the column value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchMode {
    #[default]
    Anywhere,
    Start,
    End,
    Exact,
}

impl MatchMode {
    pub fn apply(&self, pattern: &str) -> String {
        match self {
            MatchMode::Anywhere => format!("%{pattern}%"),
            MatchMode::Start => format!("{pattern}%"),
            MatchMode::End => format!("%{pattern}"),
            MatchMode::Exact => pattern.to_string(),
        }
    }
}
