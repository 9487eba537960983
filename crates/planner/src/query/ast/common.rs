//! Table and sort nodes shared by every statement.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(name: &str) -> Self {
        Self {
            schema: None,
            name: name.to_string(),
        }
    }

    pub fn qualified(schema: &str, name: &str) -> Self {
        Self {
            schema: Some(schema.to_string()),
            name: name.to_string(),
        }
    }
}

/// A table together with the alias filter paths resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasedTable {
    pub table: TableRef,
    pub alias: String,
}

impl AliasedTable {
    pub fn new(table: TableRef, alias: &str) -> Self {
        Self {
            table,
            alias: alias.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

impl JoinKind {
    pub fn from_outer(outer: bool) -> Self {
        if outer {
            JoinKind::LeftOuter
        } else {
            JoinKind::Inner
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::LeftOuter => "LEFT OUTER JOIN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDir {
    Asc,
    Desc,
}

impl OrderDir {
    pub fn from_ascending(ascending: bool) -> Self {
        if ascending { OrderDir::Asc } else { OrderDir::Desc }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            OrderDir::Asc => "ASC",
            OrderDir::Desc => "DESC",
        }
    }
}
