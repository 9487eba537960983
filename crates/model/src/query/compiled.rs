use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The result of compiling a [`QueryRequest`](crate::query::request::QueryRequest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub text: String,

    /// Bind parameters in placeholder order.
    pub params: Vec<Value>,

    /// Alias of every property path that was joined, plus the queried
    /// entity's own alias under its name.
    pub alias_map: BTreeMap<String, String>,

    /// `DISTINCT` was requested but could not be used for this projection;
    /// the caller has to drop duplicate rows itself.
    pub client_side_distinct: bool,
}

impl CompiledQuery {
    pub fn alias(&self, path: &str) -> Option<&str> {
        self.alias_map.get(path).map(String::as_str)
    }
}
