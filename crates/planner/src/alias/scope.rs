use crate::alias::join::JoinRegistry;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScopeKind {
    /// The outermost query.
    #[default]
    Root,
    /// A subquery with its own `FROM` clause.
    Subquery,
    /// A collection element joined into the enclosing query. Its joins belong
    /// to the nearest scope that owns a `FROM` clause.
    Nested,
}

/// Alias bookkeeping for one level of query nesting.
#[derive(Debug, Clone, Default)]
pub struct AliasScope {
    pub kind: ScopeKind,

    /// The entity property paths are resolved against.
    pub entity: String,
    pub default_alias: String,

    pub(crate) class_aliases: HashMap<String, String>,
    pub(crate) path_aliases: BTreeMap<String, String>,
    pub(crate) joins: JoinRegistry,
    pub(crate) inside_or: bool,
}

impl AliasScope {
    pub fn new(kind: ScopeKind, entity: &str, default_alias: &str) -> Self {
        let mut class_aliases = HashMap::new();
        class_aliases.insert(entity.to_string(), default_alias.to_string());
        Self {
            kind,
            entity: entity.to_string(),
            default_alias: default_alias.to_string(),
            class_aliases,
            ..Default::default()
        }
    }

    pub fn owns_from(&self) -> bool {
        self.kind != ScopeKind::Nested
    }

    pub fn class_alias(&self, entity: &str) -> Option<&str> {
        self.class_aliases.get(entity).map(String::as_str)
    }

    pub fn path_alias(&self, path: &str) -> Option<&str> {
        self.path_aliases.get(path).map(String::as_str)
    }

    pub fn joins(&self) -> &JoinRegistry {
        &self.joins
    }

    pub fn inside_or(&self) -> bool {
        self.inside_or
    }
}
