//! Joins created while compiling a filter, memoized per source alias and
//! property.

use crate::query::ast::{
    common::{AliasedTable, JoinKind, TableRef},
    expr::{BinaryOperator, Expr},
    select::JoinClause,
};
use std::collections::HashMap;
use tracing::debug;

/// Everything needed to add a join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    pub source_alias: String,
    pub source_column: String,

    /// The association (or explicit join target) being followed.
    pub property: String,

    pub target_entity: String,
    pub target_table: String,
    pub target_column: String,
    pub outer: bool,

    /// Always create a new join, even if one exists for the same property.
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinDescriptor {
    pub source_alias: String,
    pub property: String,
    pub target_entity: String,
    pub table: String,
    pub alias: String,
    pub outer: bool,
    pub on: Expr,
}

impl JoinDescriptor {
    pub fn to_clause(&self) -> JoinClause {
        JoinClause {
            kind: JoinKind::from_outer(self.outer),
            target: AliasedTable::new(TableRef::new(&self.table), &self.alias),
            on: self.on.clone(),
        }
    }
}

/// Hands out alias names. One allocator is shared by every scope of a
/// compilation so that aliases never collide.
#[derive(Debug, Clone, Default)]
pub struct AliasAllocator {
    counters: HashMap<String, usize>,
}

impl AliasAllocator {
    /// `identityAlias`, then `identityAlias1`, `identityAlias2`, ...
    pub fn class_alias(&mut self, entity: &str) -> String {
        let base = format!("{}Alias", lower_first(entity));
        let count = self.counters.entry(base.clone()).or_insert(0);
        let alias = if *count == 0 {
            base
        } else {
            format!("{base}{count}")
        };
        *count += 1;
        alias
    }

    /// `identity_managerAlias0`, `identity_managerAlias1`, ...
    pub fn join_alias(&mut self, entity: &str, path: &str) -> String {
        let base = format!("{}_{}Alias", lower_first(entity), path.replace('.', "_"));
        let count = self.counters.entry(base.clone()).or_insert(0);
        let alias = format!("{base}{count}");
        *count += 1;
        alias
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinRegistry {
    joins: Vec<JoinDescriptor>,
}

impl JoinRegistry {
    /// Adds a join and returns its alias. Unless `spec.unique` is set, an
    /// existing join from the same source alias over the same property is
    /// reused as is.
    pub fn add_join(
        &mut self,
        allocator: &mut AliasAllocator,
        owner_entity: &str,
        path: &str,
        spec: JoinSpec,
    ) -> String {
        if !spec.unique
            && let Some(existing) = self.find(&spec.source_alias, &spec.property)
        {
            return existing.alias.clone();
        }

        let alias = allocator.join_alias(owner_entity, path);
        self.register(alias.clone(), spec);
        alias
    }

    /// Adds a join under a caller-chosen alias. Never memoized.
    pub fn register(&mut self, alias: String, spec: JoinSpec) {
        debug!(
            alias = %alias,
            source = %spec.source_alias,
            property = %spec.property,
            outer = spec.outer,
            "Adding join"
        );

        let on = Expr::binary(
            Expr::column(&spec.source_alias, &spec.source_column),
            BinaryOperator::Eq,
            Expr::column(&alias, &spec.target_column),
        );
        self.joins.push(JoinDescriptor {
            source_alias: spec.source_alias,
            property: spec.property,
            target_entity: spec.target_entity,
            table: spec.target_table,
            alias,
            outer: spec.outer,
            on,
        });
    }

    pub fn find(&self, source_alias: &str, property: &str) -> Option<&JoinDescriptor> {
        self.joins
            .iter()
            .find(|j| j.source_alias == source_alias && j.property == property)
    }

    pub fn joins(&self) -> &[JoinDescriptor] {
        &self.joins
    }

    pub fn has_outer_joins(&self) -> bool {
        self.joins.iter().any(|j| j.outer)
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn to_clauses(&self) -> Vec<JoinClause> {
        self.joins.iter().map(JoinDescriptor::to_clause).collect()
    }
}
