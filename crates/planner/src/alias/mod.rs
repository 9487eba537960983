//! Alias bookkeeping for a single compilation.
//!
//! An [`AliasContext`] is a stack of [`AliasScope`]s. The bottom scope is the
//! queried entity; subqueries and collection conditions push their own scope
//! and pop it when they are done. Property paths are resolved against the
//! top scope, creating joins for every association they traverse. Alias
//! names come from one allocator shared by the whole stack.

pub mod join;
pub mod scope;

use crate::{
    alias::{
        join::{AliasAllocator, JoinRegistry, JoinSpec},
        scope::{AliasScope, ScopeKind},
    },
    error::PlannerError,
    query::ast::expr::Expr,
    schema::{AssociationDef, AssociationKind, Member, Schema},
};
use std::collections::BTreeMap;

/// A property path resolved down to its last segment: `property` on the
/// entity `entity`, reachable through `alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRef {
    pub alias: String,
    pub entity: String,
    pub property: String,
}

#[derive(Debug)]
pub struct AliasContext<'s> {
    schema: &'s Schema,
    current: AliasScope,
    ancestors: Vec<AliasScope>,
    allocator: AliasAllocator,
}

impl<'s> AliasContext<'s> {
    pub fn new(schema: &'s Schema, entity: &str) -> Result<Self, PlannerError> {
        schema.entity(entity)?;
        let mut allocator = AliasAllocator::default();
        let alias = allocator.class_alias(entity);
        Ok(Self {
            schema,
            current: AliasScope::new(ScopeKind::Root, entity, &alias),
            ancestors: Vec::new(),
            allocator,
        })
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn current(&self) -> &AliasScope {
        &self.current
    }

    pub fn default_alias(&self) -> &str {
        &self.current.default_alias
    }

    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    fn scopes_innermost_first(&self) -> impl Iterator<Item = &AliasScope> {
        std::iter::once(&self.current).chain(self.ancestors.iter().rev())
    }

    /// The alias of `entity`, searching enclosing scopes too. A new alias is
    /// allocated and recorded in the current scope if there is none.
    pub fn get_alias(&mut self, entity: &str) -> String {
        if let Some(alias) = self.class_alias(entity) {
            return alias.to_string();
        }
        let alias = self.allocator.class_alias(entity);
        self.set_class_alias(entity, &alias);
        alias
    }

    pub fn class_alias(&self, entity: &str) -> Option<&str> {
        self.scopes_innermost_first()
            .find_map(|scope| scope.class_alias(entity))
    }

    pub fn set_class_alias(&mut self, entity: &str, alias: &str) {
        self.current
            .class_aliases
            .insert(entity.to_string(), alias.to_string());
    }

    /// Allocates a fresh alias for `entity` without recording it anywhere.
    pub fn allocate_alias(&mut self, entity: &str) -> String {
        self.allocator.class_alias(entity)
    }

    pub fn path_alias(&self, path: &str) -> Option<&str> {
        self.current.path_alias(path)
    }

    pub fn inside_or(&self) -> bool {
        self.current.inside_or
    }

    /// Sets the OR flag of the current scope, returning the previous value.
    fn set_inside_or(&mut self, inside_or: bool) -> bool {
        std::mem::replace(&mut self.current.inside_or, inside_or)
    }

    /// Runs `f` with the OR flag set to `inside_or`. The previous flag is
    /// restored whether or not `f` succeeds.
    pub fn with_inside_or<T>(&mut self, inside_or: bool, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = self.set_inside_or(inside_or);
        let out = f(self);
        self.set_inside_or(previous);
        out
    }

    /// A scope for a subquery over `entity`, with a freshly allocated alias.
    pub fn subquery_scope(&mut self, entity: &str) -> Result<AliasScope, PlannerError> {
        self.schema.entity(entity)?;
        let alias = self.allocator.class_alias(entity);
        Ok(AliasScope::new(ScopeKind::Subquery, entity, &alias))
    }

    /// A scope rooted at an already joined collection element.
    pub fn nested_scope(&self, entity: &str, alias: &str) -> AliasScope {
        let mut scope = AliasScope::new(ScopeKind::Nested, entity, alias);
        scope.inside_or = self.current.inside_or;
        scope
    }

    /// Runs `f` with `scope` pushed on top of the stack. The scope is popped
    /// afterwards, whether or not `f` succeeds, and handed back to the caller.
    pub fn with_scope<T>(
        &mut self,
        scope: AliasScope,
        f: impl FnOnce(&mut Self) -> T,
    ) -> (T, AliasScope) {
        let parent = std::mem::replace(&mut self.current, scope);
        self.ancestors.push(parent);
        let out = f(self);
        let finished = match self.ancestors.pop() {
            Some(parent) => std::mem::replace(&mut self.current, parent),
            None => std::mem::take(&mut self.current),
        };
        (out, finished)
    }

    /// The registry joins of the current scope are added to.
    fn registry_mut(&mut self) -> &mut JoinRegistry {
        if self.current.owns_from() {
            return &mut self.current.joins;
        }
        match self.ancestors.iter().rposition(AliasScope::owns_from) {
            Some(idx) => &mut self.ancestors[idx].joins,
            None => &mut self.current.joins,
        }
    }

    /// Adds a join, memoized per source alias and property unless
    /// `spec.unique` is set.
    pub fn add_join(&mut self, path: &str, spec: JoinSpec) -> String {
        let owner = self.current.entity.clone();
        let idx = if self.current.owns_from() {
            None
        } else {
            self.ancestors.iter().rposition(AliasScope::owns_from)
        };
        let registry = match idx {
            Some(idx) => &mut self.ancestors[idx].joins,
            None => &mut self.current.joins,
        };
        registry.add_join(&mut self.allocator, &owner, path, spec)
    }

    /// Adds a join under an alias the caller allocated.
    pub fn register_join(&mut self, alias: &str, spec: JoinSpec) {
        self.registry_mut().register(alias.to_string(), spec);
    }

    /// Qualifies `path` with the alias it would resolve through, without
    /// creating joins. Paths that have not been joined yet fall back to the
    /// default alias.
    pub fn substitute_alias(&self, path: &str) -> String {
        if let Some((prefix, last)) = path.rsplit_once('.')
            && let Some(alias) = self.current.path_alias(prefix)
        {
            return format!("{alias}.{last}");
        }
        format!("{}.{}", self.current.default_alias, path)
    }

    /// Resolves `path` down to the owner of its last segment, joining every
    /// association on the way.
    ///
    /// Joins are reused unless `force_unique` is set; they are outer joins
    /// when `force_outer` is set or the current scope is inside an `OR`.
    pub fn resolve_path(
        &mut self,
        path: &str,
        force_unique: bool,
        force_outer: bool,
    ) -> Result<PropertyRef, PlannerError> {
        let schema = self.schema;
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(PlannerError::UnknownProperty {
                entity: self.current.entity.clone(),
                property: path.to_string(),
            });
        }

        let is_class_ref = segments.len() > 1
            && segments[0].starts_with(|c: char| c.is_ascii_uppercase())
            && schema.contains(segments[0]);

        let (mut alias, mut entity, mut prefix, rest) = if is_class_ref {
            let alias = self
                .class_alias(segments[0])
                .ok_or_else(|| PlannerError::UnjoinedEntity(segments[0].to_string()))?
                .to_string();
            (alias, segments[0].to_string(), segments[0].to_string(), &segments[1..])
        } else {
            (
                self.current.default_alias.clone(),
                self.current.entity.clone(),
                String::new(),
                &segments[..],
            )
        };

        let Some((last, hops)) = rest.split_last() else {
            return Err(PlannerError::UnknownProperty {
                entity,
                property: path.to_string(),
            });
        };

        let outer = force_outer || self.current.inside_or;
        for hop in hops {
            let def = schema.entity(&entity)?;
            let assoc = def
                .association(hop)
                .ok_or_else(|| PlannerError::UnknownProperty {
                    entity: entity.clone(),
                    property: hop.to_string(),
                })?;
            prefix = if prefix.is_empty() {
                hop.to_string()
            } else {
                format!("{prefix}.{hop}")
            };

            let known = if force_unique {
                None
            } else {
                self.current.path_alias(&prefix).map(str::to_string)
            };
            alias = match known {
                Some(alias) => alias,
                None => {
                    let spec =
                        association_join(schema, &alias, &entity, hop, assoc, outer, force_unique)?;
                    let joined = self.add_join(&prefix, spec);
                    if !force_unique {
                        self.current
                            .path_aliases
                            .insert(prefix.clone(), joined.clone());
                    }
                    joined
                }
            };
            entity = assoc.target.clone();
        }

        Ok(PropertyRef {
            alias,
            entity,
            property: last.to_string(),
        })
    }

    /// Resolves `path` to a column expression. A many-to-one association
    /// resolves to its foreign key column.
    pub fn substitute_alias_with(
        &mut self,
        path: &str,
        force_unique: bool,
        force_outer: bool,
    ) -> Result<Expr, PlannerError> {
        let resolved = self.resolve_path(path, force_unique, force_outer)?;
        self.column(&resolved)
    }

    pub fn column(&self, resolved: &PropertyRef) -> Result<Expr, PlannerError> {
        let column = self.column_name(resolved)?;
        Ok(Expr::column(&resolved.alias, &column))
    }

    pub fn column_name(&self, resolved: &PropertyRef) -> Result<String, PlannerError> {
        let def = self.schema.entity(&resolved.entity)?;
        match def.member(&resolved.property) {
            Some(Member::Column(column)) => Ok(column.to_string()),
            Some(Member::Association(assoc)) if assoc.kind == AssociationKind::ManyToOne => {
                Ok(assoc.column.clone())
            }
            Some(Member::Association(_)) => Err(PlannerError::UnsupportedOperation {
                op: "comparison".to_string(),
                property: resolved.property.clone(),
                reason: "a collection has no column".to_string(),
            }),
            None => Err(PlannerError::UnknownProperty {
                entity: resolved.entity.clone(),
                property: resolved.property.clone(),
            }),
        }
    }

    /// Joined paths of the root scope, plus each class alias under its
    /// entity name.
    pub fn alias_map(&self) -> BTreeMap<String, String> {
        let root = self.ancestors.first().unwrap_or(&self.current);
        let mut map = root.path_aliases.clone();
        for (entity, alias) in &root.class_aliases {
            map.insert(entity.clone(), alias.clone());
        }
        map
    }

    /// Consumes the context, returning the root scope.
    pub fn into_root(mut self) -> AliasScope {
        if self.ancestors.is_empty() {
            self.current
        } else {
            self.ancestors.swap_remove(0)
        }
    }
}

/// The join that follows `assoc` from `source_alias`.
pub fn association_join(
    schema: &Schema,
    source_alias: &str,
    source_entity: &str,
    property: &str,
    assoc: &AssociationDef,
    outer: bool,
    unique: bool,
) -> Result<JoinSpec, PlannerError> {
    let source = schema.entity(source_entity)?;
    let target = schema.entity(&assoc.target)?;
    let (source_column, target_column) = match assoc.kind {
        AssociationKind::ManyToOne => (assoc.column.clone(), target.id_column.clone()),
        AssociationKind::OneToMany => (source.id_column.clone(), assoc.column.clone()),
    };
    Ok(JoinSpec {
        source_alias: source_alias.to_string(),
        source_column,
        property: property.to_string(),
        target_entity: assoc.target.clone(),
        target_table: target.table.clone(),
        target_column,
        outer,
        unique,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EntityDef;
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        Schema::new()
            .with_entity(
                "Identity",
                EntityDef::new("identities")
                    .property("name")
                    .many_to_one("manager", "Identity", "manager_id")
                    .one_to_many("links", "Link", "identity_id"),
            )
            .with_entity(
                "Link",
                EntityDef::new("links")
                    .property("value")
                    .many_to_one("application", "Application", "application_id"),
            )
            .with_entity("Application", EntityDef::new("applications").property("name"))
    }

    #[test]
    fn test_same_path_same_alias() {
        let schema = schema();
        let mut ctx = AliasContext::new(&schema, "Identity").unwrap();

        let a = ctx.resolve_path("manager.name", false, false).unwrap();
        let b = ctx.resolve_path("manager.manager.name", false, false).unwrap();
        let c = ctx.resolve_path("manager.name", false, false).unwrap();

        assert_eq!(a.alias, "identity_managerAlias0");
        assert_eq!(b.alias, "identity_manager_managerAlias0");
        assert_eq!(a, c);
        assert_eq!(ctx.current().joins().joins().len(), 2);
        assert_eq!(ctx.path_alias("manager"), Some("identity_managerAlias0"));
    }

    #[test]
    fn test_inside_or_forces_outer_join() {
        let schema = schema();
        let mut ctx = AliasContext::new(&schema, "Identity").unwrap();

        ctx.with_inside_or(true, |ctx| ctx.resolve_path("manager.name", false, false))
            .unwrap();

        assert!(!ctx.inside_or());
        assert!(ctx.current().joins().joins()[0].outer);
    }

    #[test]
    fn test_inside_or_restored_on_error() {
        let schema = schema();
        let mut ctx = AliasContext::new(&schema, "Identity").unwrap();

        let result = ctx.with_inside_or(true, |ctx| ctx.resolve_path("nope.name", false, false));

        assert!(result.is_err());
        assert!(!ctx.inside_or());
        let resolved = ctx.resolve_path("manager.name", false, false).unwrap();
        assert_eq!(resolved.alias, "identity_managerAlias0");
        assert!(!ctx.current().joins().joins()[0].outer);
    }

    #[test]
    fn test_unique_joins_are_not_remembered() {
        let schema = schema();
        let mut ctx = AliasContext::new(&schema, "Identity").unwrap();

        let a = ctx.resolve_path("links.value", true, false).unwrap();
        let b = ctx.resolve_path("links.value", true, false).unwrap();

        assert_ne!(a.alias, b.alias);
        assert_eq!(ctx.path_alias("links"), None);
    }

    #[test]
    fn test_subquery_scope_is_popped() {
        let schema = schema();
        let mut ctx = AliasContext::new(&schema, "Identity").unwrap();

        let scope = ctx.subquery_scope("Identity").unwrap();
        let (resolved, finished) = ctx.with_scope(scope, |ctx| {
            assert_eq!(ctx.depth(), 1);
            ctx.resolve_path("manager.name", false, false)
        });

        let resolved = resolved.unwrap();
        assert_eq!(finished.default_alias, "identityAlias1");
        assert_eq!(finished.joins().joins().len(), 1);
        assert_eq!(resolved.alias, "identity_managerAlias0");
        assert_eq!(ctx.depth(), 0);
        assert!(ctx.current().joins().is_empty());
    }

    #[test]
    fn test_scope_is_popped_on_error() {
        let schema = schema();
        let mut ctx = AliasContext::new(&schema, "Identity").unwrap();

        let scope = ctx.subquery_scope("Link").unwrap();
        let (result, _) = ctx.with_scope(scope, |ctx| ctx.resolve_path("nope.value", false, false));

        assert!(matches!(
            result,
            Err(PlannerError::UnknownProperty { entity, property }) if entity == "Link" && property == "nope"
        ));
        assert_eq!(ctx.default_alias(), "identityAlias");
    }

    #[test]
    fn test_nested_scope_joins_land_in_enclosing_query() {
        let schema = schema();
        let mut ctx = AliasContext::new(&schema, "Identity").unwrap();

        let owner = ctx.resolve_path("links", false, false).unwrap();
        let spec = association_join(
            &schema,
            &owner.alias,
            &owner.entity,
            "links",
            schema.entity("Identity").unwrap().association("links").unwrap(),
            false,
            true,
        )
        .unwrap();
        let element = ctx.add_join("links", spec);
        let scope = ctx.nested_scope("Link", &element);
        let (column, _) = ctx.with_scope(scope, |ctx| {
            ctx.substitute_alias_with("application.name", false, false)
        });

        assert_eq!(
            column.unwrap(),
            Expr::column("link_applicationAlias0", "name")
        );
        assert_eq!(ctx.current().joins().joins().len(), 2);
    }

    #[test]
    fn test_class_reference_paths() {
        let schema = schema();
        let mut ctx = AliasContext::new(&schema, "Identity").unwrap();

        let own = ctx.substitute_alias_with("Identity.name", false, false).unwrap();
        assert_eq!(own, Expr::column("identityAlias", "name"));

        assert!(matches!(
            ctx.resolve_path("Application.name", false, false),
            Err(PlannerError::UnjoinedEntity(e)) if e == "Application"
        ));

        let alias = ctx.get_alias("Application");
        assert_eq!(alias, "applicationAlias");
        let joined = ctx.substitute_alias_with("Application.name", false, false).unwrap();
        assert_eq!(joined, Expr::column("applicationAlias", "name"));
    }

    #[test]
    fn test_substitute_alias_without_joining() {
        let schema = schema();
        let mut ctx = AliasContext::new(&schema, "Identity").unwrap();

        assert_eq!(ctx.substitute_alias("manager.name"), "identityAlias.manager.name");
        ctx.resolve_path("manager.name", false, false).unwrap();
        assert_eq!(ctx.substitute_alias("manager.name"), "identity_managerAlias0.name");
        assert!(ctx.current().joins().joins().len() == 1);
    }

    #[test]
    fn test_collection_has_no_column() {
        let schema = schema();
        let mut ctx = AliasContext::new(&schema, "Identity").unwrap();

        assert!(matches!(
            ctx.substitute_alias_with("links", false, false),
            Err(PlannerError::UnsupportedOperation { .. })
        ));
        assert_eq!(
            ctx.substitute_alias_with("manager", false, false).unwrap(),
            Expr::column("identityAlias", "manager_id")
        );
    }
}
