//! Translates a filter tree into a `WHERE` condition.

use crate::{
    alias::{AliasContext, association_join, join::JoinSpec},
    compiler::escape::{ESCAPE_CHAR, escape_like},
    error::PlannerError,
    query::{
        ast::{
            common::TableRef,
            expr::{BinaryOperator, Expr},
            select::Select,
        },
        builder::select::SelectBuilder,
        capabilities::DialectCapabilities,
    },
    schema::{AssociationDef, AssociationKind, Member},
};
use model::{
    core::value::Value,
    filter::{
        node::{CompositeFilter, FilterNode, LeafFilter},
        operation::{BooleanOp, Operation},
    },
};
use tracing::warn;

/// Longest `IN` list emitted; longer lists become OR-ed chunks since some
/// backends cap the number of list entries.
pub const MAX_IN_LIST: usize = 100;

/// What a subtree contributes to the condition.
#[derive(Debug, Clone, PartialEq)]
enum Fragment {
    Predicate(Expr),
    /// Matches every row.
    AlwaysTrue,
    /// Adds no condition at all (e.g. an explicit join).
    Empty,
}

impl Fragment {
    fn from_expr(expr: Option<Expr>) -> Self {
        expr.map_or(Fragment::Empty, Fragment::Predicate)
    }
}

/// The single column a subquery selects.
enum Projection<'a> {
    Property(&'a str),
    Column(&'a str),
}

pub struct FilterCompiler<'c, 's> {
    ctx: &'c mut AliasContext<'s>,
    caps: &'c DialectCapabilities,

    /// Request-wide case-insensitive matching.
    ignore_case: bool,
}

impl<'c, 's> FilterCompiler<'c, 's> {
    pub fn new(
        ctx: &'c mut AliasContext<'s>,
        caps: &'c DialectCapabilities,
        ignore_case: bool,
    ) -> Self {
        Self {
            ctx,
            caps,
            ignore_case,
        }
    }

    /// Compiles `filter`; `None` means the query needs no `WHERE` clause.
    pub fn compile(&mut self, filter: Option<&FilterNode>) -> Result<Option<Expr>, PlannerError> {
        let Some(node) = filter else {
            return Ok(None);
        };
        Ok(match self.visit(node)? {
            Fragment::Predicate(expr) => Some(expr),
            Fragment::AlwaysTrue | Fragment::Empty => None,
        })
    }

    fn visit(&mut self, node: &FilterNode) -> Result<Fragment, PlannerError> {
        match node {
            FilterNode::Leaf(leaf) => self.visit_leaf(leaf),
            FilterNode::Composite(composite) => self.visit_composite(composite),
        }
    }

    fn visit_composite(&mut self, composite: &CompositeFilter) -> Result<Fragment, PlannerError> {
        match composite.op {
            BooleanOp::And => {
                let mut parts = Vec::with_capacity(composite.children.len());
                let mut tautology = false;
                for child in &composite.children {
                    match self.visit(child)? {
                        Fragment::Predicate(expr) => parts.push(expr),
                        Fragment::AlwaysTrue => tautology = true,
                        Fragment::Empty => {}
                    }
                }
                Ok(match Expr::and(parts) {
                    Some(expr) => Fragment::Predicate(expr),
                    None if tautology || composite.children.is_empty() => Fragment::AlwaysTrue,
                    None => Fragment::Empty,
                })
            }
            BooleanOp::Or => {
                let (caps, ignore_case) = (self.caps, self.ignore_case);
                self.ctx.with_inside_or(true, |ctx| {
                    FilterCompiler::new(ctx, caps, ignore_case).visit_disjuncts(&composite.children)
                })
            }
            BooleanOp::Not => {
                let [child] = composite.children.as_slice() else {
                    return Err(model::error::ModelError::InvalidArity {
                        op: BooleanOp::Not,
                        found: composite.children.len(),
                    }
                    .into());
                };
                Ok(match self.visit(child)? {
                    Fragment::Predicate(expr) => Fragment::Predicate(Expr::Not(Box::new(expr))),
                    Fragment::AlwaysTrue => Fragment::Predicate(Expr::Never),
                    Fragment::Empty => Fragment::Empty,
                })
            }
        }
    }

    /// An empty disjunction matches nothing. Children that only add a join
    /// are skipped.
    fn visit_disjuncts(&mut self, children: &[FilterNode]) -> Result<Fragment, PlannerError> {
        if children.is_empty() {
            return Ok(Fragment::Predicate(Expr::Never));
        }
        let mut parts = Vec::with_capacity(children.len());
        for child in children {
            match self.visit(child)? {
                Fragment::Predicate(expr) => parts.push(expr),
                Fragment::AlwaysTrue => return Ok(Fragment::AlwaysTrue),
                Fragment::Empty => {}
            }
        }
        Ok(Fragment::from_expr(Expr::or(parts)))
    }

    fn visit_leaf(&mut self, leaf: &LeafFilter) -> Result<Fragment, PlannerError> {
        match leaf.op {
            Operation::Join | Operation::LeftJoin => self.visit_join(leaf),
            Operation::Subquery => self.visit_subquery(leaf),
            Operation::CollectionCondition => self.visit_collection_condition(leaf),
            Operation::IsNull | Operation::NotNull => {
                let column = self.ctx.substitute_alias_with(&leaf.property, false, false)?;
                Ok(Fragment::Predicate(Expr::IsNull {
                    expr: Box::new(column),
                    negated: leaf.op == Operation::NotNull,
                }))
            }
            Operation::IsEmpty => self.visit_is_empty(leaf),
            _ => {
                let value = match leaf.value.resolve() {
                    Ok(value) => value,
                    Err(err) => {
                        warn!(
                            property = %leaf.property,
                            op = %leaf.op,
                            error = %err,
                            "Filter value could not be read, leaf matches nothing"
                        );
                        return Ok(Fragment::Predicate(Expr::Never));
                    }
                };
                match leaf.op {
                    Operation::Like => self.visit_like(leaf, value),
                    Operation::In => self.visit_in(leaf, value),
                    Operation::ContainsAll => self.visit_contains_all(leaf, value),
                    _ => self.visit_comparison(leaf, value),
                }
            }
        }
    }

    /// Whether string comparisons on `leaf` have to be case-folded.
    fn folds_case(&self, leaf: &LeafFilter, value: &Value) -> bool {
        (leaf.ignore_case || self.ignore_case)
            && value.is_string()
            && leaf.property != "id"
            && !leaf.property.ends_with(".id")
            && !self.caps.case_insensitive
    }

    fn visit_comparison(
        &mut self,
        leaf: &LeafFilter,
        value: Value,
    ) -> Result<Fragment, PlannerError> {
        let op = match leaf.op {
            Operation::Eq => BinaryOperator::Eq,
            Operation::Ne => BinaryOperator::NotEq,
            Operation::Gt => BinaryOperator::Gt,
            Operation::Ge => BinaryOperator::GtEq,
            Operation::Lt => BinaryOperator::Lt,
            Operation::Le => BinaryOperator::LtEq,
            other => return Err(unsupported(leaf, other, "not a comparison")),
        };
        if matches!(value, Value::List(_)) {
            return Err(unsupported(leaf, leaf.op, "expects a single value"));
        }

        let column = self.ctx.substitute_alias_with(&leaf.property, false, false)?;
        if value.is_null() {
            return match op {
                BinaryOperator::Eq | BinaryOperator::NotEq => Ok(Fragment::Predicate(Expr::IsNull {
                    expr: Box::new(column),
                    negated: op == BinaryOperator::NotEq,
                })),
                _ => Err(unsupported(leaf, leaf.op, "cannot order against null")),
            };
        }

        let fold = self.folds_case(leaf, &value);
        Ok(Fragment::Predicate(Expr::binary(
            upper_if(fold, column),
            op,
            upper_if(fold, Expr::Value(value)),
        )))
    }

    fn visit_like(&mut self, leaf: &LeafFilter, value: Value) -> Result<Fragment, PlannerError> {
        let Some(raw) = value.as_string() else {
            return Err(unsupported(leaf, leaf.op, "expects a single value"));
        };
        let escaped = escape_like(&raw, self.caps);
        let pattern = leaf.match_mode.unwrap_or_default().apply(&escaped.text);

        let column = self.ctx.substitute_alias_with(&leaf.property, false, false)?;
        let fold = self.folds_case(leaf, &Value::String(raw));
        Ok(Fragment::Predicate(Expr::Like {
            expr: Box::new(upper_if(fold, column)),
            pattern: Box::new(upper_if(fold, Expr::Value(Value::String(pattern)))),
            escape: escaped.needs_escape_clause.then_some(ESCAPE_CHAR),
        }))
    }

    fn visit_in(&mut self, leaf: &LeafFilter, value: Value) -> Result<Fragment, PlannerError> {
        let items: Vec<Value> = match value {
            Value::Null => Vec::new(),
            Value::List(items) => items,
            single => vec![single],
        };
        if items.is_empty() {
            return Ok(Fragment::Predicate(Expr::Never));
        }

        let fold = self.folds_case(leaf, &items[0]);
        let column = upper_if(
            fold,
            self.ctx.substitute_alias_with(&leaf.property, false, false)?,
        );
        let mut chunks: Vec<Expr> = items
            .chunks(MAX_IN_LIST)
            .map(|chunk| Expr::InList {
                expr: Box::new(column.clone()),
                list: chunk
                    .iter()
                    .map(|item| upper_if(fold, Expr::Value(item.clone())))
                    .collect(),
                negated: false,
            })
            .collect();
        Ok(Fragment::Predicate(if chunks.len() == 1 {
            chunks.remove(0)
        } else {
            Expr::Or(chunks)
        }))
    }

    /// Every value has to match its own element of the collection, so each
    /// one gets a separate join.
    fn visit_contains_all(
        &mut self,
        leaf: &LeafFilter,
        value: Value,
    ) -> Result<Fragment, PlannerError> {
        let items: Vec<Value> = match value {
            Value::Null => Vec::new(),
            Value::List(items) => items,
            single => vec![single],
        };
        let unique = requires_unique_join(&leaf.property);

        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let column = self.ctx.substitute_alias_with(&leaf.property, unique, false)?;
            let fold = self.folds_case(leaf, &item);
            parts.push(Expr::binary(
                upper_if(fold, column),
                BinaryOperator::Eq,
                upper_if(fold, Expr::Value(item)),
            ));
        }
        Ok(Expr::and(parts).map_or(Fragment::AlwaysTrue, Fragment::Predicate))
    }

    fn visit_is_empty(&mut self, leaf: &LeafFilter) -> Result<Fragment, PlannerError> {
        let schema = self.ctx.schema();
        let owner = self.ctx.resolve_path(&leaf.property, false, false)?;
        let owner_def = schema.entity(&owner.entity)?;

        match owner_def.member(&owner.property) {
            Some(Member::Association(assoc)) if assoc.kind == AssociationKind::OneToMany => {
                let target = schema.entity(&assoc.target)?;
                let alias = self.ctx.allocate_alias(&assoc.target);
                let subquery = SelectBuilder::new()
                    .select(vec![Expr::Literal("1".to_string())])
                    .from(TableRef::new(&target.table), &alias)
                    .where_clause(Some(Expr::binary(
                        Expr::column(&alias, &assoc.column),
                        BinaryOperator::Eq,
                        Expr::column(&owner.alias, &owner_def.id_column),
                    )))
                    .build();
                Ok(Fragment::Predicate(Expr::Exists {
                    subquery: Box::new(subquery),
                    negated: true,
                }))
            }
            _ => {
                let column = self.ctx.column(&owner)?;
                Ok(Fragment::Predicate(Expr::IsNull {
                    expr: Box::new(column),
                    negated: false,
                }))
            }
        }
    }

    /// An explicit join to `Entity.property`. The joined entity becomes
    /// available to later `Entity.x` references; the leaf adds no condition.
    fn visit_join(&mut self, leaf: &LeafFilter) -> Result<Fragment, PlannerError> {
        let schema = self.ctx.schema();
        let target_path = leaf
            .join_property
            .as_deref()
            .ok_or_else(|| missing(leaf, "join property"))?;
        let Some((entity, property)) = target_path.split_once('.') else {
            return Err(unsupported(leaf, leaf.op, "join target must be Entity.property"));
        };
        let target = schema.entity(entity)?;
        let target_column = match target.member(property) {
            Some(Member::Column(column)) => column.to_string(),
            Some(Member::Association(assoc)) if assoc.kind == AssociationKind::ManyToOne => {
                assoc.column.clone()
            }
            _ => {
                return Err(PlannerError::UnknownProperty {
                    entity: entity.to_string(),
                    property: property.to_string(),
                });
            }
        };

        let source = self.ctx.resolve_path(&leaf.property, false, false)?;
        let source_column = self.ctx.column_name(&source)?;
        let alias = self.ctx.allocate_alias(entity);
        self.ctx.set_class_alias(entity, &alias);
        self.ctx.register_join(
            &alias,
            JoinSpec {
                source_alias: source.alias,
                source_column,
                property: target_path.to_string(),
                target_entity: entity.to_string(),
                target_table: target.table.clone(),
                target_column,
                outer: leaf.op == Operation::LeftJoin,
                unique: true,
            },
        );
        Ok(Fragment::Empty)
    }

    fn visit_subquery(&mut self, leaf: &LeafFilter) -> Result<Fragment, PlannerError> {
        let subquery = leaf
            .subquery
            .as_ref()
            .ok_or_else(|| missing(leaf, "subquery"))?;
        let column = self.ctx.substitute_alias_with(&leaf.property, false, false)?;

        let scope = self.ctx.subquery_scope(&subquery.entity)?;
        let (caps, ignore_case) = (self.caps, self.ignore_case);
        let (select, _) = self.ctx.with_scope(scope, |ctx| {
            FilterCompiler::new(ctx, caps, ignore_case).scoped_select(
                Projection::Property(&subquery.select),
                subquery.filter.as_deref(),
            )
        });

        Ok(Fragment::Predicate(Expr::InSubquery {
            expr: Box::new(column),
            subquery: Box::new(select?),
            negated: false,
        }))
    }

    /// A condition every part of which has to hold for the same element of a
    /// collection. Positive parts are evaluated over a join to the element;
    /// negated parts become a `NOT IN` subquery over the element type, with
    /// their logic inverted.
    fn visit_collection_condition(&mut self, leaf: &LeafFilter) -> Result<Fragment, PlannerError> {
        let schema = self.ctx.schema();
        let condition = leaf
            .collection_condition
            .as_deref()
            .ok_or_else(|| missing(leaf, "collection condition"))?;

        let owner = self.ctx.resolve_path(&leaf.property, false, false)?;
        let owner_def = schema.entity(&owner.entity)?;
        let assoc: &AssociationDef = match owner_def.member(&owner.property) {
            Some(Member::Association(assoc)) if assoc.kind == AssociationKind::OneToMany => assoc,
            _ => {
                return Err(unsupported(
                    leaf,
                    leaf.op,
                    "not a one-to-many association",
                ));
            }
        };

        let split = split_condition(leaf, condition)?;
        let (caps, ignore_case) = (self.caps, self.ignore_case);
        let mut parts = Vec::with_capacity(2);

        if let Some(positive) = &split.positive {
            let outer = split.connective == BooleanOp::Or || self.ctx.inside_or();
            let spec = association_join(
                schema,
                &owner.alias,
                &owner.entity,
                &owner.property,
                assoc,
                outer,
                true,
            )?;
            let element = self.ctx.add_join(&leaf.property, spec);
            let scope = self.ctx.nested_scope(&assoc.target, &element);
            let (fragment, _) = self.ctx.with_scope(scope, |ctx| {
                FilterCompiler::new(ctx, caps, ignore_case).visit(positive)
            });
            if let Fragment::Predicate(expr) = fragment? {
                parts.push(expr);
            }
        }

        if let Some(negative) = &split.negative {
            let scope = self.ctx.subquery_scope(&assoc.target)?;
            let (select, _) = self.ctx.with_scope(scope, |ctx| {
                FilterCompiler::new(ctx, caps, ignore_case)
                    .scoped_select(Projection::Column(&assoc.column), Some(negative))
            });
            parts.push(Expr::InSubquery {
                expr: Box::new(Expr::column(&owner.alias, &owner_def.id_column)),
                subquery: Box::new(select?),
                negated: true,
            });
        }

        Ok(Fragment::from_expr(match split.connective {
            BooleanOp::Or => Expr::or(parts),
            _ => Expr::and(parts),
        }))
    }

    /// Builds the `SELECT` of the current (subquery) scope.
    fn scoped_select(
        &mut self,
        projection: Projection<'_>,
        filter: Option<&FilterNode>,
    ) -> Result<Select, PlannerError> {
        let where_clause = self.compile(filter)?;
        let column = match projection {
            Projection::Property(path) => self.ctx.substitute_alias_with(path, false, false)?,
            Projection::Column(column) => Expr::column(self.ctx.default_alias(), column),
        };

        let scope = self.ctx.current();
        let table = &self.ctx.schema().entity(&scope.entity)?.table;
        Ok(SelectBuilder::new()
            .select(vec![column])
            .from(TableRef::new(table), &scope.default_alias)
            .joins(scope.joins().to_clauses())
            .where_clause(where_clause)
            .build())
    }
}

fn upper_if(fold: bool, expr: Expr) -> Expr {
    if fold {
        Expr::function("UPPER", vec![expr])
    } else {
        expr
    }
}

/// Dotted paths need their own join per value, except `Entity.property`
/// class references.
fn requires_unique_join(property: &str) -> bool {
    let dots = property.matches('.').count();
    !(dots == 0 || (dots == 1 && property.starts_with(|c: char| c.is_ascii_uppercase())))
}

fn unsupported(leaf: &LeafFilter, op: Operation, reason: &str) -> PlannerError {
    PlannerError::UnsupportedOperation {
        op: op.to_string(),
        property: leaf.property.clone(),
        reason: reason.to_string(),
    }
}

fn missing(leaf: &LeafFilter, what: &'static str) -> PlannerError {
    PlannerError::MissingOperand {
        op: leaf.op.to_string(),
        property: leaf.property.clone(),
        missing: what,
    }
}

struct SplitCondition {
    connective: BooleanOp,
    positive: Option<FilterNode>,
    negative: Option<FilterNode>,
}

fn is_negation(node: &FilterNode) -> bool {
    match node {
        FilterNode::Composite(composite) => composite.op == BooleanOp::Not,
        FilterNode::Leaf(leaf) => matches!(leaf.op, Operation::Ne | Operation::NotNull),
    }
}

/// The condition that selects exactly the rows a negation rejects.
fn invert(owner: &LeafFilter, node: &FilterNode) -> Result<FilterNode, PlannerError> {
    match node {
        FilterNode::Leaf(leaf) => {
            let op = leaf
                .op
                .inverse()
                .ok_or_else(|| unsupported(owner, leaf.op, "has no inverse"))?;
            let mut inverted = leaf.clone();
            inverted.op = op;
            Ok(FilterNode::Leaf(inverted))
        }
        FilterNode::Composite(composite) => match composite.children.as_slice() {
            [child] => Ok(child.clone()),
            children => Err(model::error::ModelError::InvalidArity {
                op: composite.op,
                found: children.len(),
            }
            .into()),
        },
    }
}

fn split_condition(
    owner: &LeafFilter,
    condition: &FilterNode,
) -> Result<SplitCondition, PlannerError> {
    let composite = match condition {
        FilterNode::Composite(composite) => composite.clone(),
        FilterNode::Leaf(_) => CompositeFilter {
            op: BooleanOp::And,
            children: vec![condition.clone()],
        },
    };

    if composite.op == BooleanOp::Not {
        return Ok(SplitCondition {
            connective: BooleanOp::And,
            positive: None,
            negative: Some(FilterNode::or(composite.children)),
        });
    }

    let (negations, others): (Vec<FilterNode>, Vec<FilterNode>) =
        composite.children.into_iter().partition(is_negation);

    let positive = (!others.is_empty()).then(|| {
        FilterNode::Composite(CompositeFilter {
            op: composite.op,
            children: others,
        })
    });

    let negative = if negations.is_empty() {
        None
    } else {
        let inverted = negations
            .iter()
            .map(|node| invert(owner, node))
            .collect::<Result<Vec<_>, _>>()?;
        // (a != x AND b != y) is NOT (a = x OR b = y).
        let op = if composite.op == BooleanOp::And {
            BooleanOp::Or
        } else {
            BooleanOp::And
        };
        Some(FilterNode::Composite(CompositeFilter {
            op,
            children: inverted,
        }))
    };

    Ok(SplitCondition {
        connective: composite.op,
        positive,
        negative,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_unique_join() {
        assert!(!requires_unique_join("name"));
        assert!(!requires_unique_join("Identity.name"));
        assert!(requires_unique_join("links.value"));
        assert!(requires_unique_join("Identity.links.value"));
    }

    #[test]
    fn test_split_condition_inverts_negations() {
        let owner = LeafFilter::new("links", Operation::CollectionCondition, Default::default());
        let condition = FilterNode::and(vec![
            FilterNode::eq("application.name", "AD"),
            FilterNode::ne("value", "x"),
            FilterNode::not(FilterNode::is_null("nativeId")),
        ]);

        let split = split_condition(&owner, &condition).unwrap();
        assert_eq!(split.connective, BooleanOp::And);
        assert_eq!(
            split.positive,
            Some(FilterNode::and(vec![FilterNode::eq("application.name", "AD")]))
        );
        assert_eq!(
            split.negative,
            Some(FilterNode::or(vec![
                FilterNode::eq("value", "x"),
                FilterNode::is_null("nativeId"),
            ]))
        );
    }

    #[test]
    fn test_split_condition_without_inverse() {
        let owner = LeafFilter::new("links", Operation::CollectionCondition, Default::default());
        let condition = FilterNode::not(FilterNode::like("value", "x"));
        // A NOT around the whole condition is handled without inverting.
        assert!(split_condition(&owner, &condition).is_ok());

        let condition = FilterNode::and(vec![
            FilterNode::eq("value", "a"),
            FilterNode::Composite(CompositeFilter {
                op: BooleanOp::Not,
                children: vec![],
            }),
        ]);
        assert!(split_condition(&owner, &condition).is_err());
    }
}
