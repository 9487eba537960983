//! Rewrite pass run before compilation.
//!
//! Two rewrites exist. Inside a collection condition, an `OR` of equalities
//! on one property collapses into a single `IN`; `disable_optimizer` turns
//! this off. The group flag rewrite always runs: a subtree that accepts both
//! values of the flag (`IN(flag, [true, false])`, or `EQ(flag, true)` and
//! `EQ(flag, false)` side by side in one `OR`) matches every row and is
//! dropped. When the flag is never queried and groups are excluded by
//! default, the default group filter is AND-ed on.

use crate::settings::{CompilerSettings, GroupFlagSettings};
use model::{
    core::value::Value,
    filter::{
        node::{CompositeFilter, FilterNode, LeafFilter},
        operation::{BooleanOp, Operation},
    },
};
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Rewritten {
    /// The subtree matches every row.
    AlwaysTrue,
    Node(FilterNode),
}

/// Applies the rewrites for a query over `entity`.
pub fn optimize(
    filter: Option<&FilterNode>,
    entity: &str,
    settings: &CompilerSettings,
) -> Option<FilterNode> {
    let filter = match filter {
        Some(node) if !settings.disable_optimizer => Some(collapse_equalities(node)),
        other => other.cloned(),
    };

    let Some(flag) = settings.group_flag_for(entity) else {
        return filter;
    };

    let rewritten = filter
        .as_ref()
        .and_then(|node| match rewrite(node, &flag.property) {
            Rewritten::AlwaysTrue => {
                debug!(flag = %flag.property, "Group flag filter matches every row, dropped");
                None
            }
            Rewritten::Node(node) => Some(node),
        });

    if !flag.exclude_groups_by_default {
        return rewritten;
    }

    let queried = filter.as_ref().map(queried_properties).unwrap_or_default();
    if queried.contains(&flag.property) {
        return rewritten;
    }

    let default_filter = default_group_filter(flag);
    debug!(flag = %flag.property, "Excluding groups by default");
    Some(match rewritten {
        None => default_filter,
        Some(FilterNode::Composite(CompositeFilter {
            op: BooleanOp::And,
            mut children,
        })) => {
            children.push(default_filter);
            FilterNode::and(children)
        }
        Some(node) => FilterNode::and(vec![node, default_filter]),
    })
}

/// Collapses the collection conditions anywhere in `node`.
pub fn collapse_equalities(node: &FilterNode) -> FilterNode {
    match node {
        FilterNode::Composite(composite) => FilterNode::Composite(CompositeFilter {
            op: composite.op,
            children: composite.children.iter().map(collapse_equalities).collect(),
        }),
        FilterNode::Leaf(leaf) => {
            let Some(collapsed) = leaf
                .collection_condition
                .as_deref()
                .and_then(collapse_disjunction)
            else {
                return node.clone();
            };
            let mut leaf = leaf.clone();
            leaf.collection_condition = Some(Box::new(collapsed));
            FilterNode::Leaf(leaf)
        }
    }
}

/// `OR(EQ(p, a), EQ(p, b))` becomes `OR(IN(p, [a, b]))`. The leaves keep
/// their case folding. Anything else, including a `null` operand, is left
/// alone.
fn collapse_disjunction(condition: &FilterNode) -> Option<FilterNode> {
    let FilterNode::Composite(CompositeFilter {
        op: BooleanOp::Or,
        children,
    }) = condition
    else {
        return None;
    };
    let property = &children.first()?.as_leaf()?.property;

    let mut values = Vec::with_capacity(children.len());
    let mut ignore_case = false;
    for child in children {
        let leaf = child.as_leaf()?;
        if leaf.op != Operation::Eq || &leaf.property != property {
            return None;
        }
        match leaf.value.resolve().ok()? {
            Value::List(_) | Value::Null => return None,
            value => values.push(value),
        }
        ignore_case |= leaf.ignore_case;
    }

    debug!(property = %property, values = values.len(), "Collapsed equalities into IN");
    let mut collapsed = FilterNode::in_list(property.as_str(), values);
    if ignore_case {
        collapsed = collapsed.ignore_case();
    }
    Some(FilterNode::or(vec![collapsed]))
}

/// The filter that hides groups: `NE(flag, true)`, or `EQ(flag, false)` when
/// configured.
pub fn default_group_filter(flag: &GroupFlagSettings) -> FilterNode {
    if flag.use_eq_false {
        FilterNode::eq(flag.property.as_str(), false)
    } else {
        FilterNode::ne(flag.property.as_str(), true)
    }
}

/// Every property a leaf of the tree names, including leaves under `NOT`.
pub fn queried_properties(node: &FilterNode) -> BTreeSet<String> {
    fn walk(node: &FilterNode, out: &mut BTreeSet<String>) {
        match node {
            FilterNode::Leaf(leaf) => {
                out.insert(leaf.property.clone());
            }
            FilterNode::Composite(composite) => {
                composite.children.iter().for_each(|child| walk(child, out));
            }
        }
    }

    let mut out = BTreeSet::new();
    walk(node, &mut out);
    out
}

pub fn rewrite(node: &FilterNode, flag: &str) -> Rewritten {
    match node {
        FilterNode::Leaf(leaf) => {
            if accepts_both_flag_values(leaf, flag) {
                Rewritten::AlwaysTrue
            } else {
                Rewritten::Node(node.clone())
            }
        }
        FilterNode::Composite(composite) => match composite.op {
            BooleanOp::Or => {
                if has_both_flag_equalities(&composite.children, flag) {
                    return Rewritten::AlwaysTrue;
                }
                let mut children = Vec::with_capacity(composite.children.len());
                for child in &composite.children {
                    match rewrite(child, flag) {
                        Rewritten::AlwaysTrue => return Rewritten::AlwaysTrue,
                        Rewritten::Node(node) => children.push(node),
                    }
                }
                Rewritten::Node(FilterNode::or(children))
            }
            BooleanOp::And => {
                let children: Vec<FilterNode> = composite
                    .children
                    .iter()
                    .filter_map(|child| match rewrite(child, flag) {
                        Rewritten::AlwaysTrue => None,
                        Rewritten::Node(node) => Some(node),
                    })
                    .collect();
                if children.is_empty() && !composite.children.is_empty() {
                    Rewritten::AlwaysTrue
                } else {
                    Rewritten::Node(FilterNode::and(children))
                }
            }
            BooleanOp::Not => match composite.children.first().map(|c| rewrite(c, flag)) {
                Some(Rewritten::Node(child)) => Rewritten::Node(FilterNode::not(child)),
                _ => Rewritten::Node(node.clone()),
            },
        },
    }
}

fn flag_value(leaf: &LeafFilter) -> Option<Value> {
    leaf.value.resolve().ok()
}

fn accepts_both_flag_values(leaf: &LeafFilter, flag: &str) -> bool {
    if leaf.op != Operation::In || leaf.property != flag {
        return false;
    }
    let Some(value) = flag_value(leaf) else {
        return false;
    };
    let values: BTreeSet<bool> = value.elements().iter().filter_map(|v| v.as_bool()).collect();
    values.len() == 2
}

fn has_both_flag_equalities(children: &[FilterNode], flag: &str) -> bool {
    let values: BTreeSet<bool> = children
        .iter()
        .filter_map(FilterNode::as_leaf)
        .filter(|leaf| leaf.op == Operation::Eq && leaf.property == flag)
        .filter_map(|leaf| flag_value(leaf).and_then(|v| v.as_bool()))
        .collect();
    values.len() == 2
}
