//! The filter tree: an immutable boolean expression over entity properties.
//!
//! Trees are assembled with the constructors on [`FilterNode`] (or
//! deserialized from a stored JSON document) and are only ever read by the
//! compiler.

use crate::{
    core::value::Value,
    error::ModelError,
    filter::operation::{BooleanOp, MatchMode, Operation},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterNode {
    Leaf(LeafFilter),
    Composite(CompositeFilter),
}

/// The operand of a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    /// A value supplied directly by the caller.
    Literal(Value),

    /// A JSON-encoded [`Value`] read back from a stored filter. It is decoded
    /// when the leaf is compiled.
    Persisted(String),
}

impl Default for FilterValue {
    fn default() -> Self {
        FilterValue::Literal(Value::Null)
    }
}

impl FilterValue {
    /// Decodes the operand into a value.
    pub fn resolve(&self) -> Result<Value, ModelError> {
        match self {
            FilterValue::Literal(v) => Ok(v.clone()),
            FilterValue::Persisted(raw) => serde_json::from_str(raw)
                .map_err(|e| ModelError::MalformedLiteral(format!("{raw}: {e}"))),
        }
    }
}

/// Parameters of a `SUBQUERY` leaf: `property IN (SELECT entity.select FROM
/// entity WHERE filter)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubqueryFilter {
    pub entity: String,
    pub select: String,
    #[serde(default)]
    pub filter: Option<Box<FilterNode>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafFilter {
    pub property: String,
    pub op: Operation,
    #[serde(default)]
    pub value: FilterValue,

    /// Target of a `JOIN`/`LEFT_JOIN`, written as `Entity.property`.
    #[serde(default)]
    pub join_property: Option<String>,

    #[serde(default)]
    pub ignore_case: bool,

    #[serde(default)]
    pub match_mode: Option<MatchMode>,

    #[serde(default)]
    pub collection_condition: Option<Box<FilterNode>>,

    #[serde(default)]
    pub subquery: Option<SubqueryFilter>,
}

impl LeafFilter {
    pub fn new(property: impl Into<String>, op: Operation, value: FilterValue) -> Self {
        Self {
            property: property.into(),
            op,
            value,
            join_property: None,
            ignore_case: false,
            match_mode: None,
            collection_condition: None,
            subquery: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeFilter {
    pub op: BooleanOp,
    pub children: Vec<FilterNode>,
}

impl FilterNode {
    fn leaf(property: impl Into<String>, op: Operation, value: Value) -> Self {
        FilterNode::Leaf(LeafFilter::new(property, op, FilterValue::Literal(value)))
    }

    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(property, Operation::Eq, value.into())
    }

    pub fn ne(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(property, Operation::Ne, value.into())
    }

    pub fn gt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(property, Operation::Gt, value.into())
    }

    pub fn ge(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(property, Operation::Ge, value.into())
    }

    pub fn lt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(property, Operation::Lt, value.into())
    }

    pub fn le(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(property, Operation::Le, value.into())
    }

    pub fn like(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(property, Operation::Like, value.into())
    }

    pub fn in_list<T: Into<Value>>(property: impl Into<String>, values: Vec<T>) -> Self {
        Self::leaf(property, Operation::In, Value::from(values))
    }

    pub fn is_null(property: impl Into<String>) -> Self {
        Self::leaf(property, Operation::IsNull, Value::Null)
    }

    pub fn not_null(property: impl Into<String>) -> Self {
        Self::leaf(property, Operation::NotNull, Value::Null)
    }

    pub fn is_empty(property: impl Into<String>) -> Self {
        Self::leaf(property, Operation::IsEmpty, Value::Null)
    }

    pub fn contains_all<T: Into<Value>>(property: impl Into<String>, values: Vec<T>) -> Self {
        Self::leaf(property, Operation::ContainsAll, Value::from(values))
    }

    /// Inner join of `Entity.property` on equality with `property`.
    pub fn join(property: impl Into<String>, join_property: impl Into<String>) -> Self {
        let mut leaf = LeafFilter::new(property, Operation::Join, FilterValue::default());
        leaf.join_property = Some(join_property.into());
        FilterNode::Leaf(leaf)
    }

    /// Left outer join of `Entity.property` on equality with `property`.
    pub fn left_join(property: impl Into<String>, join_property: impl Into<String>) -> Self {
        let mut leaf = LeafFilter::new(property, Operation::LeftJoin, FilterValue::default());
        leaf.join_property = Some(join_property.into());
        FilterNode::Leaf(leaf)
    }

    /// A condition that a single element of the `property` collection must
    /// satisfy as a whole.
    pub fn collection_condition(property: impl Into<String>, condition: FilterNode) -> Self {
        let mut leaf = LeafFilter::new(
            property,
            Operation::CollectionCondition,
            FilterValue::default(),
        );
        leaf.collection_condition = Some(Box::new(condition));
        FilterNode::Leaf(leaf)
    }

    pub fn subquery(
        property: impl Into<String>,
        entity: impl Into<String>,
        select: impl Into<String>,
        filter: Option<FilterNode>,
    ) -> Self {
        let mut leaf = LeafFilter::new(property, Operation::Subquery, FilterValue::default());
        leaf.subquery = Some(SubqueryFilter {
            entity: entity.into(),
            select: select.into(),
            filter: filter.map(Box::new),
        });
        FilterNode::Leaf(leaf)
    }

    /// A leaf whose operand is a stored JSON fragment.
    pub fn persisted(property: impl Into<String>, op: Operation, raw: impl Into<String>) -> Self {
        FilterNode::Leaf(LeafFilter::new(
            property,
            op,
            FilterValue::Persisted(raw.into()),
        ))
    }

    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::Composite(CompositeFilter {
            op: BooleanOp::And,
            children,
        })
    }

    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Composite(CompositeFilter {
            op: BooleanOp::Or,
            children,
        })
    }

    pub fn not(child: FilterNode) -> Self {
        FilterNode::Composite(CompositeFilter {
            op: BooleanOp::Not,
            children: vec![child],
        })
    }

    /// Marks a leaf as case-insensitive. No effect on composites.
    pub fn ignore_case(mut self) -> Self {
        if let FilterNode::Leaf(leaf) = &mut self {
            leaf.ignore_case = true;
        }
        self
    }

    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        if let FilterNode::Leaf(leaf) = &mut self {
            leaf.match_mode = Some(mode);
        }
        self
    }

    pub fn as_leaf(&self) -> Option<&LeafFilter> {
        match self {
            FilterNode::Leaf(leaf) => Some(leaf),
            FilterNode::Composite(_) => None,
        }
    }

    /// Checks the structural rules a tree must satisfy before compilation.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            FilterNode::Leaf(leaf) => {
                if let Some(condition) = &leaf.collection_condition {
                    condition.validate()?;
                }
                if let Some(filter) = leaf.subquery.as_ref().and_then(|s| s.filter.as_ref()) {
                    filter.validate()?;
                }
                Ok(())
            }
            FilterNode::Composite(composite) => {
                if composite.op == BooleanOp::Not && composite.children.len() != 1 {
                    return Err(ModelError::InvalidArity {
                        op: composite.op,
                        found: composite.children.len(),
                    });
                }
                composite.children.iter().try_for_each(FilterNode::validate)
            }
        }
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reconstructs a stored filter. The tree is validated before it is
    /// returned.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let node: FilterNode = serde_json::from_str(json)?;
        node.validate()?;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_structural_equality() {
        let a = FilterNode::and(vec![
            FilterNode::eq("manager.name", "Bob"),
            FilterNode::eq("active", true),
        ]);
        let b = FilterNode::and(vec![
            FilterNode::eq("manager.name", "Bob"),
            FilterNode::eq("active", true),
        ]);
        assert_eq!(a, b);
        assert_ne!(a, FilterNode::or(vec![FilterNode::eq("active", true)]));
    }

    #[test]
    fn test_json_round_trip_keeps_modifiers() {
        let filter = FilterNode::or(vec![
            FilterNode::like("name", "jo").ignore_case().match_mode(MatchMode::Start),
            FilterNode::not(FilterNode::is_null("manager")),
        ]);
        let json = filter.to_json().unwrap();
        assert_eq!(FilterNode::from_json(&json).unwrap(), filter);
    }

    #[test]
    fn test_from_json_rejects_unknown_operation() {
        let json = r#"{"Leaf":{"property":"name","op":"BETWEEN"}}"#;
        assert!(matches!(
            FilterNode::from_json(json),
            Err(ModelError::Json(_))
        ));
    }

    #[test]
    fn test_not_requires_exactly_one_child() {
        let bad = FilterNode::Composite(CompositeFilter {
            op: BooleanOp::Not,
            children: vec![FilterNode::is_null("a"), FilterNode::is_null("b")],
        });
        assert!(matches!(
            bad.validate(),
            Err(ModelError::InvalidArity { found: 2, .. })
        ));
    }

    #[test]
    fn test_persisted_value_resolution() {
        let ok = FilterValue::Persisted(r#"{"String":"Bob"}"#.to_string());
        assert_eq!(ok.resolve().unwrap(), Value::from("Bob"));

        let broken = FilterValue::Persisted("{not json".to_string());
        assert!(matches!(
            broken.resolve(),
            Err(ModelError::MalformedLiteral(_))
        ));
    }
}
