//! Entity metadata: how entities, their properties and their associations
//! map onto tables and columns.

use crate::error::PlannerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub entities: BTreeMap<String, EntityDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    pub table: String,

    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Scalar properties, in the order a whole-object select lists them.
    #[serde(default)]
    pub properties: Vec<PropertyDef>,

    #[serde(default)]
    pub associations: BTreeMap<String, AssociationDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,

    /// Column name when it differs from the property name.
    #[serde(default)]
    pub column: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// The owner holds a foreign key to the target's id.
    ManyToOne,
    /// The target holds a foreign key to the owner's id.
    OneToMany,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDef {
    pub target: String,
    pub kind: AssociationKind,

    /// The foreign key column, on the owner for `ManyToOne` and on the target
    /// for `OneToMany`.
    pub column: String,
}

/// What the last segment of a property path denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member<'a> {
    Column(&'a str),
    Association(&'a AssociationDef),
}

fn default_id_column() -> String {
    "id".to_string()
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, PlannerError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_entity(mut self, name: &str, entity: EntityDef) -> Self {
        self.entities.insert(name.to_string(), entity);
        self
    }

    pub fn entity(&self, name: &str) -> Result<&EntityDef, PlannerError> {
        self.entities
            .get(name)
            .ok_or_else(|| PlannerError::UnknownEntity(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }
}

impl EntityDef {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            id_column: default_id_column(),
            properties: Vec::new(),
            associations: BTreeMap::new(),
        }
    }

    pub fn property(mut self, name: &str) -> Self {
        self.properties.push(PropertyDef {
            name: name.to_string(),
            column: None,
        });
        self
    }

    pub fn property_column(mut self, name: &str, column: &str) -> Self {
        self.properties.push(PropertyDef {
            name: name.to_string(),
            column: Some(column.to_string()),
        });
        self
    }

    pub fn many_to_one(mut self, name: &str, target: &str, column: &str) -> Self {
        self.associations.insert(
            name.to_string(),
            AssociationDef {
                target: target.to_string(),
                kind: AssociationKind::ManyToOne,
                column: column.to_string(),
            },
        );
        self
    }

    pub fn one_to_many(mut self, name: &str, target: &str, column: &str) -> Self {
        self.associations.insert(
            name.to_string(),
            AssociationDef {
                target: target.to_string(),
                kind: AssociationKind::OneToMany,
                column: column.to_string(),
            },
        );
        self
    }

    pub fn association(&self, name: &str) -> Option<&AssociationDef> {
        self.associations.get(name)
    }

    /// Resolves a property name. `id` always maps to the id column.
    pub fn member(&self, name: &str) -> Option<Member<'_>> {
        if name == "id" {
            return Some(Member::Column(&self.id_column));
        }
        if let Some(prop) = self.properties.iter().find(|p| p.name == name) {
            return Some(Member::Column(prop.column.as_deref().unwrap_or(&prop.name)));
        }
        self.association(name).map(Member::Association)
    }

    /// `(property, column)` pairs selected for a whole-object query.
    pub fn columns(&self) -> Vec<(&str, &str)> {
        let mut columns = vec![("id", self.id_column.as_str())];
        columns.extend(
            self.properties
                .iter()
                .filter(|p| p.name != "id")
                .map(|p| (p.name.as_str(), p.column.as_deref().unwrap_or(&p.name))),
        );
        columns
    }
}
