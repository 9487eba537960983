use crate::filter::node::FilterNode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    pub property: String,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
    #[serde(default)]
    pub ignore_case: bool,
}

fn default_ascending() -> bool {
    true
}

impl Ordering {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: true,
            ignore_case: false,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: false,
            ignore_case: false,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

/// Everything needed to compile one query over an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Name of the queried entity.
    pub entity: String,

    #[serde(default)]
    pub filter: Option<FilterNode>,

    #[serde(default)]
    pub orderings: Vec<Ordering>,

    /// Properties to select. Empty selects the whole object.
    #[serde(default)]
    pub projected_properties: Vec<String>,

    #[serde(default)]
    pub distinct: bool,

    /// Treat every string comparison as case-insensitive.
    #[serde(default)]
    pub ignore_case: bool,

    #[serde(default)]
    pub offset: usize,

    /// Maximum number of rows; 0 means no limit.
    #[serde(default)]
    pub limit: usize,

    /// Lock the selected rows (`FOR UPDATE`) where the backend supports it.
    #[serde(default)]
    pub lock: bool,
}

impl QueryRequest {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Default::default()
        }
    }

    pub fn filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self
    }

    pub fn project<S: Into<String>>(mut self, properties: Vec<S>) -> Self {
        self.projected_properties = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    pub fn for_update(mut self) -> Self {
        self.lock = true;
        self
    }

    pub fn is_paged(&self) -> bool {
        self.offset > 0 || self.limit > 0
    }
}
