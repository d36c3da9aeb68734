use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_i32(self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

/// Ordered list of (field, direction) keys.
pub type SortSpec = Vec<(String, SortOrder)>;

pub(crate) fn sort_to_mongo(sort: &[(String, SortOrder)]) -> Value {
    let mut m = Map::new();
    for (field, order) in sort {
        m.insert(field.clone(), Value::from(order.as_i32()));
    }
    Value::Object(m)
}

/// Options for a `find` call. Sorting and limiting are applied by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: SortSpec,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn sorted_by(field: &str, order: SortOrder) -> Self {
        Self {
            sort: vec![(field.to_string(), order)],
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sort document in store wire form, if any sort keys are set.
    pub fn sort_document(&self) -> Option<Value> {
        if self.sort.is_empty() {
            None
        } else {
            Some(sort_to_mongo(&self.sort))
        }
    }
}
