//! Relationship (edge) as returned by the driver.

use serde::{Deserialize, Serialize};
use super::{NodeId, PropertyMap};

/// Server-assigned relationship identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelId(pub i64);

impl std::fmt::Display for RelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A relationship (directed edge) in the property graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelId,
    pub start: NodeId,
    pub end: NodeId,
    pub rel_type: String,
    pub properties: PropertyMap,
}

impl Relationship {
    pub fn new(id: RelId, start: NodeId, end: NodeId, rel_type: impl Into<String>) -> Self {
        Self {
            id,
            start,
            end,
            rel_type: rel_type.into(),
            properties: PropertyMap::new(),
        }
    }
}
