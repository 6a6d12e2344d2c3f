use serde::{Deserialize, Serialize};

use super::types::SphynxId;

/// Ordered set of vertices. Position `i` corresponds to the external
/// (unordered) identifier `mapping_to_unordered[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexSet {
    pub mapping_to_unordered: Vec<i64>,
}

impl VertexSet {
    pub fn new(mapping_to_unordered: Vec<i64>) -> Self {
        Self { mapping_to_unordered }
    }

    pub fn len(&self) -> usize {
        self.mapping_to_unordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping_to_unordered.is_empty()
    }
}

/// Edges between two vertex sets, stored as parallel columns of source and
/// destination positions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeBundle {
    pub src: Vec<SphynxId>,
    pub dst: Vec<SphynxId>,
    pub edge_mapping: Vec<i64>,
}

impl EdgeBundle {
    pub fn new(src: Vec<SphynxId>, dst: Vec<SphynxId>, edge_mapping: Vec<i64>) -> Self {
        Self {
            src,
            dst,
            edge_mapping,
        }
    }

    pub fn len(&self) -> usize {
        self.src.len()
    }

    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    /// The id set of an edge bundle: one vertex per edge, carrying the
    /// edge's unordered identifier.
    pub fn id_set(&self) -> VertexSet {
        VertexSet::new(self.edge_mapping.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoubleAttribute {
    pub values: Vec<f64>,
    pub defined: Vec<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringAttribute {
    pub values: Vec<String>,
    pub defined: Vec<bool>,
}

/// Every kind of value the server can hold under a guid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    VertexSet(VertexSet),
    EdgeBundle(EdgeBundle),
    /// JSON-encoded payload, opaque to the server.
    Scalar(Vec<u8>),
    DoubleAttribute(DoubleAttribute),
    StringAttribute(StringAttribute),
}

impl Entity {
    pub fn kind(&self) -> &'static str {
        match self {
            Entity::VertexSet(_) => "VertexSet",
            Entity::EdgeBundle(_) => "EdgeBundle",
            Entity::Scalar(_) => "Scalar",
            Entity::DoubleAttribute(_) => "DoubleAttribute",
            Entity::StringAttribute(_) => "StringAttribute",
        }
    }

    /// Encodes `value` as JSON and wraps it in a scalar.
    pub fn scalar<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_vec(value).map(Entity::Scalar)
    }
}

impl From<VertexSet> for Entity {
    fn from(vs: VertexSet) -> Self {
        Entity::VertexSet(vs)
    }
}

impl From<EdgeBundle> for Entity {
    fn from(eb: EdgeBundle) -> Self {
        Entity::EdgeBundle(eb)
    }
}

impl From<DoubleAttribute> for Entity {
    fn from(attr: DoubleAttribute) -> Self {
        Entity::DoubleAttribute(attr)
    }
}

impl From<StringAttribute> for Entity {
    fn from(attr: StringAttribute) -> Self {
        Entity::StringAttribute(attr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_set_copies_edge_mapping() {
        let eb = EdgeBundle::new(vec![0, 1, 2], vec![1, 2, 0], vec![10, 11, 12]);
        assert_eq!(eb.id_set().mapping_to_unordered, vec![10, 11, 12]);
    }

    #[test]
    fn test_scalar_holds_json() {
        let entity = Entity::scalar(&42).unwrap();
        assert_eq!(entity, Entity::Scalar(b"42".to_vec()));
        assert_eq!(entity.kind(), "Scalar");
    }
}
