use crate::core::{Entity, Guid, Result, SphynxError};
use crate::operation::{DiskOperation, EntityAccessor, MemoryOperation, OperationInstance};
use crate::storage::OrderedDiskStore;
use std::collections::BTreeMap;

pub struct CountVertices;

impl MemoryOperation for CountVertices {
    fn name(&self) -> &'static str {
        "CountVertices"
    }

    fn execute(&self, ea: &mut EntityAccessor<'_>) -> Result<()> {
        let count = ea.vertex_set("vertices")?.len();
        ea.output_scalar("count", &count)
    }
}

pub struct CountEdges;

impl MemoryOperation for CountEdges {
    fn name(&self) -> &'static str {
        "CountEdges"
    }

    fn execute(&self, ea: &mut EntityAccessor<'_>) -> Result<()> {
        let count = ea.edge_bundle("edges")?.len();
        ea.output_scalar("count", &count)
    }
}

/// `CountVertices` for vertex sets that live only on the ordered disk.
pub struct DiskCountVertices;

impl DiskOperation for DiskCountVertices {
    fn name(&self) -> &'static str {
        "CountVertices"
    }

    fn execute(&self, store: &OrderedDiskStore, instance: &OperationInstance) -> Result<()> {
        let input = declared(&instance.inputs, "vertices")?;
        let output = declared(&instance.outputs, "count")?;

        let count = match store.load(input)? {
            Entity::VertexSet(vs) => vs.len(),
            other => {
                return Err(SphynxError::TypeMismatch(format!(
                    "{} is a {}, not a VertexSet",
                    input,
                    other.kind()
                )));
            }
        };
        let scalar = Entity::scalar(&count)
            .map_err(|e| SphynxError::Execution(format!("cannot encode count: {}", e)))?;
        store.save(output, &scalar)
    }
}

fn declared<'a>(slots: &'a BTreeMap<String, Guid>, name: &str) -> Result<&'a Guid> {
    slots
        .get(name)
        .ok_or_else(|| SphynxError::Execution(format!("'{}' is not declared", name)))
}
