use super::accessor::EntityAccessor;
use super::instance::OperationInstance;
use super::registry::{DiskOperationRegistry, MemoryOperationRegistry};
use crate::core::{Domain, Entity, Guid, Result, SphynxError};
use crate::storage::{EntityCache, OrderedDiskStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Output names with this suffix are id sets derived from the edge bundle
/// output named by the rest of the string.
pub const ID_SET_SUFFIX: &str = "-idSet";

/// Entities made visible by one successful memory-domain compute.
pub type CommittedBatch = Vec<(Guid, Arc<Entity>)>;

pub struct OperationExecutor {
    cache: Arc<EntityCache>,
    ordered_disk: Arc<OrderedDiskStore>,
    memory_operations: MemoryOperationRegistry,
    disk_operations: DiskOperationRegistry,
}

impl OperationExecutor {
    pub fn new(
        cache: Arc<EntityCache>,
        ordered_disk: Arc<OrderedDiskStore>,
        memory_operations: MemoryOperationRegistry,
        disk_operations: DiskOperationRegistry,
    ) -> Self {
        Self {
            cache,
            ordered_disk,
            memory_operations,
            disk_operations,
        }
    }

    pub fn cache(&self) -> &Arc<EntityCache> {
        &self.cache
    }

    /// Registry membership only; inputs are not checked.
    pub fn can_compute(&self, domain: Domain, instance: &OperationInstance) -> bool {
        match domain {
            Domain::SphynxMemory => self.memory_operations.contains(instance.short_name()),
            Domain::OrderedSphynxDisk => self.disk_operations.contains(instance.short_name()),
        }
    }

    /// Runs `instance` in `domain`. For the memory domain the returned batch
    /// has already been committed to the cache; the disk domain never
    /// returns entities.
    pub fn compute(&self, domain: Domain, instance: &OperationInstance) -> Result<CommittedBatch> {
        match domain {
            Domain::SphynxMemory => self.compute_in_memory(instance),
            Domain::OrderedSphynxDisk => {
                self.compute_on_disk(instance)?;
                Ok(Vec::new())
            }
        }
    }

    fn compute_in_memory(&self, instance: &OperationInstance) -> Result<CommittedBatch> {
        let op = self
            .memory_operations
            .get(instance.short_name())
            .ok_or_else(|| not_supported(Domain::SphynxMemory, instance))?;

        let inputs = self.cache.resolve(&instance.inputs)?;
        let mut ea = EntityAccessor::new(instance, inputs);
        debug!(operation = op.name(), "executing memory operation");
        op.execute(&mut ea)?;

        materialize_id_sets(&mut ea, instance)?;
        ensure_outputs_complete(&ea, instance)?;

        let batch: CommittedBatch = ea.into_outputs().into_iter().collect();
        self.cache.put_all(batch.iter().cloned())?;
        info!(
            operation = op.name(),
            outputs = batch.len(),
            "committed operation outputs"
        );
        Ok(batch)
    }

    fn compute_on_disk(&self, instance: &OperationInstance) -> Result<()> {
        let op = self
            .disk_operations
            .get(instance.short_name())
            .ok_or_else(|| not_supported(Domain::OrderedSphynxDisk, instance))?;
        debug!(operation = op.name(), "executing disk operation");
        op.execute(&self.ordered_disk, instance)?;
        info!(operation = op.name(), "disk operation finished");
        Ok(())
    }
}

fn not_supported(domain: Domain, instance: &OperationInstance) -> SphynxError {
    SphynxError::OperationNotSupported {
        domain,
        operation: instance.operation.class.clone(),
    }
}

/// Operations never produce `-idSet` outputs themselves; each one is built
/// here as a vertex set carrying its edge bundle's edge mapping.
fn materialize_id_sets(ea: &mut EntityAccessor<'_>, instance: &OperationInstance) -> Result<()> {
    for name in instance.outputs.keys() {
        let Some(base) = name.strip_suffix(ID_SET_SUFFIX) else {
            continue;
        };
        let id_set = match ea.output_entity(base).map(|entity| &**entity) {
            Some(Entity::EdgeBundle(eb)) => eb.id_set(),
            Some(other) => {
                return Err(SphynxError::TypeMismatch(format!(
                    "operation output (name: {}, guid: {}) is a {}, not an EdgeBundle",
                    base,
                    guid_of(instance, base),
                    other.kind()
                )));
            }
            None => {
                return Err(SphynxError::TypeMismatch(format!(
                    "operation output (name: {}, guid: {}) is not an EdgeBundle",
                    base,
                    guid_of(instance, base)
                )));
            }
        };
        ea.output(name, id_set)?;
    }
    Ok(())
}

fn ensure_outputs_complete(ea: &EntityAccessor<'_>, instance: &OperationInstance) -> Result<()> {
    match instance
        .outputs
        .iter()
        .find(|(_, guid)| !ea.has_output(guid))
    {
        Some((name, guid)) => Err(SphynxError::Execution(format!(
            "{} did not produce output '{}' (guid: {})",
            instance.operation.class, name, guid
        ))),
        None => Ok(()),
    }
}

fn guid_of(instance: &OperationInstance, name: &str) -> String {
    instance
        .outputs
        .get(name)
        .map(|guid| guid.to_string())
        .unwrap_or_else(|| "<undeclared>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EdgeBundle, VertexSet};
    use crate::operation::MemoryOperation;
    use tempfile::TempDir;

    /// Emits `B` as an edge bundle with edge mapping [10, 11, 12].
    struct Foo;

    impl MemoryOperation for Foo {
        fn name(&self) -> &'static str {
            "Foo"
        }

        fn execute(&self, ea: &mut EntityAccessor<'_>) -> Result<()> {
            ea.vertex_set("a")?;
            ea.output(
                "B",
                EdgeBundle::new(vec![0, 1, 2], vec![1, 2, 0], vec![10, 11, 12]),
            )
        }
    }

    /// Emits `B` as a vertex set, which cannot back an id set.
    struct NotAnEdgeBundle;

    impl MemoryOperation for NotAnEdgeBundle {
        fn name(&self) -> &'static str {
            "NotAnEdgeBundle"
        }

        fn execute(&self, ea: &mut EntityAccessor<'_>) -> Result<()> {
            ea.output("B", VertexSet::new(vec![1]))
        }
    }

    struct Failing;

    impl MemoryOperation for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }

        fn execute(&self, ea: &mut EntityAccessor<'_>) -> Result<()> {
            ea.output("B", VertexSet::new(vec![1]))?;
            Err(SphynxError::Execution("boom".to_string()))
        }
    }

    fn executor(dir: &TempDir) -> OperationExecutor {
        let mut memory = MemoryOperationRegistry::with_default_operations();
        memory.register(Arc::new(Foo));
        memory.register(Arc::new(NotAnEdgeBundle));
        memory.register(Arc::new(Failing));
        OperationExecutor::new(
            Arc::new(EntityCache::new()),
            Arc::new(OrderedDiskStore::open(dir.path()).unwrap()),
            memory,
            DiskOperationRegistry::with_default_operations(),
        )
    }

    fn foo_instance() -> OperationInstance {
        OperationInstance::new("com.example.Foo")
            .input("a", "I1")
            .output("B", "B-guid")
            .output("B-idSet", "B-idSet-guid")
    }

    #[test]
    fn test_can_compute_checks_domain_registry() {
        let dir = TempDir::new().unwrap();
        let executor = executor(&dir);
        let unregistered = OperationInstance::new("x.y.Unregistered");
        let count = OperationInstance::new("a.b.CountVertices");
        let foo = OperationInstance::new("a.b.Foo");

        assert!(!executor.can_compute(Domain::SphynxMemory, &unregistered));
        assert!(executor.can_compute(Domain::SphynxMemory, &count));
        assert!(executor.can_compute(Domain::OrderedSphynxDisk, &count));
        assert!(!executor.can_compute(Domain::OrderedSphynxDisk, &foo));
    }

    #[test]
    fn test_id_set_is_derived_from_edge_bundle() {
        let dir = TempDir::new().unwrap();
        let executor = executor(&dir);
        executor
            .cache()
            .put(Guid::from("I1"), Arc::new(Entity::VertexSet(VertexSet::new(vec![1, 2, 3]))))
            .unwrap();

        let batch = executor.compute(Domain::SphynxMemory, &foo_instance()).unwrap();
        assert_eq!(batch.len(), 2);

        let id_set = executor.cache().get(&Guid::from("B-idSet-guid")).unwrap().unwrap();
        assert_eq!(*id_set, Entity::VertexSet(VertexSet::new(vec![10, 11, 12])));
        assert!(executor.cache().contains(&Guid::from("B-guid")).unwrap());
    }

    #[test]
    fn test_unregistered_operation_leaves_cache_unchanged() {
        let dir = TempDir::new().unwrap();
        let executor = executor(&dir);
        let inst = OperationInstance::new("x.y.Unregistered").output("o", "o-guid");

        let err = executor.compute(Domain::SphynxMemory, &inst).unwrap_err();
        assert!(matches!(err, SphynxError::OperationNotSupported { .. }));
        assert!(executor.cache().is_empty().unwrap());
    }

    #[test]
    fn test_missing_input_aborts_before_execution() {
        let dir = TempDir::new().unwrap();
        let executor = executor(&dir);

        let err = executor.compute(Domain::SphynxMemory, &foo_instance()).unwrap_err();
        assert!(matches!(err, SphynxError::InputNotFound { .. }));
        assert!(executor.cache().is_empty().unwrap());
    }

    #[test]
    fn test_id_set_over_non_edge_bundle_commits_nothing() {
        let dir = TempDir::new().unwrap();
        let executor = executor(&dir);
        let inst = OperationInstance::new("NotAnEdgeBundle")
            .output("B", "b")
            .output("B-idSet", "b-id");

        let err = executor.compute(Domain::SphynxMemory, &inst).unwrap_err();
        assert!(matches!(err, SphynxError::TypeMismatch(_)));
        assert!(executor.cache().is_empty().unwrap());
    }

    #[test]
    fn test_failed_operation_discards_partial_outputs() {
        let dir = TempDir::new().unwrap();
        let executor = executor(&dir);
        let inst = OperationInstance::new("Failing").output("B", "b");

        assert!(executor.compute(Domain::SphynxMemory, &inst).is_err());
        assert!(!executor.cache().contains(&Guid::from("b")).unwrap());
    }

    #[test]
    fn test_missing_declared_output_commits_nothing() {
        let dir = TempDir::new().unwrap();
        let executor = executor(&dir);
        executor
            .cache()
            .put(Guid::from("I1"), Arc::new(Entity::VertexSet(VertexSet::default())))
            .unwrap();
        let inst = foo_instance().output("Extra", "extra-guid");

        let err = executor.compute(Domain::SphynxMemory, &inst).unwrap_err();
        assert!(matches!(err, SphynxError::Execution(_)));
        assert!(!executor.cache().contains(&Guid::from("B-guid")).unwrap());
    }

    #[test]
    fn test_disk_domain_bypasses_cache() {
        let dir = TempDir::new().unwrap();
        let executor = executor(&dir);
        let store = OrderedDiskStore::open(dir.path()).unwrap();
        store
            .save(&Guid::from("vs"), &Entity::VertexSet(VertexSet::new(vec![1, 2, 3])))
            .unwrap();
        let inst = OperationInstance::new("x.CountVertices")
            .input("vertices", "vs")
            .output("count", "count-guid");

        let batch = executor.compute(Domain::OrderedSphynxDisk, &inst).unwrap();
        assert!(batch.is_empty());
        assert!(executor.cache().is_empty().unwrap());
        assert_eq!(
            store.load(&Guid::from("count-guid")).unwrap(),
            Entity::Scalar(b"3".to_vec())
        );
    }
}
