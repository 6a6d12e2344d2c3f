use super::messages::*;
use crate::config::ServerConfig;
use crate::core::{Domain, Entity, Guid, Result, SphynxError};
use crate::operation::{
    DiskOperationRegistry, MemoryOperationRegistry, OperationExecutor, OperationInstance,
};
use crate::storage::{
    DiskTierBridge, EntityCache, OrderedDiskStore, PersistencePolicy, PersistenceQueue,
    PersistenceStats,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Boundary of the server: one method per RPC.
///
/// Lookups (`can_compute`, `has_in_sphynx_memory`,
/// `has_on_ordered_sphynx_disk`, `get_scalar`) never mutate state; only
/// `compute` and `read_from_ordered_sphynx_disk` do.
pub struct SphynxService {
    executor: Arc<OperationExecutor>,
    bridge: DiskTierBridge,
    persistence: Arc<PersistenceQueue>,
}

impl SphynxService {
    /// Wires the components together and starts the persistence workers,
    /// so this must run inside a tokio runtime.
    pub fn new(
        ordered_disk: OrderedDiskStore,
        memory_operations: MemoryOperationRegistry,
        disk_operations: DiskOperationRegistry,
        policy: PersistencePolicy,
    ) -> Self {
        let cache = Arc::new(EntityCache::new());
        let ordered_disk = Arc::new(ordered_disk);
        let bridge = DiskTierBridge::new(Arc::clone(&ordered_disk), Arc::clone(&cache));
        let persistence = Arc::new(PersistenceQueue::start(bridge.clone(), policy));
        info!(
            memory = ?memory_operations.list_operations(),
            disk = ?disk_operations.list_operations(),
            "operation registries ready"
        );
        let executor = Arc::new(OperationExecutor::new(
            cache,
            ordered_disk,
            memory_operations,
            disk_operations,
        ));
        Self {
            executor,
            bridge,
            persistence,
        }
    }

    /// Service with the built-in operations, rooted at the configured
    /// ordered data directory.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        config.prepare_directories()?;
        let ordered_disk = OrderedDiskStore::open(&config.ordered_data_dir)?;
        Ok(Self::new(
            ordered_disk,
            MemoryOperationRegistry::with_default_operations(),
            DiskOperationRegistry::with_default_operations(),
            config.persistence,
        ))
    }

    pub fn cache(&self) -> &Arc<EntityCache> {
        self.executor.cache()
    }

    pub fn can_compute(&self, request: CanComputeRequest) -> Result<CanComputeReply> {
        let instance = OperationInstance::from_json(&request.operation)?;
        let can_compute = match request.domain.parse::<Domain>() {
            Ok(domain) => self.executor.can_compute(domain, &instance),
            Err(_) => false,
        };
        Ok(CanComputeReply { can_compute })
    }

    /// Runs the operation to completion and, for the memory domain, queues
    /// the committed outputs for saving. The reply does not wait for the save.
    ///
    /// Execution, commit and enqueue run in a detached task, so dropping the
    /// returned future neither stops the work nor loses the save.
    pub async fn compute(&self, request: ComputeRequest) -> Result<ComputeReply> {
        let domain = request.domain.parse::<Domain>()?;
        let instance = OperationInstance::from_json(&request.operation)?;
        info!(%domain, operation = %instance.operation.class, "received Compute request");

        let executor = Arc::clone(&self.executor);
        let persistence = Arc::clone(&self.persistence);
        tokio::spawn(async move {
            let committed =
                tokio::task::spawn_blocking(move || executor.compute(domain, &instance)).await??;
            if let Err(err) = persistence.enqueue(committed).await {
                warn!(error = %err, "committed outputs were not queued for saving");
            }
            Ok::<_, SphynxError>(())
        })
        .await??;
        Ok(ComputeReply {})
    }

    pub fn get_scalar(&self, request: GetScalarRequest) -> Result<GetScalarReply> {
        let guid = Guid::from(request.guid);
        info!(%guid, "received GetScalar request");
        let entity = self
            .cache()
            .get(&guid)?
            .ok_or_else(|| SphynxError::NotFound(guid.clone()))?;
        match entity.as_ref() {
            Entity::Scalar(payload) => Ok(GetScalarReply {
                payload: payload.clone(),
            }),
            other => Err(SphynxError::TypeMismatch(format!(
                "entity {} is a {}, not a Scalar",
                guid,
                other.kind()
            ))),
        }
    }

    pub fn has_in_sphynx_memory(
        &self,
        request: HasInSphynxMemoryRequest,
    ) -> Result<HasInSphynxMemoryReply> {
        let has_in_memory = self.cache().contains(&Guid::from(request.guid))?;
        Ok(HasInSphynxMemoryReply { has_in_memory })
    }

    pub async fn has_on_ordered_sphynx_disk(
        &self,
        request: HasOnOrderedSphynxDiskRequest,
    ) -> Result<HasOnOrderedSphynxDiskReply> {
        let guid = Guid::from(request.guid);
        let bridge = self.bridge.clone();
        let probe = guid.clone();
        let has_on_disk = tokio::task::spawn_blocking(move || bridge.exists(&probe)).await??;
        info!(%guid, has_on_disk, "HasOnOrderedSphynxDisk");
        Ok(HasOnOrderedSphynxDiskReply { has_on_disk })
    }

    /// Promotes the entity from the ordered disk into memory.
    pub async fn read_from_ordered_sphynx_disk(
        &self,
        request: ReadFromOrderedSphynxDiskRequest,
    ) -> Result<ReadFromOrderedSphynxDiskReply> {
        let guid = Guid::from(request.guid);
        let bridge = self.bridge.clone();
        tokio::task::spawn_blocking(move || bridge.promote(&guid)).await??;
        Ok(ReadFromOrderedSphynxDiskReply {})
    }

    pub fn persistence_stats(&self) -> PersistenceStats {
        self.persistence.stats()
    }

    pub fn health(&self) -> Result<HealthReply> {
        Ok(HealthReply {
            entities: self.cache().len()?,
        })
    }

    /// Resolves once every queued save has been attempted.
    pub async fn wait_for_persistence(&self) {
        self.persistence.wait_idle().await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.persistence.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> SphynxService {
        let config = ServerConfig::new()
            .ordered_data_dir(dir.path().join("ordered"))
            .unordered_data_dir(dir.path().join("unordered"));
        SphynxService::from_config(&config).unwrap()
    }

    fn guid(raw: &str) -> GuidRequest {
        GuidRequest {
            guid: raw.to_string(),
        }
    }

    #[tokio::test]
    async fn test_unknown_domain_cannot_compute() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let reply = service
            .can_compute(CanComputeRequest {
                domain: "Elsewhere".to_string(),
                operation: r#"{"operation":{"class":"a.ExampleGraph"}}"#.to_string(),
            })
            .unwrap();
        assert!(!reply.can_compute);
    }

    #[tokio::test]
    async fn test_get_scalar_on_vertex_set_is_type_mismatch() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        service
            .cache()
            .put(
                Guid::from("vs"),
                Arc::new(Entity::VertexSet(crate::core::VertexSet::new(vec![1]))),
            )
            .unwrap();

        let err = service.get_scalar(guid("vs")).unwrap_err();
        assert!(matches!(err, SphynxError::TypeMismatch(_)));
        assert_eq!(service.health().unwrap().entities, 1);
    }

    #[tokio::test]
    async fn test_get_scalar_returns_raw_bytes() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        service
            .cache()
            .put(Guid::from("raw"), Arc::new(Entity::Scalar(vec![0xff, 0xfe, 0x41])))
            .unwrap();

        let reply = service.get_scalar(guid("raw")).unwrap();
        assert_eq!(reply.payload, vec![0xff, 0xfe, 0x41]);
    }

    #[tokio::test]
    async fn test_never_committed_guid_is_absent_everywhere() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        assert!(!service.has_in_sphynx_memory(guid("ghost")).unwrap().has_in_memory);
        assert!(matches!(
            service.get_scalar(guid("ghost")),
            Err(SphynxError::NotFound(_))
        ));
        assert!(
            !service
                .has_on_ordered_sphynx_disk(guid("ghost"))
                .await
                .unwrap()
                .has_on_disk
        );
    }
}
