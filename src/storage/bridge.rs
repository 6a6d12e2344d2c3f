use super::cache::EntityCache;
use super::ordered_disk::OrderedDiskStore;
use crate::core::{Entity, Guid, Result};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Outcome of saving one committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    pub failed: usize,
}

/// Moves entities between the in-memory cache and the ordered disk store.
#[derive(Clone)]
pub struct DiskTierBridge {
    store: Arc<OrderedDiskStore>,
    cache: Arc<EntityCache>,
}

impl DiskTierBridge {
    pub fn new(store: Arc<OrderedDiskStore>, cache: Arc<EntityCache>) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &Arc<OrderedDiskStore> {
        &self.store
    }

    /// Saves each entity independently. Failures are logged and counted,
    /// never returned: persistence after a commit is best-effort.
    pub fn save_all(&self, batch: &[(Guid, Arc<Entity>)]) -> SaveReport {
        let mut report = SaveReport::default();
        for (guid, entity) in batch {
            match self.store.save(guid, entity) {
                Ok(()) => {
                    debug!(%guid, kind = entity.kind(), "saved entity to ordered disk");
                    report.saved += 1;
                }
                Err(err) => {
                    error!(%guid, kind = entity.kind(), error = %err, "error while saving entity");
                    report.failed += 1;
                }
            }
        }
        report
    }

    pub fn exists(&self, guid: &Guid) -> Result<bool> {
        self.store.exists(guid)
    }

    pub fn load(&self, guid: &Guid) -> Result<Entity> {
        self.store.load(guid)
    }

    /// Loads `guid` from disk and makes it available in memory. Repeating
    /// this replaces the cached value with identical content.
    pub fn promote(&self, guid: &Guid) -> Result<()> {
        let entity = self.store.load(guid)?;
        info!(%guid, kind = entity.kind(), "promoted entity from ordered disk");
        self.cache.put(guid.clone(), Arc::new(entity))
    }
}
