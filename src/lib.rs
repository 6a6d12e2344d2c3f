// ============================================================================
// Sphynx Library
// ============================================================================
//
// In-memory graph compute server. An orchestrator submits operation
// instances; Sphynx runs them against an entity cache and mirrors results
// to an ordered on-disk tier.

pub mod config;
pub mod core;
pub mod facade;
pub mod operation;
pub mod server;
pub mod storage;

pub use config::ServerConfig;
pub use crate::core::{Domain, Entity, Guid, Result, SphynxError};
pub use facade::SphynxService;
pub use operation::{
    DiskOperation, DiskOperationRegistry, EntityAccessor, MemoryOperation,
    MemoryOperationRegistry, OperationInstance,
};
pub use storage::{EntityCache, OrderedDiskStore, PersistencePolicy};
