pub mod bridge;
pub mod cache;
pub mod ordered_disk;
pub mod persister;

pub use bridge::{DiskTierBridge, SaveReport};
pub use cache::EntityCache;
pub use ordered_disk::OrderedDiskStore;
pub use persister::{PersistencePolicy, PersistenceQueue, PersistenceStats};
