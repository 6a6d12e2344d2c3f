use super::accessor::EntityAccessor;
use super::builtin;
use super::instance::OperationInstance;
use crate::core::Result;
use crate::storage::OrderedDiskStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Operation that runs against entities held in memory.
pub trait MemoryOperation: Send + Sync {
    /// Short name the operation is looked up by.
    fn name(&self) -> &'static str;

    fn execute(&self, ea: &mut EntityAccessor<'_>) -> Result<()>;
}

/// Operation that reads and writes the ordered disk store directly.
pub trait DiskOperation: Send + Sync {
    fn name(&self) -> &'static str;

    fn execute(&self, store: &OrderedDiskStore, instance: &OperationInstance) -> Result<()>;
}

// ============================================================================
// Memory registry
// ============================================================================

#[derive(Default)]
pub struct MemoryOperationRegistry {
    operations: HashMap<&'static str, Arc<dyn MemoryOperation>>,
}

impl MemoryOperationRegistry {
    pub fn new() -> Self {
        Self {
            operations: HashMap::new(),
        }
    }

    /// Registers `operation` under its short name. A later registration
    /// with the same name replaces the earlier one.
    pub fn register(&mut self, operation: Arc<dyn MemoryOperation>) {
        debug!(name = operation.name(), "registered memory operation");
        self.operations.insert(operation.name(), operation);
    }

    pub fn with_default_operations() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(builtin::ExampleGraph));
        registry.register(Arc::new(builtin::CountVertices));
        registry.register(Arc::new(builtin::CountEdges));
        registry
    }

    pub fn get(&self, short_name: &str) -> Option<Arc<dyn MemoryOperation>> {
        self.operations.get(short_name).cloned()
    }

    pub fn contains(&self, short_name: &str) -> bool {
        self.operations.contains_key(short_name)
    }

    pub fn list_operations(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

// ============================================================================
// Disk registry
// ============================================================================

#[derive(Default)]
pub struct DiskOperationRegistry {
    operations: HashMap<&'static str, Arc<dyn DiskOperation>>,
}

impl DiskOperationRegistry {
    pub fn new() -> Self {
        Self {
            operations: HashMap::new(),
        }
    }

    pub fn register(&mut self, operation: Arc<dyn DiskOperation>) {
        debug!(name = operation.name(), "registered disk operation");
        self.operations.insert(operation.name(), operation);
    }

    pub fn with_default_operations() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(builtin::DiskCountVertices));
        registry
    }

    pub fn get(&self, short_name: &str) -> Option<Arc<dyn DiskOperation>> {
        self.operations.get(short_name).cloned()
    }

    pub fn contains(&self, short_name: &str) -> bool {
        self.operations.contains_key(short_name)
    }

    pub fn list_operations(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registries() {
        let memory = MemoryOperationRegistry::with_default_operations();
        assert_eq!(
            memory.list_operations(),
            vec!["CountEdges", "CountVertices", "ExampleGraph"]
        );

        let disk = DiskOperationRegistry::with_default_operations();
        assert!(disk.contains("CountVertices"));
        assert!(!disk.contains("ExampleGraph"));
    }

    #[test]
    fn test_registries_are_independent() {
        let memory = MemoryOperationRegistry::new();
        let disk = DiskOperationRegistry::with_default_operations();
        assert!(!memory.contains("CountVertices"));
        assert!(disk.get("CountVertices").is_some());
    }
}
