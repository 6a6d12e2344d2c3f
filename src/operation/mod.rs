pub mod accessor;
pub mod builtin;
pub mod executor;
pub mod instance;
pub mod registry;

pub use accessor::EntityAccessor;
pub use executor::{CommittedBatch, ID_SET_SUFFIX, OperationExecutor};
pub use instance::{OperationDescriptor, OperationInstance, short_name};
pub use registry::{DiskOperation, DiskOperationRegistry, MemoryOperation, MemoryOperationRegistry};
