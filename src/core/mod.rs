pub mod entity;
pub mod error;
pub mod types;

pub use entity::{DoubleAttribute, EdgeBundle, Entity, StringAttribute, VertexSet};
pub use error::{Result, SphynxError};
pub use types::{Domain, Guid, SphynxId};
