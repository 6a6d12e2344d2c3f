//! Operations registered by default.

mod count;
mod example_graph;

pub use count::{CountEdges, CountVertices, DiskCountVertices};
pub use example_graph::ExampleGraph;
