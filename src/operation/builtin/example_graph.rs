use crate::core::{DoubleAttribute, EdgeBundle, Result, StringAttribute, VertexSet};
use crate::operation::{EntityAccessor, MemoryOperation};

/// A small fixed graph: four people, four edges between the first three.
pub struct ExampleGraph;

impl MemoryOperation for ExampleGraph {
    fn name(&self) -> &'static str {
        "ExampleGraph"
    }

    fn execute(&self, ea: &mut EntityAccessor<'_>) -> Result<()> {
        ea.output("vertices", VertexSet::new(vec![0, 1, 2, 3]))?;
        ea.output(
            "edges",
            EdgeBundle::new(vec![0, 1, 2, 2], vec![1, 0, 0, 1], vec![0, 1, 2, 3]),
        )?;
        ea.output(
            "name",
            StringAttribute {
                values: ["Adam", "Eve", "Bob", "Isolated Joe"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                defined: vec![true; 4],
            },
        )?;
        ea.output(
            "age",
            DoubleAttribute {
                values: vec![20.3, 18.2, 50.3, 2.0],
                defined: vec![true; 4],
            },
        )?;
        ea.output_scalar("greeting", &"Hello world! 😀 ")
    }
}
