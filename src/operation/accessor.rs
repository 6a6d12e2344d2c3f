use super::instance::OperationInstance;
use crate::core::{
    DoubleAttribute, EdgeBundle, Entity, Guid, Result, SphynxError, StringAttribute, VertexSet,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-invocation view handed to a memory operation: resolved inputs,
/// read-only, plus a private output collection that is only committed if
/// the whole call succeeds.
pub struct EntityAccessor<'a> {
    instance: &'a OperationInstance,
    inputs: HashMap<String, Arc<Entity>>,
    outputs: HashMap<Guid, Arc<Entity>>,
}

impl<'a> EntityAccessor<'a> {
    pub fn new(instance: &'a OperationInstance, inputs: HashMap<String, Arc<Entity>>) -> Self {
        Self {
            instance,
            inputs,
            outputs: HashMap::new(),
        }
    }

    /// Decodes the operation's `data` parameters.
    pub fn params<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.instance.operation.data.clone())
            .map_err(|e| SphynxError::InvalidOperation(format!("bad parameters: {}", e)))
    }

    pub fn input(&self, name: &str) -> Result<&Entity> {
        let guid = self.instance.inputs.get(name).ok_or_else(|| {
            SphynxError::Execution(format!(
                "'{}' is not a declared input of {}",
                name, self.instance.operation.class
            ))
        })?;
        self.inputs
            .get(name)
            .map(|entity| &**entity)
            .ok_or_else(|| SphynxError::InputNotFound {
                name: name.to_string(),
                guid: guid.clone(),
            })
    }

    pub fn vertex_set(&self, name: &str) -> Result<&VertexSet> {
        match self.input(name)? {
            Entity::VertexSet(vs) => Ok(vs),
            other => Err(input_mismatch(name, "VertexSet", other)),
        }
    }

    pub fn edge_bundle(&self, name: &str) -> Result<&EdgeBundle> {
        match self.input(name)? {
            Entity::EdgeBundle(eb) => Ok(eb),
            other => Err(input_mismatch(name, "EdgeBundle", other)),
        }
    }

    pub fn scalar(&self, name: &str) -> Result<&[u8]> {
        match self.input(name)? {
            Entity::Scalar(payload) => Ok(payload),
            other => Err(input_mismatch(name, "Scalar", other)),
        }
    }

    pub fn double_attribute(&self, name: &str) -> Result<&DoubleAttribute> {
        match self.input(name)? {
            Entity::DoubleAttribute(attr) => Ok(attr),
            other => Err(input_mismatch(name, "DoubleAttribute", other)),
        }
    }

    pub fn string_attribute(&self, name: &str) -> Result<&StringAttribute> {
        match self.input(name)? {
            Entity::StringAttribute(attr) => Ok(attr),
            other => Err(input_mismatch(name, "StringAttribute", other)),
        }
    }

    /// Stores `entity` under the guid declared for output `name`.
    pub fn output(&mut self, name: &str, entity: impl Into<Entity>) -> Result<()> {
        let guid = self.instance.outputs.get(name).ok_or_else(|| {
            SphynxError::Execution(format!(
                "'{}' is not a declared output of {}",
                name, self.instance.operation.class
            ))
        })?;
        self.outputs.insert(guid.clone(), Arc::new(entity.into()));
        Ok(())
    }

    pub fn output_scalar<T: Serialize>(&mut self, name: &str, value: &T) -> Result<()> {
        let entity = Entity::scalar(value)
            .map_err(|e| SphynxError::Execution(format!("cannot encode scalar '{}': {}", name, e)))?;
        self.output(name, entity)
    }

    /// The entity already written for output `name`, if any.
    pub(crate) fn output_entity(&self, name: &str) -> Option<&Arc<Entity>> {
        self.instance
            .outputs
            .get(name)
            .and_then(|guid| self.outputs.get(guid))
    }

    pub(crate) fn has_output(&self, guid: &Guid) -> bool {
        self.outputs.contains_key(guid)
    }

    pub(crate) fn into_outputs(self) -> HashMap<Guid, Arc<Entity>> {
        self.outputs
    }
}

fn input_mismatch(name: &str, expected: &str, actual: &Entity) -> SphynxError {
    SphynxError::TypeMismatch(format!(
        "input '{}' is a {}, not a {}",
        name,
        actual.kind(),
        expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn instance() -> OperationInstance {
        OperationInstance::new("x.y.Op")
            .input("vs", "g1")
            .output("count", "g2")
            .data(serde_json::json!({"limit": 5}))
    }

    #[test]
    fn test_typed_getter_checks_variant() {
        let inst = instance();
        let mut inputs = HashMap::new();
        inputs.insert(
            "vs".to_string(),
            Arc::new(Entity::VertexSet(VertexSet::new(vec![1, 2]))),
        );
        let ea = EntityAccessor::new(&inst, inputs);

        assert_eq!(ea.vertex_set("vs").unwrap().len(), 2);
        assert!(matches!(
            ea.edge_bundle("vs"),
            Err(SphynxError::TypeMismatch(_))
        ));
        assert!(matches!(
            ea.vertex_set("other"),
            Err(SphynxError::Execution(_))
        ));
    }

    #[test]
    fn test_declared_but_unresolved_input_names_its_guid() {
        let inst = instance();
        let ea = EntityAccessor::new(&inst, HashMap::new());

        match ea.input("vs") {
            Err(SphynxError::InputNotFound { name, guid }) => {
                assert_eq!(name, "vs");
                assert_eq!(guid, Guid::from("g1"));
            }
            other => panic!("unexpected result: {:?}", other.map(|e| e.kind())),
        }
    }

    #[test]
    fn test_output_requires_declared_name() {
        let inst = instance();
        let mut ea = EntityAccessor::new(&inst, HashMap::new());

        ea.output_scalar("count", &2).unwrap();
        assert!(ea.has_output(&Guid::from("g2")));
        assert!(matches!(
            ea.output_scalar("undeclared", &1),
            Err(SphynxError::Execution(_))
        ));
    }

    #[test]
    fn test_params_decode_operation_data() {
        #[derive(Deserialize)]
        struct Params {
            limit: u32,
        }
        let inst = instance();
        let ea = EntityAccessor::new(&inst, HashMap::new());
        assert_eq!(ea.params::<Params>().unwrap().limit, 5);
    }
}
