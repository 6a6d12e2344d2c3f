use crate::core::{Guid, Result, SphynxError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Operation identity as sent by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub class: String,
    /// Operation parameters, if any.
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One requested operation: what to run and which guids to read and write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationInstance {
    pub operation: OperationDescriptor,
    #[serde(default)]
    pub inputs: BTreeMap<String, Guid>,
    #[serde(default)]
    pub outputs: BTreeMap<String, Guid>,
}

impl OperationInstance {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            operation: OperationDescriptor {
                class: class.into(),
                data: serde_json::Value::Null,
            },
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SphynxError::InvalidOperation(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| SphynxError::InvalidOperation(e.to_string()))
    }

    pub fn input(mut self, name: impl Into<String>, guid: impl Into<Guid>) -> Self {
        self.inputs.insert(name.into(), guid.into());
        self
    }

    pub fn output(mut self, name: impl Into<String>, guid: impl Into<Guid>) -> Self {
        self.outputs.insert(name.into(), guid.into());
        self
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.operation.data = data;
        self
    }

    /// Registry key: the class name without its namespace path.
    pub fn short_name(&self) -> &str {
        short_name(&self.operation.class)
    }
}

pub fn short_name(class: &str) -> &str {
    match class.rfind('.') {
        Some(idx) => &class[idx + 1..],
        None => class,
    }
}
