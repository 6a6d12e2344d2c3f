use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::SphynxError;

/// Positional index of a vertex or edge inside an ordered entity.
pub type SphynxId = u32;

// ============================================================================
// Guid
// ============================================================================

/// Opaque identifier of one entity, assigned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guid(String);

impl Guid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Guid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Guid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Domain
// ============================================================================

/// Execution mode of a request; selects the registry and cache discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    SphynxMemory,
    OrderedSphynxDisk,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::SphynxMemory => "SphynxMemory",
            Domain::OrderedSphynxDisk => "OrderedSphynxDisk",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = SphynxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SphynxMemory" => Ok(Domain::SphynxMemory),
            "OrderedSphynxDisk" => Ok(Domain::OrderedSphynxDisk),
            other => Err(SphynxError::InvalidOperation(format!(
                "unknown domain '{}'",
                other
            ))),
        }
    }
}
