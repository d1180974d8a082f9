//! Server catalog: graph model and version.

use std::fmt;

use crate::codec::Value;
use crate::error::{MdbError, Result};
use crate::protocol::{QUAD_MODEL_ID, RDF_MODEL_ID};

/// Summary a `Catalog` request returns: which graph model the server
/// hosts and its version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    model_id: u64,
    version: u64,
}

impl Catalog {
    /// Parse a catalog out of a `Success` summary payload.
    pub(crate) fn from_summary(summary: &Value) -> Result<Self> {
        let entries = summary
            .as_map()
            .ok_or_else(|| MdbError::Protocol("catalog summary must be a map".into()))?;
        let model_id = entries
            .get("modelId")
            .and_then(Value::as_u64)
            .ok_or_else(|| MdbError::Protocol("catalog summary is missing \"modelId\"".into()))?;
        let version = entries
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| MdbError::Protocol("catalog summary is missing \"version\"".into()))?;
        Ok(Self { model_id, version })
    }

    pub fn model_id(&self) -> u64 {
        self.model_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Human-readable model name.
    pub fn model_name(&self) -> &'static str {
        match self.model_id {
            QUAD_MODEL_ID => "quad",
            RDF_MODEL_ID => "rdf",
            _ => "unknown",
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Catalog<{}, v{}>", self.model_name(), self.version)
    }
}
