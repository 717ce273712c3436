//! Simulation wire model.
//!
//! A simulation is a set of recorded/declared request-to-response pairs plus
//! metadata, loaded into or fetched from the external proxy. The core treats
//! most of it as an opaque payload; only the pair requests are typed, because
//! `verify_all` needs to replay them as journal queries. Unknown fields are
//! preserved so an exported document round-trips through the control API
//! byte-for-byte in meaning.

mod source;

pub use source::SimulationSource;

use crate::matcher::RequestDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SCHEMA_VERSION: &str = "v5.2";

/// A full simulation document as exchanged with the control API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Simulation {
    pub data: SimulationData,
    #[serde(default)]
    pub meta: Metadata,
}

impl Simulation {
    /// A valid simulation with no pairs, used to blank out server state.
    pub fn empty() -> Self {
        Simulation {
            data: SimulationData::default(),
            meta: Metadata::default(),
        }
    }

    /// Requests of every pair, for exercising the journal.
    pub fn requests(&self) -> impl Iterator<Item = &RequestDescriptor> {
        self.data.pairs.iter().map(|pair| &pair.request)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationData {
    #[serde(default)]
    pub pairs: Vec<RequestResponsePair>,
    /// Global delays and similar actions; interpreted by the proxy only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_actions: Option<Value>,
}

/// One declared or recorded request/response pair.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RequestResponsePair {
    pub request: RequestDescriptor,
    /// Opaque response definition, passed through to the proxy untouched.
    pub response: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub schema_version: String,
    /// Version/timestamp fields emitted by the proxy, preserved for export.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            schema_version: SCHEMA_VERSION.to_string(),
            extra: Map::new(),
        }
    }
}
