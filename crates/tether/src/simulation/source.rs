//! Sources a simulation can be loaded from.

use super::Simulation;
use crate::error::{Error, Result};
use std::path::PathBuf;

/// Where a simulation comes from. The stub-building DSLs and recorders that
/// produce these documents live outside this crate; a source only knows how
/// to materialize a [`Simulation`] value.
#[derive(Debug, Clone)]
pub enum SimulationSource {
    /// A JSON document on disk, e.g. one written by `export_simulation`.
    File(PathBuf),
    /// A raw JSON string.
    Json(String),
    /// An already materialized simulation.
    Inline(Simulation),
    /// A simulation with no pairs; loading it blanks out the proxy.
    Empty,
}

impl SimulationSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        SimulationSource::File(path.into())
    }

    pub fn json(document: impl Into<String>) -> Self {
        SimulationSource::Json(document.into())
    }

    pub fn inline(simulation: Simulation) -> Self {
        SimulationSource::Inline(simulation)
    }

    /// Materialize the simulation value.
    pub async fn resolve(&self) -> Result<Simulation> {
        match self {
            SimulationSource::File(path) => {
                let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
                    Error::InvalidSimulation(format!("cannot read {}: {e}", path.display()))
                })?;
                serde_json::from_str(&contents).map_err(|e| {
                    Error::InvalidSimulation(format!("cannot parse {}: {e}", path.display()))
                })
            }
            SimulationSource::Json(document) => serde_json::from_str(document)
                .map_err(|e| Error::InvalidSimulation(format!("cannot parse document: {e}"))),
            SimulationSource::Inline(simulation) => Ok(simulation.clone()),
            SimulationSource::Empty => Ok(Simulation::empty()),
        }
    }
}
