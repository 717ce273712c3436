//! Error taxonomy for the tether lifecycle and verification API.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by tether.
///
/// Lifecycle-critical failures (`ProcessStart`, `BootTimeout`, `PortInUse`)
/// and explicit verification mismatches propagate to the caller. Best-effort
/// operations (simulation export, journal/state reset against older servers)
/// degrade to warnings inside the orchestrator instead of returning these.
#[derive(Error, Debug)]
pub enum Error {
    /// The external proxy binary could not be spawned.
    #[error("could not start proxy process {binary:?}: {source}")]
    ProcessStart {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The proxy never reported healthy within the boot timeout.
    #[error("proxy has not become healthy in {timeout:?}")]
    BootTimeout { timeout: Duration },

    /// A port required by the proxy is already bound.
    #[error("port {port} is already in use")]
    PortInUse { port: u16 },

    /// A verification predicate rejected the observed request count.
    #[error("verification failed: expected {expected} request(s) matching {descriptor}, but was {actual}")]
    VerificationFailed {
        expected: String,
        actual: usize,
        descriptor: String,
    },

    /// The control API endpoint does not exist on this server version.
    #[error("operation not supported by this proxy version: {0}")]
    NotSupported(String),

    /// The control API transport failed.
    #[error("control API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The control API answered with a non-success status.
    #[error("control API returned {status} for {operation}: {message}")]
    Server {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// The control API answered successfully but with a payload this crate
    /// cannot interpret.
    #[error("unexpected control API response: {0}")]
    UnexpectedResponse(String),

    /// Configuration rejected by the builder validator.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A simulation source could not be read or parsed.
    #[error("invalid simulation: {0}")]
    InvalidSimulation(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
