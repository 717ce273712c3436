//! Tether manages the lifecycle of an external HTTP-intercepting proxy
//! process for integration tests: starting and stopping the separately
//! distributed binary, routing the test environment through it, and driving
//! its HTTP control API to load/export traffic simulations and verify
//! recorded interactions.
//!
//! The capture, matching and replay engines live inside the external binary;
//! tether only supervises the process and talks to its admin endpoints.
//!
//! ```no_run
//! use tether::{local_configs, Mode, SimulationSource, Tether};
//!
//! # async fn run() -> tether::Result<()> {
//! let config = local_configs()
//!     .binary("/opt/proxy/bin/proxyd")
//!     .build()?;
//! let mut proxy = Tether::new(config, Mode::Simulate);
//!
//! proxy.start().await?;
//! proxy.simulate(SimulationSource::file("simulations/orders.json")).await?;
//!
//! // ... exercise the system under test ...
//!
//! proxy.verify_all().await?;
//! proxy.close().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod environment;
pub mod error;
pub mod health;
pub mod journal;
pub mod matcher;
pub mod mode;
pub mod orchestrator;
pub mod simulation;
pub mod supervisor;
pub mod verification;

mod workdir;

pub use client::{ControlClient, ServerInfo};
pub use config::{local_configs, remote_configs, Config, LocalConfig, Middleware, RemoteConfig};
pub use environment::{EnvVarEnvironment, NoopEnvironment, ProxySettings, SystemEnvironment};
pub use error::{Error, Result};
pub use journal::{Journal, JournalEntry, ObservedRequest};
pub use matcher::{any, exact, glob, regex, FieldMatcher, RequestDescriptor};
pub use mode::{Mode, ModeArguments};
pub use orchestrator::{LifecycleState, Tether};
pub use simulation::{RequestResponsePair, Simulation, SimulationSource};
pub use verification::{
    at_least, at_least_once, at_most, never, times, VerificationCriteria,
};
