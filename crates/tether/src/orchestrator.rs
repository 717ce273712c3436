//! The lifecycle facade composing supervision, health polling, the control
//! client and verification.

use crate::client::{ControlClient, ServerInfo};
use crate::config::Config;
use crate::environment::{EnvVarEnvironment, SystemEnvironment};
use crate::error::{Error, Result};
use crate::health::wait_until_healthy;
use crate::journal::Journal;
use crate::matcher::RequestDescriptor;
use crate::mode::{Mode, ModeArguments};
use crate::simulation::{Simulation, SimulationSource};
use crate::supervisor::{ensure_port_free, ProcessSupervisor};
use crate::verification::{self, never, VerificationCriteria};
use crate::workdir::WorkingDir;
use std::path::Path;
use tracing::{error, info, warn};

/// Lifecycle state of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting,
    Healthy,
}

/// Orchestrates the external proxy for a test run: starts (or attaches to)
/// the process, loads and exports simulations, and verifies observed
/// traffic.
///
/// A single instance is not designed for concurrent lifecycle calls;
/// `&mut self` on the transitions enforces serialization. Cleanup is scoped:
/// dropping the orchestrator restores the proxy environment, signals the
/// child and removes the working directory, though calling
/// [`close`](Tether::close) explicitly is preferred because it also honors
/// the bounded shutdown wait.
pub struct Tether {
    config: Config,
    mode: Mode,
    client: ControlClient,
    supervisor: ProcessSupervisor,
    environment: Box<dyn SystemEnvironment>,
    workdir: WorkingDir,
    state: LifecycleState,
}

impl Tether {
    /// Create an orchestrator that routes the process environment through the
    /// proxy while running (conventional `HTTP_PROXY`/`HTTPS_PROXY`
    /// variables).
    pub fn new(config: Config, mode: Mode) -> Self {
        Self::with_environment(config, mode, Box::new(EnvVarEnvironment::new()))
    }

    /// Create an orchestrator with a caller-supplied [`SystemEnvironment`],
    /// e.g. [`NoopEnvironment`](crate::environment::NoopEnvironment) when
    /// test clients are pointed at the proxy explicitly.
    pub fn with_environment(
        config: Config,
        mode: Mode,
        environment: Box<dyn SystemEnvironment>,
    ) -> Self {
        let client = ControlClient::new(config.scheme(), config.host(), config.admin_port());
        Self {
            config,
            mode,
            client,
            supervisor: ProcessSupervisor::new(),
            environment,
            workdir: WorkingDir::new(),
            state: LifecycleState::Stopped,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The mode this orchestrator was configured to start in.
    pub fn configured_mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Bring the proxy up and make it effective:
    ///
    /// 1. launch the binary (local) or clear the remote journal (remote),
    /// 2. poll the health endpoint until healthy or the boot timeout,
    /// 3. apply the destination filter and operating mode,
    /// 4. route the environment through the proxy.
    ///
    /// A failure part-way leaves partially initialized state behind;
    /// [`close`](Self::close) cleans that up safely.
    pub async fn start(&mut self) -> Result<()> {
        if self.state == LifecycleState::Healthy || self.supervisor.is_running() {
            warn!("local proxy is already running");
            return Ok(());
        }
        self.state = LifecycleState::Starting;

        if self.config.is_remote_instance() {
            self.reset_journal().await?;
        } else {
            self.launch_process()?;
        }

        let client = &self.client;
        wait_until_healthy(
            || client.health(),
            self.config.boot_timeout(),
            self.config.poll_interval(),
        )
        .await?;

        if let Some(destination) = self.config.destination() {
            self.client.set_destination(destination).await?;
        }

        if self.mode == Mode::Capture {
            let arguments = self.capture_arguments();
            self.client.set_mode(self.mode, Some(&arguments)).await?;
        } else {
            self.client.set_mode(self.mode, None).await?;
        }

        self.environment.apply(&self.config.proxy_settings());
        self.state = LifecycleState::Healthy;
        info!(
            proxy_port = self.config.proxy_port(),
            admin_port = self.config.admin_port(),
            mode = %self.mode,
            "proxy is up"
        );
        Ok(())
    }

    fn launch_process(&mut self) -> Result<()> {
        let binary = self
            .config
            .binary()
            .cloned()
            .ok_or_else(|| Error::InvalidConfig("local instance without a binary".to_string()))?;

        ensure_port_free(self.config.proxy_port())?;
        ensure_port_free(self.config.admin_port())?;

        if let Some(cert) = &self.config.ssl_certificate {
            self.workdir.stage(cert, "ca.crt")?;
        }
        if let Some(key) = &self.config.ssl_key {
            self.workdir.stage(key, "ca.key")?;
        }
        if let Some(script_name) = self.config.middleware_script_name() {
            if let Some(middleware) = &self.config.middleware {
                self.workdir.stage(&middleware.script, &script_name)?;
            }
        }

        let args = self.config.launch_args();
        let workdir = self.workdir.ensure()?.to_path_buf();
        self.supervisor.spawn(&binary, &args, &workdir)
    }

    /// Tear everything down. Always safe: before `start`, after a partial
    /// `start` failure, and repeatedly. Never fails; sub-step problems are
    /// logged and the remaining steps still run, so one teardown failure
    /// cannot mask or prevent the others.
    pub async fn close(&mut self) {
        if !self.config.is_remote_instance() {
            self.supervisor.stop(self.config.shutdown_grace()).await;
        }
        self.environment.restore();
        self.workdir.purge();
        self.state = LifecycleState::Stopped;
    }

    /// Load a simulation into the proxy.
    pub async fn simulate(&self, source: SimulationSource) -> Result<()> {
        info!("importing simulation into the proxy");
        let simulation = source.resolve().await?;
        self.client.set_simulation(&simulation).await
    }

    /// The simulation currently loaded in the proxy.
    pub async fn get_simulation(&self) -> Result<Simulation> {
        self.client.get_simulation().await
    }

    /// Export the current simulation to `path`, pretty-printed, replacing any
    /// existing file atomically.
    ///
    /// Best-effort by design: failures are logged and swallowed so a broken
    /// export cannot fail test teardown. An unreachable control API leaves a
    /// previously exported file untouched.
    pub async fn export_simulation(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        info!(path = %path.display(), "exporting simulation from the proxy");
        if let Err(e) = self.try_export(path).await {
            error!("failed to export simulation: {e}");
        }
    }

    async fn try_export(&self, path: &Path) -> Result<()> {
        let simulation = self.client.get_simulation().await?;
        let document = serde_json::to_string_pretty(&simulation)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        // write-then-rename so a failure cannot leave a torn file at `path`
        let staging = path.with_extension("tether-export.tmp");
        tokio::fs::write(&staging, document).await?;
        tokio::fs::rename(&staging, path).await?;
        Ok(())
    }

    /// Delete the loaded simulation and the journal.
    pub async fn reset(&self) -> Result<()> {
        self.client.delete_simulation().await?;
        self.reset_journal().await
    }

    /// Delete the journal. Older proxy versions without the endpoint are
    /// tolerated with a warning.
    pub async fn reset_journal(&self) -> Result<()> {
        match self.client.delete_journal().await {
            Err(Error::NotSupported(operation)) => {
                warn!("this proxy version does not support {operation}, skipping");
                Ok(())
            }
            other => other,
        }
    }

    /// Delete all proxy state, with the same version tolerance as
    /// [`reset_journal`](Self::reset_journal).
    pub async fn reset_states(&self) -> Result<()> {
        match self.client.delete_states().await {
            Err(Error::NotSupported(operation)) => {
                warn!("this proxy version does not support {operation}, skipping");
                Ok(())
            }
            other => other,
        }
    }

    /// Configuration information from the running proxy.
    pub async fn info(&self) -> Result<ServerInfo> {
        self.client.info().await
    }

    /// Mode the running proxy reports itself in.
    pub async fn active_mode(&self) -> Result<Mode> {
        let info = self.client.info().await?;
        let reported = info.mode.unwrap_or_default();
        reported
            .parse()
            .map_err(|e: String| Error::UnexpectedResponse(e))
    }

    /// Switch the running proxy to a different mode.
    pub async fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.client.set_mode(mode, None).await?;
        self.mode = mode;
        Ok(())
    }

    /// Switch mode re-applying the configured mode arguments (capture header
    /// allow-list, stateful capture).
    pub async fn reset_mode(&mut self, mode: Mode) -> Result<()> {
        let arguments = self.capture_arguments();
        self.client.set_mode(mode, Some(&arguments)).await?;
        self.mode = mode;
        Ok(())
    }

    /// Override the destination filter of the running proxy.
    pub async fn set_destination(&self, destination: &str) -> Result<()> {
        self.client.set_destination(destination).await
    }

    /// Whether the proxy currently answers its health endpoint.
    pub async fn is_healthy(&self) -> bool {
        self.client.health().await
    }

    /// Verify that requests matching `descriptor` were observed according to
    /// `criteria`, against a journal snapshot fetched now.
    pub async fn verify(
        &self,
        descriptor: &RequestDescriptor,
        criteria: VerificationCriteria,
    ) -> Result<()> {
        let journal = self.search_journal(descriptor).await?;
        verification::verify(descriptor, criteria, &journal)
    }

    /// Verify that no request matching `descriptor` was observed.
    pub async fn verify_zero(&self, descriptor: &RequestDescriptor) -> Result<()> {
        self.verify(descriptor, never()).await
    }

    /// Verify that every request in the currently loaded simulation was
    /// observed at least once. Fail-fast: stops at the first descriptor that
    /// fails.
    pub async fn verify_all(&self) -> Result<()> {
        let simulation = self.client.get_simulation().await?;
        let client = &self.client;
        verification::verify_all(simulation.requests(), |descriptor| {
            client.search_journal(descriptor)
        })
        .await
    }

    /// Journal snapshot filtered by `descriptor`.
    pub async fn search_journal(&self, descriptor: &RequestDescriptor) -> Result<Journal> {
        self.client.search_journal(descriptor).await
    }

    fn capture_arguments(&self) -> ModeArguments {
        ModeArguments {
            headers_whitelist: self.config.capture_headers().to_vec(),
            stateful: self.config.stateful_capture,
            overwrite_duplicate: false,
        }
    }
}

impl Drop for Tether {
    fn drop(&mut self) {
        // best-effort scoped cleanup; `close` additionally waits for exit
        self.supervisor.abandon();
        self.environment.restore();
        self.workdir.purge();
    }
}
