//! Supervision of the external proxy process.
//!
//! Owns the child handle for its whole lifetime: spawned on start, reaped (or
//! deliberately abandoned) on stop. Termination is best-effort by contract —
//! one terminate signal, then a bounded wait. Some platforms terminate
//! processes asynchronously and a test teardown must not block on that.

use crate::error::{Error, Result};
use std::net::TcpListener;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Default grace period for the proxy to exit after the terminate signal.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Launches and terminates the external proxy binary. At most one live child
/// per supervisor.
#[derive(Debug, Default)]
pub struct ProcessSupervisor {
    child: Option<Child>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Launch the binary with the given argument vector and working
    /// directory. Stdout/stderr are inherited so proxy diagnostics land in
    /// the test output.
    ///
    /// A second spawn while a child is live is a no-op with a warning, to
    /// tolerate double-invocation from test lifecycle hooks.
    pub fn spawn(&mut self, binary: &Path, args: &[String], workdir: &Path) -> Result<()> {
        if self.child.is_some() {
            warn!("proxy process is already running, ignoring spawn");
            return Ok(());
        }

        info!(binary = %binary.display(), "executing proxy binary");
        debug!(?args, workdir = %workdir.display(), "proxy launch arguments");

        let child = Command::new(binary)
            .args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| Error::ProcessStart {
                binary: binary.to_path_buf(),
                source,
            })?;

        self.child = Some(child);
        Ok(())
    }

    /// Request termination, then wait up to `grace` for the process to exit.
    ///
    /// If the process does not exit in time the wait is abandoned with a
    /// warning; the process is not forcibly hunted down beyond the initial
    /// terminate signal.
    pub async fn stop(&mut self, grace: Duration) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        info!("terminating proxy process");
        request_termination(&mut child);

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "proxy process exited"),
            Ok(Err(e)) => warn!("failed waiting for proxy process: {e}"),
            Err(_) => warn!(
                "timed out after {grace:?} waiting for the proxy process to terminate"
            ),
        }
    }

    /// Last-resort synchronous termination for `Drop` paths, where the
    /// bounded wait cannot run. Sends the terminate signal and abandons the
    /// handle.
    pub fn abandon(&mut self) {
        if let Some(mut child) = self.child.take() {
            warn!("abandoning proxy process without waiting for exit");
            request_termination(&mut child);
        }
    }
}

/// Pre-flight check that a port the proxy needs is free.
pub fn ensure_port_free(port: u16) -> Result<()> {
    match TcpListener::bind(("127.0.0.1", port)) {
        Ok(listener) => {
            drop(listener);
            Ok(())
        }
        Err(_) => Err(Error::PortInUse { port }),
    }
}

/// Find a free port by letting the OS assign one.
pub fn free_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    match child.id() {
        // SIGTERM so the proxy can flush and close its listeners
        Some(pid) => unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        },
        None => debug!("proxy process already exited"),
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!("failed to signal proxy process: {e}");
    }
}
