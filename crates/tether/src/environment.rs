//! Explicit management of process-global proxy settings.
//!
//! Routing a test's HTTP clients through the intercepting proxy is process
//! global state. Instead of mutating it ambiently, the orchestrator drives a
//! [`SystemEnvironment`] with a paired apply/restore contract: `apply` takes
//! a snapshot before mutating, `restore` puts the snapshot back. This is not
//! safe against concurrent mutation of the same variables by other code;
//! callers serialize lifecycle transitions.

use std::collections::BTreeMap;
use std::env;
use tracing::{debug, warn};

/// Proxy settings derived from the orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub host: String,
    pub proxy_port: u16,
    /// Hosts that must bypass the proxy (the admin endpoint among them).
    pub bypass: Vec<String>,
}

impl ProxySettings {
    /// Proxy URL in the form HTTP clients expect.
    pub fn proxy_url(&self) -> String {
        format!("http://{}:{}", self.host, self.proxy_port)
    }
}

/// Apply/restore contract for whatever "system proxy settings" mean in the
/// target environment.
pub trait SystemEnvironment: Send {
    /// Snapshot the current state, then route traffic through the proxy.
    fn apply(&mut self, settings: &ProxySettings);
    /// Restore the snapshot taken by the last `apply`. A restore without a
    /// prior apply is a no-op; so is a second restore.
    fn restore(&mut self);
}

const PROXY_VARS: [&str; 6] = [
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "NO_PROXY",
    "no_proxy",
];

/// Default environment: the conventional `HTTP_PROXY`/`HTTPS_PROXY`/
/// `NO_PROXY` variables honored by most HTTP clients.
#[derive(Debug, Default)]
pub struct EnvVarEnvironment {
    snapshot: Option<BTreeMap<&'static str, Option<String>>>,
}

impl EnvVarEnvironment {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SystemEnvironment for EnvVarEnvironment {
    fn apply(&mut self, settings: &ProxySettings) {
        if self.snapshot.is_some() {
            warn!("proxy environment already applied, ignoring");
            return;
        }

        let snapshot = PROXY_VARS
            .iter()
            .map(|&name| (name, env::var(name).ok()))
            .collect();
        self.snapshot = Some(snapshot);

        let proxy_url = settings.proxy_url();
        let no_proxy = settings.bypass.join(",");
        debug!(%proxy_url, %no_proxy, "applying proxy environment variables");

        env::set_var("HTTP_PROXY", &proxy_url);
        env::set_var("http_proxy", &proxy_url);
        env::set_var("HTTPS_PROXY", &proxy_url);
        env::set_var("https_proxy", &proxy_url);
        env::set_var("NO_PROXY", &no_proxy);
        env::set_var("no_proxy", &no_proxy);
    }

    fn restore(&mut self) {
        let Some(snapshot) = self.snapshot.take() else {
            return;
        };
        debug!("restoring proxy environment variables");
        for (name, value) in snapshot {
            match value {
                Some(value) => env::set_var(name, value),
                None => env::remove_var(name),
            }
        }
    }
}

/// Environment that changes nothing, for callers that point their HTTP
/// clients at the proxy directly.
#[derive(Debug, Default)]
pub struct NoopEnvironment;

impl SystemEnvironment for NoopEnvironment {
    fn apply(&mut self, _settings: &ProxySettings) {}
    fn restore(&mut self) {}
}
