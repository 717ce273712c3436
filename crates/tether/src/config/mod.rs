//! Orchestrator configuration.
//!
//! Built through [`LocalConfig`] (a proxy process managed by this crate) or
//! [`RemoteConfig`] (an already running instance reachable over the network).
//! `build()` validates and fills in defaults, producing an immutable
//! [`Config`].

mod local;
mod remote;

pub use local::{LocalConfig, Middleware};
pub use remote::RemoteConfig;

use crate::environment::ProxySettings;
use crate::error::{Error, Result};
use crate::health::{DEFAULT_BOOT_TIMEOUT, DEFAULT_POLL_INTERVAL};
use crate::supervisor::{free_port, DEFAULT_SHUTDOWN_GRACE};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SCHEME: &str = "http";
pub const DEFAULT_HOST: &str = "localhost";

/// Start building a configuration for a locally managed proxy process.
pub fn local_configs() -> LocalConfig {
    LocalConfig::default()
}

/// Start building a configuration for a remote proxy instance.
pub fn remote_configs() -> RemoteConfig {
    RemoteConfig::default()
}

/// Validated configuration consumed by the orchestrator.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) scheme: String,
    pub(crate) host: String,
    pub(crate) proxy_port: u16,
    pub(crate) admin_port: u16,
    pub(crate) remote: bool,
    pub(crate) destination: Option<String>,
    pub(crate) capture_headers: Vec<String>,
    pub(crate) stateful_capture: bool,
    pub(crate) webserver: bool,
    pub(crate) binary: Option<PathBuf>,
    pub(crate) ssl_certificate: Option<PathBuf>,
    pub(crate) ssl_key: Option<PathBuf>,
    pub(crate) tls_verification_disabled: bool,
    pub(crate) plain_http_tunneling: bool,
    pub(crate) middleware: Option<Middleware>,
    pub(crate) upstream_proxy: Option<String>,
    pub(crate) boot_timeout: Duration,
    pub(crate) poll_interval: Duration,
    pub(crate) shutdown_grace: Duration,
}

impl Config {
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn proxy_port(&self) -> u16 {
        self.proxy_port
    }

    pub fn admin_port(&self) -> u16 {
        self.admin_port
    }

    pub fn is_remote_instance(&self) -> bool {
        self.remote
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn capture_headers(&self) -> &[String] {
        &self.capture_headers
    }

    pub fn binary(&self) -> Option<&PathBuf> {
        self.binary.as_ref()
    }

    pub fn boot_timeout(&self) -> Duration {
        self.boot_timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    /// Proxy settings handed to the [`SystemEnvironment`] on start.
    ///
    /// [`SystemEnvironment`]: crate::environment::SystemEnvironment
    pub fn proxy_settings(&self) -> ProxySettings {
        let mut bypass = vec!["localhost".to_string(), "127.0.0.1".to_string()];
        if !bypass.contains(&self.host) {
            bypass.push(self.host.clone());
        }
        ProxySettings {
            host: self.host.clone(),
            proxy_port: self.proxy_port,
            bypass,
        }
    }

    /// File name a staged middleware script gets inside the working
    /// directory.
    pub(crate) fn middleware_script_name(&self) -> Option<String> {
        self.middleware.as_ref().and_then(|m| {
            m.script
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
    }

    /// Argument vector for the proxy binary. Cert, key and middleware script
    /// arguments use the bare names the orchestrator stages into the working
    /// directory.
    pub(crate) fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            "-db".to_string(),
            "memory".to_string(),
            "-pp".to_string(),
            self.proxy_port.to_string(),
            "-ap".to_string(),
            self.admin_port.to_string(),
        ];

        if self.ssl_certificate.is_some() {
            args.push("-cert".to_string());
            args.push("ca.crt".to_string());
        }
        if self.ssl_key.is_some() {
            args.push("-key".to_string());
            args.push("ca.key".to_string());
        }
        if self.plain_http_tunneling {
            args.push("-plain-http-tunneling".to_string());
        }
        if self.webserver {
            args.push("-webserver".to_string());
        }
        if self.tls_verification_disabled {
            args.push("-tls-verification".to_string());
            args.push("false".to_string());
        }
        if let (Some(middleware), Some(script)) =
            (self.middleware.as_ref(), self.middleware_script_name())
        {
            args.push("-middleware".to_string());
            args.push(format!("{} {}", middleware.binary, script));
        }
        if let Some(upstream) = &self.upstream_proxy {
            args.push("-upstream-proxy".to_string());
            args.push(upstream.clone());
        }

        args
    }
}

/// Shared validation: fill unset ports with OS-assigned free ones and reject
/// inconsistent combinations.
pub(crate) fn validate_ports(
    proxy_port: Option<u16>,
    admin_port: Option<u16>,
) -> Result<(u16, u16)> {
    let proxy_port = match proxy_port {
        Some(port) => port,
        None => free_port()?,
    };
    let admin_port = match admin_port {
        Some(port) => port,
        None => free_port()?,
    };
    if proxy_port == admin_port {
        return Err(Error::InvalidConfig(format!(
            "proxy port and admin port must differ, both are {proxy_port}"
        )));
    }
    Ok((proxy_port, admin_port))
}

pub(crate) fn default_timeouts() -> (Duration, Duration, Duration) {
    (
        DEFAULT_BOOT_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
        DEFAULT_SHUTDOWN_GRACE,
    )
}
