//! Builder for a locally managed proxy process.

use super::{default_timeouts, validate_ports, Config, DEFAULT_HOST, DEFAULT_SCHEME};
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Middleware the proxy shells out to for each request/response.
#[derive(Debug, Clone)]
pub struct Middleware {
    /// Interpreter or binary, e.g. `python3`.
    pub binary: String,
    /// Script file copied into the proxy working directory.
    pub script: PathBuf,
}

/// Builder for a proxy instance whose process lifecycle is managed by the
/// orchestrator.
#[derive(Debug, Clone, Default)]
pub struct LocalConfig {
    binary: Option<PathBuf>,
    proxy_port: Option<u16>,
    admin_port: Option<u16>,
    destination: Option<String>,
    capture_headers: Vec<String>,
    stateful_capture: bool,
    webserver: bool,
    ssl_certificate: Option<PathBuf>,
    ssl_key: Option<PathBuf>,
    tls_verification_disabled: bool,
    plain_http_tunneling: bool,
    middleware: Option<Middleware>,
    upstream_proxy: Option<String>,
    boot_timeout: Option<Duration>,
    poll_interval: Option<Duration>,
    shutdown_grace: Option<Duration>,
}

impl LocalConfig {
    /// Path of the separately distributed proxy binary to launch.
    pub fn binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary = Some(path.into());
        self
    }

    pub fn proxy_port(mut self, port: u16) -> Self {
        self.proxy_port = Some(port);
        self
    }

    pub fn admin_port(mut self, port: u16) -> Self {
        self.admin_port = Some(port);
        self
    }

    /// Restrict interception to destinations matching this filter.
    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Record only these headers in capture mode.
    pub fn capture_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capture_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Record all headers in capture mode.
    pub fn capture_all_headers(mut self) -> Self {
        self.capture_headers = vec!["*".to_string()];
        self
    }

    /// Record state transitions while capturing sequences of stateful
    /// interactions.
    pub fn enable_stateful_capture(mut self) -> Self {
        self.stateful_capture = true;
        self
    }

    /// Run the proxy as a plain webserver instead of an intercepting proxy.
    pub fn as_webserver(mut self) -> Self {
        self.webserver = true;
        self
    }

    /// PEM certificate overriding the proxy's default self-signed one.
    pub fn ssl_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.ssl_certificate = Some(path.into());
        self
    }

    /// PEM key overriding the proxy's default key.
    pub fn ssl_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.ssl_key = Some(path.into());
        self
    }

    /// Skip upstream TLS certificate verification.
    pub fn disable_tls_verification(mut self) -> Self {
        self.tls_verification_disabled = true;
        self
    }

    /// Tunnel plain HTTP through CONNECT requests.
    pub fn plain_http_tunneling(mut self) -> Self {
        self.plain_http_tunneling = true;
        self
    }

    /// Shell out to `binary script` as request/response middleware. The
    /// script is copied next to the proxy binary's working directory.
    pub fn middleware(mut self, binary: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        self.middleware = Some(Middleware {
            binary: binary.into(),
            script: script.into(),
        });
        self
    }

    /// Upstream proxy the external proxy connects through, e.g.
    /// `127.0.0.1:8500`.
    pub fn upstream_proxy(mut self, address: impl Into<String>) -> Self {
        self.upstream_proxy = Some(address.into());
        self
    }

    /// Override the default 10 s boot timeout.
    pub fn boot_timeout(mut self, timeout: Duration) -> Self {
        self.boot_timeout = Some(timeout);
        self
    }

    /// Override the default 100 ms health poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Override the default 5 s shutdown grace period.
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = Some(grace);
        self
    }

    /// Validate and produce the immutable configuration.
    pub fn build(self) -> Result<Config> {
        let binary = self.binary.ok_or_else(|| {
            Error::InvalidConfig("a local instance needs the proxy binary path".to_string())
        })?;
        if self.ssl_key.is_some() != self.ssl_certificate.is_some() {
            return Err(Error::InvalidConfig(
                "ssl certificate and key must be configured together".to_string(),
            ));
        }
        let (proxy_port, admin_port) = validate_ports(self.proxy_port, self.admin_port)?;
        let (boot_timeout, poll_interval, shutdown_grace) = default_timeouts();

        Ok(Config {
            scheme: DEFAULT_SCHEME.to_string(),
            host: DEFAULT_HOST.to_string(),
            proxy_port,
            admin_port,
            remote: false,
            destination: self.destination,
            capture_headers: self.capture_headers,
            stateful_capture: self.stateful_capture,
            webserver: self.webserver,
            binary: Some(binary),
            ssl_certificate: self.ssl_certificate,
            ssl_key: self.ssl_key,
            tls_verification_disabled: self.tls_verification_disabled,
            plain_http_tunneling: self.plain_http_tunneling,
            middleware: self.middleware,
            upstream_proxy: self.upstream_proxy,
            boot_timeout: self.boot_timeout.unwrap_or(boot_timeout),
            poll_interval: self.poll_interval.unwrap_or(poll_interval),
            shutdown_grace: self.shutdown_grace.unwrap_or(shutdown_grace),
        })
    }
}
