//! Builder for an externally managed proxy instance.

use super::{default_timeouts, Config, DEFAULT_HOST, DEFAULT_SCHEME};
use crate::error::Result;
use std::time::Duration;

const DEFAULT_REMOTE_PROXY_PORT: u16 = 8500;
const DEFAULT_REMOTE_ADMIN_PORT: u16 = 8888;

/// Builder for a proxy instance that is already running somewhere else.
/// Starting the orchestrator then skips process launch and only clears the
/// remote journal before health polling.
#[derive(Debug, Clone, Default)]
pub struct RemoteConfig {
    scheme: Option<String>,
    host: Option<String>,
    proxy_port: Option<u16>,
    admin_port: Option<u16>,
    destination: Option<String>,
    capture_headers: Vec<String>,
    stateful_capture: bool,
    boot_timeout: Option<Duration>,
    poll_interval: Option<Duration>,
}

impl RemoteConfig {
    /// Scheme of the control API endpoint, `http` by default.
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
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

    /// Record state transitions while capturing.
    pub fn enable_stateful_capture(mut self) -> Self {
        self.stateful_capture = true;
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

    /// Validate and produce the immutable configuration.
    pub fn build(self) -> Result<Config> {
        let (boot_timeout, poll_interval, shutdown_grace) = default_timeouts();

        Ok(Config {
            scheme: self.scheme.unwrap_or_else(|| DEFAULT_SCHEME.to_string()),
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            proxy_port: self.proxy_port.unwrap_or(DEFAULT_REMOTE_PROXY_PORT),
            admin_port: self.admin_port.unwrap_or(DEFAULT_REMOTE_ADMIN_PORT),
            remote: true,
            destination: self.destination,
            capture_headers: self.capture_headers,
            stateful_capture: self.stateful_capture,
            webserver: false,
            binary: None,
            ssl_certificate: None,
            ssl_key: None,
            tls_verification_disabled: false,
            plain_http_tunneling: false,
            middleware: None,
            upstream_proxy: None,
            boot_timeout: self.boot_timeout.unwrap_or(boot_timeout),
            poll_interval: self.poll_interval.unwrap_or(poll_interval),
            shutdown_grace,
        })
    }
}
