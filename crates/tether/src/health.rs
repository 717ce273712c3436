//! Health polling for the external proxy.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Default boot timeout before giving up on the proxy.
pub const DEFAULT_BOOT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default fixed backoff between health probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Repeatedly invoke `probe` with fixed backoff until it reports healthy or
/// the elapsed wall-clock time exceeds `timeout`.
///
/// The probe is transport-agnostic; the caller supplies whatever HTTP (or
/// other) check makes sense. Polling is cooperative: the task sleeps between
/// probes and can only be cancelled by dropping the future. The failure names
/// the configured timeout so a slow-booting proxy is diagnosable from the
/// test output alone.
pub async fn wait_until_healthy<F, Fut>(
    mut probe: F,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if probe().await {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::BootTimeout { timeout });
        }
        sleep(poll_interval).await;
    }
}
