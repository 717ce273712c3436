//! HTTP client for the proxy control API.
//!
//! Thin facade over the external binary's admin endpoints. The recording,
//! matching and replay engines behind those endpoints are out of scope here;
//! this client only moves documents in and out.

use crate::error::{Error, Result};
use crate::journal::Journal;
use crate::matcher::RequestDescriptor;
use crate::mode::{Mode, ModeArguments};
use crate::simulation::Simulation;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Server-side configuration view returned by the info endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<ModeArguments>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_proxy: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModeCommand<'a> {
    mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    arguments: Option<&'a ModeArguments>,
}

#[derive(Serialize)]
struct DestinationCommand<'a> {
    destination: &'a str,
}

#[derive(Serialize)]
struct JournalSearchCommand<'a> {
    request: &'a RequestDescriptor,
}

/// Client for the proxy control API.
pub struct ControlClient {
    client: Client,
    base_url: String,
}

impl ControlClient {
    pub fn new(scheme: &str, host: &str, admin_port: u16) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                // control traffic must never be routed through the proxy
                // under test, whatever the process environment says
                .no_proxy()
                .build()
                .expect("Failed to create HTTP client"),
            base_url: format!("{scheme}://{host}:{admin_port}"),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the proxy answers its health endpoint. Unreachable servers
    /// count as unhealthy; the health poller owns retry policy.
    pub async fn health(&self) -> bool {
        let url = format!("{}/api/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("health probe failed: {e}");
                false
            }
        }
    }

    pub async fn get_simulation(&self) -> Result<Simulation> {
        let url = format!("{}/api/v2/simulation", self.base_url);
        let resp = self.client.get(&url).send().await?;
        let resp = ensure_success(resp, "get simulation").await?;
        Ok(resp.json().await?)
    }

    pub async fn set_simulation(&self, simulation: &Simulation) -> Result<()> {
        let url = format!("{}/api/v2/simulation", self.base_url);
        let resp = self.client.put(&url).json(simulation).send().await?;
        ensure_success(resp, "set simulation").await?;
        Ok(())
    }

    pub async fn delete_simulation(&self) -> Result<()> {
        let url = format!("{}/api/v2/simulation", self.base_url);
        let resp = self.client.delete(&url).send().await?;
        ensure_success(resp, "delete simulation").await?;
        Ok(())
    }

    /// Delete the journal. Older proxy versions do not expose this endpoint;
    /// those answer with [`Error::NotSupported`].
    pub async fn delete_journal(&self) -> Result<()> {
        let url = format!("{}/api/v2/journal", self.base_url);
        let resp = self.client.delete(&url).send().await?;
        ensure_supported(resp, "delete journal").await?;
        Ok(())
    }

    /// Search the journal for entries matching the descriptor.
    pub async fn search_journal(&self, descriptor: &RequestDescriptor) -> Result<Journal> {
        let url = format!("{}/api/v2/journal", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&JournalSearchCommand { request: descriptor })
            .send()
            .await?;
        let resp = ensure_success(resp, "search journal").await?;
        Ok(resp.json().await?)
    }

    /// Delete all state. Subject to the same version tolerance as
    /// [`delete_journal`](Self::delete_journal).
    pub async fn delete_states(&self) -> Result<()> {
        let url = format!("{}/api/v2/state", self.base_url);
        let resp = self.client.delete(&url).send().await?;
        ensure_supported(resp, "delete states").await?;
        Ok(())
    }

    pub async fn info(&self) -> Result<ServerInfo> {
        let url = format!("{}/api/v2/hoverfly", self.base_url);
        let resp = self.client.get(&url).send().await?;
        let resp = ensure_success(resp, "get info").await?;
        Ok(resp.json().await?)
    }

    pub async fn set_mode(&self, mode: Mode, arguments: Option<&ModeArguments>) -> Result<()> {
        let url = format!("{}/api/v2/hoverfly/mode", self.base_url);
        let resp = self
            .client
            .put(&url)
            .json(&ModeCommand {
                mode: mode.as_str(),
                arguments,
            })
            .send()
            .await?;
        ensure_success(resp, "set mode").await?;
        Ok(())
    }

    pub async fn set_destination(&self, destination: &str) -> Result<()> {
        let url = format!("{}/api/v2/hoverfly/destination", self.base_url);
        let resp = self
            .client
            .put(&url)
            .json(&DestinationCommand { destination })
            .send()
            .await?;
        ensure_success(resp, "set destination").await?;
        Ok(())
    }
}

async fn ensure_success(resp: Response, operation: &'static str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(Error::Server {
        operation,
        status: status.as_u16(),
        message,
    })
}

/// Like [`ensure_success`], but classifies a missing endpoint as
/// [`Error::NotSupported`] so callers can downgrade it to a warning.
async fn ensure_supported(resp: Response, operation: &'static str) -> Result<Response> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND || status == StatusCode::METHOD_NOT_ALLOWED {
        return Err(Error::NotSupported(operation.to_string()));
    }
    ensure_success(resp, operation).await
}
