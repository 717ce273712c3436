//! Operating modes of the external proxy.

use serde::{Deserialize, Serialize};

/// Operating mode of the external proxy process.
///
/// Set when the orchestrator starts and may be changed later through the
/// control API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Record real traffic passing through the proxy.
    Capture,
    /// Serve responses from the loaded simulation.
    #[default]
    Simulate,
    /// Simulate when a pair matches, pass through otherwise.
    Spy,
    /// Generate responses through the configured middleware.
    Synthesize,
    /// Compare live responses against the loaded simulation.
    Diff,
}

impl Mode {
    /// Wire name used by the control API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Capture => "capture",
            Mode::Simulate => "simulate",
            Mode::Spy => "spy",
            Mode::Synthesize => "synthesize",
            Mode::Diff => "diff",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "capture" => Ok(Mode::Capture),
            "simulate" => Ok(Mode::Simulate),
            "spy" => Ok(Mode::Spy),
            "synthesize" => Ok(Mode::Synthesize),
            "diff" => Ok(Mode::Diff),
            other => Err(format!("unknown proxy mode: {other}")),
        }
    }
}

/// Mode-specific arguments sent alongside a mode change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeArguments {
    /// Header allow-list recorded in capture mode.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers_whitelist: Vec<String>,

    /// Record state transitions while capturing.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stateful: bool,

    /// Overwrite an existing pair when the same request is captured again.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub overwrite_duplicate: bool,
}

impl ModeArguments {
    pub fn is_empty(&self) -> bool {
        self.headers_whitelist.is_empty() && !self.stateful && !self.overwrite_duplicate
    }
}
