//! Journal wire model.
//!
//! The journal is the external proxy's log of requests it actually observed
//! during a session. It is fetched on every verification query and treated as
//! a read-only snapshot; nothing in here is cached across calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A journal snapshot returned by the control API's search endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Journal {
    #[serde(default)]
    pub journal: Vec<JournalEntry>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub total: usize,
}

impl Journal {
    pub fn entries(&self) -> &[JournalEntry] {
        &self.journal
    }

    pub fn is_empty(&self) -> bool {
        self.journal.is_empty()
    }
}

/// A single observed request/response exchange.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub request: ObservedRequest,
    /// Response the proxy served; opaque here, kept for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    /// Mode the proxy was in when the exchange happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_started: Option<DateTime<Utc>>,
    /// Round-trip latency in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,
}

/// Concrete values of a request the proxy observed, as opposed to the
/// matcher form in [`crate::RequestDescriptor`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Raw query string as observed on the wire (`a=1&b=2`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
}

impl ObservedRequest {
    /// Look up header values case-insensitively.
    pub fn header_values(&self, name: &str) -> Option<Vec<String>> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_control_api_shape() {
        let raw = serde_json::json!({
            "journal": [{
                "request": {
                    "path": "/api/bookings",
                    "method": "POST",
                    "destination": "www.my-test.com",
                    "scheme": "http",
                    "query": "page=1",
                    "body": "{}",
                    "headers": {"Content-Type": ["application/json"]}
                },
                "response": {"status": 201, "body": ""},
                "mode": "simulate",
                "timeStarted": "2024-03-15T09:59:00.635Z",
                "latency": 2.5
            }],
            "offset": 0,
            "limit": 25,
            "total": 1
        });

        let journal: Journal = serde_json::from_value(raw).unwrap();
        assert_eq!(journal.total, 1);
        let entry = &journal.entries()[0];
        assert_eq!(entry.request.method.as_deref(), Some("POST"));
        assert_eq!(entry.mode.as_deref(), Some("simulate"));
        assert!(entry.time_started.is_some());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut request = ObservedRequest::default();
        request
            .headers
            .insert("Content-Type".into(), vec!["application/json".into()]);
        assert!(request.header_values("content-type").is_some());
        assert!(request.header_values("Accept").is_none());
    }
}
