//! Shared helpers for orchestrator integration tests.
//!
//! The external proxy's control API is doubled with wiremock; no real proxy
//! binary is involved.

// not every test binary uses every helper
#![allow(dead_code)]

use std::time::Duration;
use tether::{remote_configs, Mode, NoopEnvironment, Tether};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Route library logs to the test output when `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An orchestrator attached to the mock control API as a remote instance,
/// with a noop environment so tests never touch process-global proxy
/// variables.
pub fn remote_tether(server: &MockServer, mode: Mode) -> Tether {
    init_tracing();
    let config = remote_configs()
        .host("127.0.0.1")
        .admin_port(server.address().port())
        .boot_timeout(Duration::from_millis(500))
        .poll_interval(Duration::from_millis(10))
        .build()
        .expect("remote config");
    Tether::with_environment(config, mode, Box::new(NoopEnvironment))
}

/// Mount the endpoints every successful `start()` touches: journal reset,
/// health, mode change.
pub async fn mount_startup_endpoints(server: &MockServer) {
    Mock::given(method("DELETE"))
        .and(path("/api/v2/journal"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "proxy is healthy"
        })))
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/hoverfly/mode"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// A two-pair simulation document in control-API form.
pub fn sample_simulation() -> serde_json::Value {
    serde_json::json!({
        "data": {
            "pairs": [
                {
                    "request": {
                        "method": [{"matcher": "exact", "value": "GET"}],
                        "destination": [{"matcher": "exact", "value": "www.my-test.com"}],
                        "path": [{"matcher": "exact", "value": "/api/bookings/1"}]
                    },
                    "response": {"status": 200, "body": "{\"bookingId\":\"1\"}"}
                },
                {
                    "request": {
                        "method": [{"matcher": "exact", "value": "POST"}],
                        "destination": [{"matcher": "exact", "value": "www.my-test.com"}],
                        "path": [{"matcher": "exact", "value": "/api/bookings"}]
                    },
                    "response": {"status": 201, "body": ""}
                }
            ],
            "globalActions": {"delays": []}
        },
        "meta": {"schemaVersion": "v5.2"}
    })
}

/// A journal snapshot containing the given observed requests.
pub fn journal_with(requests: Vec<serde_json::Value>) -> serde_json::Value {
    let total = requests.len();
    let entries: Vec<_> = requests
        .into_iter()
        .map(|request| {
            serde_json::json!({
                "request": request,
                "response": {"status": 200, "body": ""},
                "mode": "simulate",
                "timeStarted": "2024-03-15T09:59:00.635Z",
                "latency": 1.0
            })
        })
        .collect();
    serde_json::json!({
        "journal": entries,
        "offset": 0,
        "limit": 25,
        "total": total
    })
}

pub fn observed(method: &str, destination: &str, path: &str) -> serde_json::Value {
    serde_json::json!({
        "method": method,
        "scheme": "http",
        "destination": destination,
        "path": path,
        "query": "",
        "body": "",
        "headers": {}
    })
}
