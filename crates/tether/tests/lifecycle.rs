//! Orchestrator lifecycle tests against a mock control API.

mod common;

use common::{mount_startup_endpoints, remote_tether, sample_simulation};
use std::time::Duration;
use tether::{
    local_configs, remote_configs, Error, LifecycleState, Mode, NoopEnvironment, Simulation,
    SimulationSource, Tether,
};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn remote_start_skips_process_launch_and_clears_the_journal() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/journal"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/hoverfly/mode"))
        .and(body_json(serde_json::json!({"mode": "simulate"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut proxy = remote_tether(&server, Mode::Simulate);
    proxy.start().await.unwrap();
    assert_eq!(proxy.state(), LifecycleState::Healthy);

    proxy.close().await;
    assert_eq!(proxy.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn capture_mode_sends_the_configured_header_allow_list() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/journal"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/hoverfly/mode"))
        .and(body_json(serde_json::json!({
            "mode": "capture",
            "arguments": {"headersWhitelist": ["Authorization"]}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = remote_configs()
        .host("127.0.0.1")
        .admin_port(server.address().port())
        .capture_headers(["Authorization"])
        .boot_timeout(Duration::from_millis(500))
        .poll_interval(Duration::from_millis(10))
        .build()
        .unwrap();
    let mut proxy = Tether::with_environment(config, Mode::Capture, Box::new(NoopEnvironment));
    proxy.start().await.unwrap();
    proxy.close().await;
}

#[tokio::test]
async fn destination_filter_is_applied_on_start() {
    let server = MockServer::start().await;
    mount_startup_endpoints(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/hoverfly/destination"))
        .and(body_json(serde_json::json!({"destination": "my-test.com"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = remote_configs()
        .host("127.0.0.1")
        .admin_port(server.address().port())
        .destination("my-test.com")
        .boot_timeout(Duration::from_millis(500))
        .poll_interval(Duration::from_millis(10))
        .build()
        .unwrap();
    let mut proxy = Tether::with_environment(config, Mode::Simulate, Box::new(NoopEnvironment));
    proxy.start().await.unwrap();
    proxy.close().await;
}

#[tokio::test]
async fn never_healthy_server_fails_start_with_boot_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut proxy = remote_tether(&server, Mode::Simulate);
    let err = proxy.start().await.unwrap_err();
    match err {
        Error::BootTimeout { timeout } => assert_eq!(timeout, Duration::from_millis(500)),
        other => panic!("unexpected error: {other}"),
    }

    // cleanup after a failed start is still safe
    proxy.close().await;
    assert_eq!(proxy.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn start_is_a_noop_when_already_running() {
    let server = MockServer::start().await;
    mount_startup_endpoints(&server).await;

    let mut proxy = remote_tether(&server, Mode::Simulate);
    proxy.start().await.unwrap();
    proxy.start().await.unwrap();
    assert_eq!(proxy.state(), LifecycleState::Healthy);
    proxy.close().await;
}

#[tokio::test]
async fn close_before_start_and_twice_in_a_row_is_safe() {
    let server = MockServer::start().await;
    let mut proxy = remote_tether(&server, Mode::Simulate);

    proxy.close().await;
    proxy.close().await;
    assert_eq!(proxy.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn local_start_fails_fast_on_a_missing_binary() {
    let config = local_configs()
        .binary("/no/such/proxy-binary")
        .boot_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let mut proxy = Tether::with_environment(config, Mode::Simulate, Box::new(NoopEnvironment));

    let err = proxy.start().await.unwrap_err();
    assert!(matches!(err, Error::ProcessStart { .. }));

    proxy.close().await;
}

#[tokio::test]
async fn local_start_refuses_a_port_already_in_use() {
    let taken = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = taken.local_addr().unwrap().port();
    let admin = port_check::free_local_port().unwrap();

    let config = local_configs()
        .binary("/no/such/proxy-binary")
        .proxy_port(port)
        .admin_port(admin)
        .build()
        .unwrap();
    let mut proxy = Tether::with_environment(config, Mode::Simulate, Box::new(NoopEnvironment));

    let err = proxy.start().await.unwrap_err();
    match err {
        Error::PortInUse { port: reported } => assert_eq!(reported, port),
        other => panic!("unexpected error: {other}"),
    }
    proxy.close().await;
}

#[tokio::test]
async fn simulate_pushes_the_resolved_document() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/simulation"))
        .and(body_json(sample_simulation()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let proxy = remote_tether(&server, Mode::Simulate);
    proxy
        .simulate(SimulationSource::json(sample_simulation().to_string()))
        .await
        .unwrap();
}

#[tokio::test]
async fn exported_simulation_round_trips_through_simulate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/simulation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_simulation()))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/simulation"))
        .and(body_json(sample_simulation()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let export_path = dir.path().join("exported.json");

    let proxy = remote_tether(&server, Mode::Simulate);
    proxy.export_simulation(&export_path).await;

    // the exported document is pretty-printed and parseable
    let contents = std::fs::read_to_string(&export_path).unwrap();
    assert!(contents.contains('\n'));
    let exported: Simulation = serde_json::from_str(&contents).unwrap();
    let original: Simulation = serde_json::from_value(sample_simulation()).unwrap();
    let mut exported_pairs = exported.data.pairs.clone();
    let mut original_pairs = original.data.pairs.clone();
    exported_pairs.sort_by_key(|p| format!("{:?}", p.request));
    original_pairs.sort_by_key(|p| format!("{:?}", p.request));
    assert_eq!(exported_pairs, original_pairs);

    // loading the exported file reproduces the pair set on the server
    proxy
        .simulate(SimulationSource::file(&export_path))
        .await
        .unwrap();
}

#[tokio::test]
async fn export_overwrites_an_existing_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/simulation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_simulation()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let export_path = dir.path().join("exported.json");
    std::fs::write(&export_path, "stale contents").unwrap();

    let proxy = remote_tether(&server, Mode::Simulate);
    proxy.export_simulation(&export_path).await;

    let contents = std::fs::read_to_string(&export_path).unwrap();
    assert_ne!(contents, "stale contents");
    serde_json::from_str::<Simulation>(&contents).unwrap();
}

#[tokio::test]
async fn export_against_an_unreachable_api_preserves_the_previous_file() {
    // a port with nothing listening on it
    let port = port_check::free_local_port().unwrap();
    let config = remote_configs()
        .host("127.0.0.1")
        .admin_port(port)
        .build()
        .unwrap();
    let proxy = Tether::with_environment(config, Mode::Simulate, Box::new(NoopEnvironment));

    let dir = tempfile::tempdir().unwrap();
    let export_path = dir.path().join("exported.json");
    std::fs::write(&export_path, "previous export").unwrap();

    // logged and swallowed, no partial file, previous contents intact
    proxy.export_simulation(&export_path).await;
    assert_eq!(
        std::fs::read_to_string(&export_path).unwrap(),
        "previous export"
    );
}

#[tokio::test]
async fn reset_journal_tolerates_older_servers() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/journal"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let proxy = remote_tether(&server, Mode::Simulate);
    proxy.reset_journal().await.unwrap();
}

#[tokio::test]
async fn reset_states_tolerates_older_servers() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/state"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;

    let proxy = remote_tether(&server, Mode::Simulate);
    proxy.reset_states().await.unwrap();
}

#[tokio::test]
async fn reset_deletes_simulation_and_journal() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/simulation"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/journal"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let proxy = remote_tether(&server, Mode::Simulate);
    proxy.reset().await.unwrap();
}

#[tokio::test]
async fn active_mode_reflects_the_server_info() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/hoverfly"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "destination": ".",
            "mode": "capture",
            "version": "v1.3.2"
        })))
        .mount(&server)
        .await;

    let proxy = remote_tether(&server, Mode::Simulate);
    assert_eq!(proxy.active_mode().await.unwrap(), Mode::Capture);
    let info = proxy.info().await.unwrap();
    assert_eq!(info.version.as_deref(), Some("v1.3.2"));
}
