//! Probe behaviour against real sockets.

use std::time::Duration;

use service_monitor::monitor::{HealthStatus, HttpProbe, Probe, DEFAULT_PROBE_TIMEOUT};

mod common;

fn probe(timeout: Duration) -> HttpProbe {
    HttpProbe::new(timeout, "service-monitor-test").unwrap()
}

#[tokio::test]
async fn test_online_with_latency() {
    let addr = common::start_backend(200, Duration::from_millis(50)).await;

    let outcome = probe(Duration::from_secs(5)).probe(&format!("http://{}/", addr)).await;

    assert_eq!(outcome.status, HealthStatus::Online);
    assert_eq!(outcome.status_code, Some(200));
    assert!(outcome.latency_ms >= 50, "latency {} below backend delay", outcome.latency_ms);
    assert!(outcome.latency_ms < 2_000, "latency {} unexpectedly high", outcome.latency_ms);
}

#[tokio::test]
async fn test_status_code_boundaries() {
    let cases = [
        (200, HealthStatus::Online),
        (204, HealthStatus::Online),
        // No Location header, so the redirect is not followed.
        (302, HealthStatus::Online),
        (399, HealthStatus::Online),
        (400, HealthStatus::Offline),
        (404, HealthStatus::Offline),
        (500, HealthStatus::Offline),
        (503, HealthStatus::Offline),
    ];

    let probe = probe(Duration::from_secs(5));
    for (code, expected) in cases {
        let addr = common::start_backend(code, Duration::ZERO).await;
        let outcome = probe.probe(&format!("http://{}/", addr)).await;
        assert_eq!(outcome.status, expected, "status code {}", code);
        assert_eq!(outcome.status_code, Some(code));
    }
}

#[tokio::test]
async fn test_redirect_is_followed_to_final_status() {
    let target = common::start_backend(500, Duration::ZERO).await;
    let origin = common::start_backend_with_headers(
        302,
        Duration::ZERO,
        vec![("Location".into(), format!("http://{}/down", target))],
    )
    .await;

    let outcome = probe(Duration::from_secs(5)).probe(&format!("http://{}/", origin)).await;

    assert_eq!(outcome.status, HealthStatus::Offline);
    assert_eq!(outcome.status_code, Some(500));
}

#[tokio::test]
async fn test_connection_refused() {
    let addr = common::closed_addr();
    let outcome = probe(Duration::from_secs(5)).probe(&format!("http://{}/", addr)).await;
    assert_eq!(outcome.status, HealthStatus::Offline);
    assert_eq!(outcome.status_code, None);
}

#[tokio::test]
async fn test_timeout_latency_includes_timeout() {
    let addr = common::start_silent_backend().await;
    let timeout = Duration::from_millis(500);

    let outcome = probe(timeout).probe(&format!("http://{}/", addr)).await;

    assert_eq!(outcome.status, HealthStatus::Offline);
    assert_eq!(outcome.status_code, None);
    assert!(outcome.latency_ms >= 500, "latency {} below timeout", outcome.latency_ms);
}

#[tokio::test]
async fn test_default_timeout_never_responding_endpoint() {
    let addr = common::start_silent_backend().await;

    let outcome = probe(DEFAULT_PROBE_TIMEOUT).probe(&format!("http://{}/", addr)).await;

    assert_eq!(outcome.status, HealthStatus::Offline);
    assert!(outcome.latency_ms >= 10_000, "latency {} below 10s", outcome.latency_ms);
}

#[tokio::test]
async fn test_malformed_urls() {
    let probe = probe(Duration::from_secs(1));
    for url in ["", "::::", "http://", "mailto:ops@example.test", "no-scheme.test"] {
        let outcome = probe.probe(url).await;
        assert_eq!(outcome.status, HealthStatus::Offline, "url {:?}", url);
    }
}

#[tokio::test]
async fn test_repeated_probes_release_connections() {
    let addr = common::start_backend(200, Duration::ZERO).await;
    let probe = probe(Duration::from_secs(5));
    let url = format!("http://{}/", addr);

    for _ in 0..200 {
        assert_eq!(probe.probe(&url).await.status, HealthStatus::Online);
    }
}
