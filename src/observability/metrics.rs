//! Metrics collection and exposition.
//!
//! # Metrics
//! - `monitor_probes_total` (counter): probes by status
//! - `monitor_probe_latency_ms` (histogram): probe latency
//! - `monitor_service_up` (gauge): 1=online, 0=offline, per service; reset
//!   to 0 when a service leaves the directory
//! - `monitor_write_failures_total` (counter): failed writes by sink
//! - `monitor_cycles_total` (counter): dispatched cycles
//! - `monitor_cycles_skipped_total` (counter): cycles lost to a listing failure
//! - `monitor_checks_skipped_total` (counter): services skipped while still in flight
//! - `monitor_checks_in_flight` (gauge): running checks
//!
//! Recording is a no-op until `init_metrics` installs the exporter.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::monitor::types::HealthStatus;

/// Install the Prometheus exporter with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_probe(service_id: &str, status: HealthStatus, latency_ms: u64) {
    counter!("monitor_probes_total", "status" => status.as_str()).increment(1);
    histogram!("monitor_probe_latency_ms").record(latency_ms as f64);
    let up = if status.is_online() { 1.0 } else { 0.0 };
    gauge!("monitor_service_up", "service_id" => service_id.to_string()).set(up);
}

/// Zero the per-service gauge of a service that left the directory. The
/// series itself stays until the process restarts.
pub fn record_service_removed(service_id: &str) {
    gauge!("monitor_service_up", "service_id" => service_id.to_string()).set(0.0);
}

pub fn record_write_failure(sink: &'static str) {
    counter!("monitor_write_failures_total", "sink" => sink).increment(1);
}

pub fn record_cycle(services: usize) {
    counter!("monitor_cycles_total").increment(1);
    gauge!("monitor_cycle_services").set(services as f64);
}

pub fn record_cycle_skipped() {
    counter!("monitor_cycles_skipped_total").increment(1);
}

pub fn record_checks_skipped(count: usize) {
    counter!("monitor_checks_skipped_total").increment(count as u64);
}

pub fn record_checks_in_flight(count: usize) {
    gauge!("monitor_checks_in_flight").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::types::{Service, ServiceId};
    use crate::store::MemoryDirectory;

    fn service_up(rendered: &str, id: &str) -> Option<f64> {
        let prefix = format!("monitor_service_up{{service_id=\"{}\"}}", id);
        rendered
            .lines()
            .find(|line| line.starts_with(&prefix))
            .and_then(|line| line.rsplit(' ').next())
            .and_then(|value| value.parse().ok())
    }

    #[test]
    fn test_removed_services_read_down() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            let directory = MemoryDirectory::with_services([
                Service::new("a", "http://a.test"),
                Service::new("b", "http://b.test"),
                Service::new("c", "http://c.test"),
            ]);
            record_probe("a", HealthStatus::Online, 5);
            record_probe("b", HealthStatus::Online, 5);
            record_probe("c", HealthStatus::Online, 5);

            directory.replace_services(vec![Service::new("a", "http://a.test")]);
            assert!(directory.remove_service(&ServiceId::from("a")));
        });

        let rendered = handle.render();
        assert_eq!(service_up(&rendered, "a"), Some(0.0));
        assert_eq!(service_up(&rendered, "b"), Some(0.0));
        assert_eq!(service_up(&rendered, "c"), Some(0.0));
    }

    #[test]
    fn test_probe_sets_service_up() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            record_probe("up", HealthStatus::Online, 5);
            record_probe("down", HealthStatus::Offline, 5);
        });

        let rendered = handle.render();
        assert_eq!(service_up(&rendered, "up"), Some(1.0));
        assert_eq!(service_up(&rendered, "down"), Some(0.0));
    }
}
