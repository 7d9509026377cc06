//! Per-service health check.
//!
//! Probes one service, then writes the result to both sinks:
//!
//! ```text
//! probe ──▶ observation ─┬─▶ Directory::set_current_health   (a)
//!                        └─▶ HealthLog::append               (b)
//! ```
//!
//! (a) and (b) run concurrently and independently. A failure in one is
//! logged and never prevents or undoes the other.

use std::sync::Arc;

use chrono::Utc;

use crate::monitor::probe::Probe;
use crate::monitor::types::{HealthObservation, Service};
use crate::observability::metrics;
use crate::store::{Directory, HealthLog};

pub struct Checker {
    probe: Arc<dyn Probe>,
    directory: Arc<dyn Directory>,
    log: Arc<dyn HealthLog>,
}

impl Checker {
    pub fn new(probe: Arc<dyn Probe>, directory: Arc<dyn Directory>, log: Arc<dyn HealthLog>) -> Self {
        Self {
            probe,
            directory,
            log,
        }
    }

    /// Check a single service. Never fails: persistence errors are
    /// reported to the operator log and dropped.
    pub async fn check(&self, service: &Service) -> HealthObservation {
        let outcome = self.probe.probe(&service.url).await;

        let observation = HealthObservation {
            service_id: service.id.clone(),
            url: service.url.clone(),
            status: outcome.status,
            latency_ms: outcome.latency_ms,
            observed_at: Utc::now(),
        };

        metrics::record_probe(service.id.as_str(), outcome.status, outcome.latency_ms);

        let (current, history) = tokio::join!(
            self.directory
                .set_current_health(&service.id, observation.status, observation.observed_at),
            self.log.append(&observation),
        );

        if let Err(e) = current {
            tracing::error!(
                service_id = %service.id,
                url = %service.url,
                error = %e,
                "Health check: failed to update current status"
            );
            metrics::record_write_failure("directory");
        }

        if let Err(e) = history {
            tracing::error!(
                service_id = %service.id,
                url = %service.url,
                error = %e,
                "Health check: failed to append to health log"
            );
            metrics::record_write_failure("health_log");
        }

        tracing::debug!(
            service_id = %service.id,
            status = %observation.status,
            latency_ms = observation.latency_ms,
            "Health check complete"
        );

        observation
    }
}
