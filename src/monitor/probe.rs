//! Single-service reachability probe.
//!
//! # Responsibilities
//! - Issue one GET against a service URL under a hard timeout
//! - Measure wall-clock latency, including the timeout when it fires
//! - Classify the result as online/offline
//!
//! # Design Decisions
//! - Failures are outcomes, not errors: every path yields a `ProbeOutcome`
//! - The response is dropped unread, releasing the connection on every path
//! - Redirects are followed by the client; the final status is classified

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::time;
use url::Url;

use crate::monitor::types::HealthStatus;

/// Upper bound on a single probe attempt.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub status: HealthStatus,
    pub latency_ms: u64,
    /// Final HTTP status code, when a response arrived at all.
    pub status_code: Option<u16>,
}

impl ProbeOutcome {
    fn offline(elapsed: Duration) -> Self {
        Self {
            status: HealthStatus::Offline,
            latency_ms: duration_to_millis(elapsed),
            status_code: None,
        }
    }
}

fn duration_to_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// A bounded-time reachability check.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// HTTP(S) probe backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    /// Build a probe with the given timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();

        let parsed = match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
            Ok(parsed) => {
                tracing::debug!(url = %url, scheme = parsed.scheme(), "Probe skipped: unsupported scheme");
                return ProbeOutcome::offline(start.elapsed());
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Probe skipped: malformed url");
                return ProbeOutcome::offline(start.elapsed());
            }
        };

        let result = time::timeout(self.timeout, self.client.get(parsed).send()).await;
        let elapsed = start.elapsed();

        match result {
            Ok(Ok(response)) => {
                let code = response.status().as_u16();
                drop(response);
                let status = HealthStatus::from_status_code(code);
                if !status.is_online() {
                    tracing::debug!(url = %url, status_code = code, "Probe failed: non-success status");
                }
                ProbeOutcome {
                    status,
                    latency_ms: duration_to_millis(elapsed),
                    status_code: Some(code),
                }
            }
            Ok(Err(e)) => {
                tracing::debug!(url = %url, error = %e, "Probe failed: transport error");
                ProbeOutcome::offline(elapsed)
            }
            Err(_) => {
                tracing::debug!(url = %url, timeout = ?self.timeout, "Probe failed: timeout");
                ProbeOutcome::offline(elapsed)
            }
        }
    }
}
