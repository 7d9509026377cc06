//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use service_monitor::monitor::{HealthObservation, HealthStatus, Probe, ProbeOutcome, Service, ServiceId};
use service_monitor::store::{Directory, DirectoryError, HealthLog, LogError, MemoryDirectory};

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Custom",
    }
}

/// Start a backend answering every request with `status` after `delay`.
/// Returns the bound address.
pub async fn start_backend(status: u16, delay: Duration) -> SocketAddr {
    start_backend_with_headers(status, delay, Vec::new()).await
}

/// Like `start_backend`, with extra response headers.
pub async fn start_backend_with_headers(
    status: u16,
    delay: Duration,
    headers: Vec<(String, String)>,
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let headers = Arc::new(headers);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let headers = headers.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        let _ = socket.read(&mut buf).await;
                        tokio::time::sleep(delay).await;

                        let extra: String = headers
                            .iter()
                            .map(|(k, v)| format!("{}: {}\r\n", k, v))
                            .collect();
                        let response = format!(
                            "HTTP/1.1 {} {}\r\n{}Content-Length: 0\r\nConnection: close\r\n\r\n",
                            status,
                            reason(status),
                            extra
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });

    addr
}

/// An address with nothing listening on it.
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Probe with a scripted delay and status per URL.
pub struct ScriptedProbe {
    script: HashMap<String, (Duration, HealthStatus)>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(script: &[(&str, u64, HealthStatus)]) -> Self {
        Self {
            script: script
                .iter()
                .map(|(url, ms, status)| (url.to_string(), (Duration::from_millis(*ms), *status)))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, status) = self
            .script
            .get(url)
            .copied()
            .unwrap_or((Duration::ZERO, HealthStatus::Offline));
        tokio::time::sleep(delay).await;
        ProbeOutcome {
            status,
            latency_ms: delay.as_millis() as u64,
            status_code: None,
        }
    }
}

/// Probe whose n-th call (across all URLs) uses the n-th scripted step.
pub struct SequenceProbe {
    steps: Vec<(Duration, HealthStatus)>,
    calls: AtomicUsize,
}

impl SequenceProbe {
    pub fn new(steps: &[(u64, HealthStatus)]) -> Self {
        Self {
            steps: steps
                .iter()
                .map(|(ms, status)| (Duration::from_millis(*ms), *status))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Probe for SequenceProbe {
    async fn probe(&self, _url: &str) -> ProbeOutcome {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, status) = self
            .steps
            .get(n)
            .copied()
            .unwrap_or((Duration::ZERO, HealthStatus::Offline));
        tokio::time::sleep(delay).await;
        ProbeOutcome {
            status,
            latency_ms: delay.as_millis() as u64,
            status_code: None,
        }
    }
}

/// Directory wrapper that fails the first `fail_lists` listings and
/// every health write for the ids in `fail_writes`.
pub struct FlakyDirectory {
    inner: MemoryDirectory,
    fail_lists: AtomicUsize,
    fail_writes: Vec<ServiceId>,
    pub list_calls: AtomicUsize,
}

impl FlakyDirectory {
    pub fn new(inner: MemoryDirectory, fail_lists: usize, fail_writes: &[&str]) -> Self {
        Self {
            inner,
            fail_lists: AtomicUsize::new(fail_lists),
            fail_writes: fail_writes.iter().map(|id| ServiceId::from(*id)).collect(),
            list_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Directory for FlakyDirectory {
    async fn list_services(&self) -> Result<Vec<Service>, DirectoryError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_lists.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_lists.store(remaining - 1, Ordering::SeqCst);
            return Err(DirectoryError::Unavailable("database is locked".into()));
        }
        self.inner.list_services().await
    }

    async fn set_current_health(
        &self,
        id: &ServiceId,
        status: HealthStatus,
        observed_at: DateTime<Utc>,
    ) -> Result<(), DirectoryError> {
        if self.fail_writes.contains(id) {
            return Err(DirectoryError::Unavailable("write rejected".into()));
        }
        self.inner.set_current_health(id, status, observed_at).await
    }
}

/// Health log that records the order in which appends complete.
#[derive(Clone, Default)]
pub struct RecordingLog {
    entries: Arc<Mutex<Vec<HealthObservation>>>,
}

impl RecordingLog {
    pub fn entries(&self) -> Vec<HealthObservation> {
        self.entries.lock().unwrap().clone()
    }

    pub fn order(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .map(|o| o.service_id.to_string())
            .collect()
    }
}

#[async_trait]
impl HealthLog for RecordingLog {
    async fn append(&self, observation: &HealthObservation) -> Result<(), LogError> {
        self.entries.lock().unwrap().push(observation.clone());
        Ok(())
    }
}
