//! Fan-out of one cycle's services to concurrent checks.
//!
//! # Responsibilities
//! - Spawn one task per service and return without waiting
//! - Track checks in flight (for shutdown drain and metrics)
//! - Optionally cap concurrency and skip services still being checked
//!
//! # Design Decisions
//! - `fan_out` never awaits; the concurrency permit is taken inside each task
//! - Tasks share nothing but the checker's sinks
//! - A panicking check is contained by its task

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use futures_util::future::join_all;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;

use crate::monitor::checker::Checker;
use crate::monitor::types::{HealthObservation, Service, ServiceId};
use crate::observability::metrics;

/// Checks currently running, globally and per service.
#[derive(Debug, Default)]
struct InFlight {
    count: AtomicUsize,
    services: DashSet<ServiceId>,
    idle: Notify,
}

/// RAII guard for one running check.
struct CheckGuard {
    in_flight: Arc<InFlight>,
    service: ServiceId,
    exclusive: bool,
}

impl CheckGuard {
    fn new(in_flight: Arc<InFlight>, service: ServiceId, exclusive: bool) -> Self {
        let count = in_flight.count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_checks_in_flight(count);
        Self {
            in_flight,
            service,
            exclusive,
        }
    }
}

impl Drop for CheckGuard {
    fn drop(&mut self) {
        if self.exclusive {
            self.in_flight.services.remove(&self.service);
        }
        let count = self.in_flight.count.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::record_checks_in_flight(count);
        if count == 0 {
            self.in_flight.idle.notify_waiters();
        }
    }
}

/// Handles for one dispatched cycle.
///
/// Dropping a `Cycle` detaches its tasks; they keep running.
#[derive(Debug)]
pub struct Cycle {
    handles: Vec<(ServiceId, JoinHandle<HealthObservation>)>,
    skipped: Vec<ServiceId>,
}

impl Cycle {
    /// Number of checks started.
    pub fn dispatched(&self) -> usize {
        self.handles.len()
    }

    /// Services not dispatched because a previous check was still running.
    pub fn skipped(&self) -> &[ServiceId] {
        &self.skipped
    }

    /// Wait for every check of this cycle to finish.
    pub async fn join(self) -> Vec<HealthObservation> {
        let (ids, handles): (Vec<_>, Vec<_>) = self.handles.into_iter().unzip();
        let results = join_all(handles).await;

        ids.into_iter()
            .zip(results)
            .filter_map(|(id, result)| match result {
                Ok(observation) => Some(observation),
                Err(e) => {
                    tracing::error!(service_id = %id, error = %e, "Health check task failed");
                    None
                }
            })
            .collect()
    }
}

/// Dispatch settings.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Maximum checks running at once; `None` means one per service.
    pub max_concurrency: Option<usize>,
    /// Skip a service whose previous check has not finished.
    pub skip_in_flight: bool,
}

pub struct Dispatcher {
    checker: Arc<Checker>,
    limiter: Option<Arc<Semaphore>>,
    skip_in_flight: bool,
    in_flight: Arc<InFlight>,
}

impl Dispatcher {
    pub fn new(checker: Arc<Checker>) -> Self {
        Self::with_options(checker, DispatchOptions::default())
    }

    pub fn with_options(checker: Arc<Checker>, options: DispatchOptions) -> Self {
        Self {
            checker,
            limiter: options
                .max_concurrency
                .map(|n| Arc::new(Semaphore::new(n.max(1)))),
            skip_in_flight: options.skip_in_flight,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Start one check per service and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn fan_out(&self, services: Vec<Service>) -> Cycle {
        let mut handles = Vec::with_capacity(services.len());
        let mut skipped = Vec::new();

        for service in services {
            if self.skip_in_flight && !self.in_flight.services.insert(service.id.clone()) {
                tracing::debug!(service_id = %service.id, "Previous check still running, skipping");
                skipped.push(service.id);
                continue;
            }

            let guard = CheckGuard::new(self.in_flight.clone(), service.id.clone(), self.skip_in_flight);
            let checker = self.checker.clone();
            let limiter = self.limiter.clone();
            let id = service.id.clone();

            let handle = tokio::spawn(async move {
                let _guard = guard;
                let _permit = match limiter {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                checker.check(&service).await
            });
            handles.push((id, handle));
        }

        if !skipped.is_empty() {
            metrics::record_checks_skipped(skipped.len());
        }

        Cycle { handles, skipped }
    }

    /// Number of checks currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Wait until no checks are running, or `grace` elapses.
    /// Returns `true` if everything drained.
    pub async fn drain(&self, grace: Duration) -> bool {
        let wait = async {
            loop {
                // Register before checking so a wakeup in between is not lost.
                let idle = self.in_flight.idle.notified();
                if self.in_flight() == 0 {
                    break;
                }
                idle.await;
            }
        };
        tokio::time::timeout(grace, wait).await.is_ok()
    }
}
