//! Periodic health check scheduler.
//!
//! # States
//! - Idle: waiting for the next tick
//! - Dispatching: fetching the service list and fanning out checks
//!
//! # State Transitions
//! ```text
//! Idle → Dispatching: timer tick (the first tick fires at startup)
//! Dispatching → Idle: as soon as fan-out has started, not when checks finish
//! ```
//!
//! A failed service listing skips the cycle; the timer keeps running.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::monitor::dispatcher::{Cycle, Dispatcher};
use crate::observability::metrics;
use crate::store::Directory;

/// How long shutdown waits for in-flight checks by default.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(12);

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle = 0,
    Dispatching = 1,
}

impl From<u8> for SchedulerState {
    fn from(val: u8) -> Self {
        match val {
            1 => SchedulerState::Dispatching,
            _ => SchedulerState::Idle,
        }
    }
}

/// Shared, lock-free view of the scheduler's progress.
#[derive(Debug, Default)]
pub struct SchedulerStatus {
    state: AtomicU8,
    cycles_started: AtomicU64,
    cycles_skipped: AtomicU64,
    services_dispatched: AtomicU64,
}

impl SchedulerStatus {
    pub fn state(&self) -> SchedulerState {
        self.state.load(Ordering::SeqCst).into()
    }

    /// Ticks that began a cycle, including skipped ones.
    pub fn cycles_started(&self) -> u64 {
        self.cycles_started.load(Ordering::SeqCst)
    }

    /// Cycles abandoned because the service list could not be fetched.
    pub fn cycles_skipped(&self) -> u64 {
        self.cycles_skipped.load(Ordering::SeqCst)
    }

    pub fn services_dispatched(&self) -> u64 {
        self.services_dispatched.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

pub struct Scheduler {
    directory: Arc<dyn Directory>,
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    shutdown_grace: Duration,
    status: Arc<SchedulerStatus>,
}

impl Scheduler {
    pub fn new(directory: Arc<dyn Directory>, dispatcher: Arc<Dispatcher>, interval: Duration) -> Self {
        Self {
            directory,
            dispatcher,
            interval,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            status: Arc::new(SchedulerStatus::default()),
        }
    }

    /// How long to wait for in-flight checks after shutdown is signalled.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn status(&self) -> Arc<SchedulerStatus> {
        self.status.clone()
    }

    /// Run a single cycle: list services and fan them out.
    ///
    /// Returns `None` when the service list could not be fetched.
    pub async fn run_cycle(&self) -> Option<Cycle> {
        self.status.set_state(SchedulerState::Dispatching);
        self.status.cycles_started.fetch_add(1, Ordering::SeqCst);

        let services = match self.directory.list_services().await {
            Ok(services) => services,
            Err(e) => {
                tracing::error!(error = %e, "Health check: failed to get services, skipping cycle");
                self.status.cycles_skipped.fetch_add(1, Ordering::SeqCst);
                metrics::record_cycle_skipped();
                self.status.set_state(SchedulerState::Idle);
                return None;
            }
        };

        let count = services.len();
        let cycle = self.dispatcher.fan_out(services);
        self.status
            .services_dispatched
            .fetch_add(cycle.dispatched() as u64, Ordering::SeqCst);
        metrics::record_cycle(count);
        self.status.set_state(SchedulerState::Idle);

        tracing::debug!(
            services = count,
            dispatched = cycle.dispatched(),
            skipped = cycle.skipped().len(),
            "Health check cycle dispatched"
        );
        Some(cycle)
    }

    /// Tick until shutdown, then drain in-flight checks.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let period = self.interval.max(Duration::from_millis(1));
        tracing::info!(interval = ?period, "Starting health checker");

        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Detach: the next tick is not gated on these checks.
                    drop(self.run_cycle().await);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health checker received shutdown signal, stopping timer");
                    break;
                }
            }
        }

        let in_flight = self.dispatcher.in_flight();
        if in_flight > 0 {
            tracing::info!(in_flight, grace = ?self.shutdown_grace, "Waiting for in-flight checks");
            if !self.dispatcher.drain(self.shutdown_grace).await {
                tracing::warn!(
                    in_flight = self.dispatcher.in_flight(),
                    "Shutdown grace elapsed with checks still running"
                );
            }
        }
        tracing::info!("Health checker stopped");
    }

    /// Spawn the scheduler loop onto the runtime.
    pub fn start(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
