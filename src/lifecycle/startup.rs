//! Startup orchestration.
//!
//! Builds the monitor from a validated configuration in dependency
//! order: directory, health log, probe, checker, dispatcher, scheduler.
//! Any error here is fatal; nothing is probed until everything is built.

use std::sync::Arc;

use notify::RecommendedWatcher;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::watcher::{resolve_services, ServicesWatcher};
use crate::config::MonitorConfig;
use crate::monitor::{Checker, Dispatcher, HealthObservation, HttpProbe, Scheduler, SchedulerStatus, Service};
use crate::store::{DirectoryError, HealthLog, JsonlHealthLog, LogError, MemoryDirectory, MemoryHealthLog};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load services: {0}")]
    Directory(#[from] DirectoryError),

    #[error("failed to open health log: {0}")]
    HealthLog(#[from] LogError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("failed to watch services file: {0}")]
    Watch(#[from] notify::Error),
}

/// A fully wired monitor, ready to run.
pub struct Monitor {
    scheduler: Scheduler,
    directory: MemoryDirectory,
    _watcher: Option<RecommendedWatcher>,
}

impl Monitor {
    /// Wire every component from `config`.
    pub async fn build(config: &MonitorConfig) -> Result<Self, StartupError> {
        let inline: Vec<Service> = config.services.iter().cloned().map(Service::from).collect();
        let services_file = config.directory.services_file.as_deref();

        let directory = MemoryDirectory::new();
        directory.replace_services(resolve_services(&inline, services_file, &directory)?);
        tracing::info!(services = directory.len(), "Service directory loaded");

        let watcher = match services_file {
            Some(path) if config.directory.watch => {
                Some(ServicesWatcher::new(path, inline, directory.clone()).run()?)
            }
            _ => None,
        };

        let log: Arc<dyn HealthLog> = match &config.health_log.path {
            Some(path) => Arc::new(JsonlHealthLog::open(path).await?),
            None => {
                tracing::warn!("No health log path configured, observations kept in memory only");
                Arc::new(MemoryHealthLog::new())
            }
        };

        let settings = &config.monitor;
        let probe = HttpProbe::new(settings.probe_timeout(), &settings.user_agent)?;
        let checker = Checker::new(Arc::new(probe), Arc::new(directory.clone()), log);
        let dispatcher = Arc::new(Dispatcher::with_options(
            Arc::new(checker),
            settings.dispatch_options(),
        ));
        let scheduler = Scheduler::new(Arc::new(directory.clone()), dispatcher, settings.interval())
            .with_shutdown_grace(settings.shutdown_grace());

        tracing::info!(
            interval_secs = settings.interval_secs,
            probe_timeout_secs = settings.probe_timeout_secs,
            max_concurrency = ?settings.max_concurrency,
            skip_in_flight = settings.skip_in_flight,
            "Monitor configured"
        );

        Ok(Self {
            scheduler,
            directory,
            _watcher: watcher,
        })
    }

    pub fn directory(&self) -> &MemoryDirectory {
        &self.directory
    }

    pub fn status(&self) -> Arc<SchedulerStatus> {
        self.scheduler.status()
    }

    /// Run a single cycle and wait for all its checks.
    pub async fn run_once(self) -> Vec<HealthObservation> {
        match self.scheduler.run_cycle().await {
            Some(cycle) => cycle.join().await,
            None => Vec::new(),
        }
    }

    /// Run until `shutdown` fires, then drain in-flight checks.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) {
        let Monitor {
            scheduler,
            _watcher: watcher,
            ..
        } = self;
        scheduler.run(shutdown).await;
        drop(watcher);
    }
}
