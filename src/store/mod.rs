//! Persistence ports consumed by the monitor.
//!
//! # Data Flow
//! ```text
//! Scheduler ──list_services()──▶ Directory
//! Checker ──set_current_health()──▶ Directory   (overwrite, last write wins)
//! Checker ──append()──▶ HealthLog                (append-only history)
//! HealthLog ──observations──▶ uptime.rs          (hourly/daily roll-up)
//! ```
//!
//! # Design Decisions
//! - The two sinks are independent; there is no transaction spanning them
//! - Implementations must tolerate concurrent writers
//! - The monitor only sees the traits; storage engines live behind them

pub mod jsonl;
pub mod memory;
pub mod uptime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::monitor::types::{HealthObservation, HealthStatus, Service, ServiceId};

pub use jsonl::JsonlHealthLog;
pub use memory::{MemoryDirectory, MemoryHealthLog};

/// Errors raised by the service directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The backing store could not be read or written.
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// The service is not registered.
    #[error("service not found: {0}")]
    NotFound(ServiceId),

    /// A services file could not be read.
    #[error("failed to read services file: {0}")]
    Io(#[from] std::io::Error),

    /// A services file could not be parsed.
    #[error("failed to parse services file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A services file parsed but holds invalid entries.
    #[error("invalid services file: {0}")]
    Invalid(String),
}

/// Errors raised by the time-series health log.
#[derive(Debug, Error)]
pub enum LogError {
    /// The sink rejected the write.
    #[error("health log unavailable: {0}")]
    Unavailable(String),

    #[error("health log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("health log encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Source of truth for which services exist, and holder of their
/// current-health projection.
#[async_trait]
pub trait Directory: Send + Sync {
    /// List every registered service.
    async fn list_services(&self) -> Result<Vec<Service>, DirectoryError>;

    /// Overwrite the current health of a service.
    async fn set_current_health(
        &self,
        id: &ServiceId,
        status: HealthStatus,
        observed_at: DateTime<Utc>,
    ) -> Result<(), DirectoryError>;
}

/// Append-only sink for health observations.
#[async_trait]
pub trait HealthLog: Send + Sync {
    async fn append(&self, observation: &HealthObservation) -> Result<(), LogError>;
}
