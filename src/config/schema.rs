//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every
//! section is optional and falls back to its defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::monitor::dispatcher::DispatchOptions;
use crate::monitor::types::{Service, ServiceId};

/// Root configuration for the service monitor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    /// Scheduler, probe, and dispatch settings.
    pub monitor: MonitorSettings,

    /// Where services come from.
    pub directory: DirectoryConfig,

    /// Where observations go.
    pub health_log: HealthLogConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,

    /// Services declared inline.
    pub services: Vec<ServiceConfig>,
}

/// Monitor settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Seconds between cycles.
    pub interval_secs: u64,

    /// Per-probe timeout in seconds.
    pub probe_timeout_secs: u64,

    /// User agent sent with each probe.
    pub user_agent: String,

    /// Maximum concurrent checks. Unbounded when absent.
    pub max_concurrency: Option<usize>,

    /// Skip services whose previous check is still running.
    pub skip_in_flight: bool,

    /// Seconds to wait for in-flight checks on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            probe_timeout_secs: 10,
            user_agent: concat!("service-monitor/", env!("CARGO_PKG_VERSION")).to_string(),
            max_concurrency: None,
            skip_in_flight: false,
            shutdown_grace_secs: 12,
        }
    }
}

impl MonitorSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            max_concurrency: self.max_concurrency,
            skip_in_flight: self.skip_in_flight,
        }
    }
}

/// Service source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Optional TOML file with a `[[services]]` list, merged after the
    /// inline services.
    pub services_file: Option<PathBuf>,

    /// Reload the services file when it changes.
    pub watch: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            services_file: None,
            watch: true,
        }
    }
}

/// Health log configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HealthLogConfig {
    /// JSON-lines file to append observations to. Kept in memory when
    /// absent.
    pub path: Option<PathBuf>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// A service declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Stable identifier. Generated at load time when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// URL to probe.
    pub url: String,
}

impl From<ServiceConfig> for Service {
    fn from(config: ServiceConfig) -> Self {
        let id = match config.id {
            Some(id) => ServiceId::new(id),
            None => ServiceId::generate(),
        };
        Service::new(id, config.url)
    }
}

/// Layout of a standalone services file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServicesFile {
    pub services: Vec<ServiceConfig>,
}
