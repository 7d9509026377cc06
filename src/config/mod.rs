//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MonitorConfig (validated, immutable)
//!
//! services file (TOML, optional):
//!     watcher.rs detects change
//!     → re-read inline + file services
//!     → MemoryDirectory::replace_services
//!     → next cycle probes the new set
//! ```
//!
//! # Design Decisions
//! - Monitor settings are fixed for the life of the process
//! - Only the service list is hot-reloaded
//! - All fields have defaults to allow minimal configs

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    DirectoryConfig, HealthLogConfig, LogFormat, MonitorConfig, MonitorSettings, ObservabilityConfig,
    ServiceConfig,
};
