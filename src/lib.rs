//! Service health monitor library.

pub mod config;
pub mod lifecycle;
pub mod monitor;
pub mod observability;
pub mod store;

pub use config::MonitorConfig;
pub use lifecycle::{Monitor, Shutdown};
