//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! scheduler / dispatcher / checker
//!     → logging.rs (structured events: service_id, url, status, latency_ms)
//!     → metrics.rs (probe counters, latency histogram, in-flight gauge)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
