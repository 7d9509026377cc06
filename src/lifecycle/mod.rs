//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build directory, log, probe → Start scheduler
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop timer → Drain in-flight checks (bounded) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - In-flight probes are never cancelled; their own timeout bounds them
//! - The drain has a deadline so a stuck sink cannot block exit forever

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{Monitor, StartupError};
