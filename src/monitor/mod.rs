//! Service health monitor.
//!
//! # Data Flow
//! ```text
//! scheduler.rs: timer tick
//!     → Directory::list_services()
//!     → dispatcher.rs: one task per service (fire-and-forget)
//!     → checker.rs: probe.rs, then two independent writes
//!           → Directory::set_current_health   (current state)
//!           → HealthLog::append               (history)
//! ```
//!
//! # Design Decisions
//! - Probe failures are `Offline` outcomes, never errors
//! - Persistence failures stop at the checker and are only logged
//! - Cycles may overlap; the last write to complete wins
//! - The monitor holds no locks of its own

pub mod checker;
pub mod dispatcher;
pub mod probe;
pub mod scheduler;
pub mod types;

pub use checker::Checker;
pub use dispatcher::{Cycle, DispatchOptions, Dispatcher};
pub use probe::{HttpProbe, Probe, ProbeOutcome, DEFAULT_PROBE_TIMEOUT};
pub use scheduler::{Scheduler, SchedulerState, SchedulerStatus};
pub use types::{CurrentHealth, HealthObservation, HealthStatus, Service, ServiceId};
