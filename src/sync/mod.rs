// Refresh scheduling module.
// Periodic and on-demand cache refreshes plus their status types.

pub mod scheduler;
pub mod status;

pub use scheduler::{RefreshScheduler, RefreshTrigger, SchedulerConfig};
pub use status::{RefreshKind, RefreshReport, SchedulerState};
