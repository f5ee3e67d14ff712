// Refresh status types.
// Scheduler state machine values and the report of a refresh cycle.

use crate::cache::MergeSummary;

/// Scheduler state. A cycle only starts from `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    #[default]
    Idle = 0,
    Refreshing = 1,
}

impl From<u8> for SchedulerState {
    fn from(v: u8) -> Self {
        match v {
            1 => SchedulerState::Refreshing,
            _ => SchedulerState::Idle,
        }
    }
}

impl SchedulerState {
    pub fn display(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Refreshing => "refreshing",
        }
    }
}

/// Which fetch a refresh cycle performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    /// Cache was empty: whole history of every owned repository.
    Full,
    /// Commits newer than the cache watermark.
    Incremental,
}

impl RefreshKind {
    pub fn display(&self) -> &'static str {
        match self {
            RefreshKind::Full => "full",
            RefreshKind::Incremental => "incremental",
        }
    }
}

/// Result of asking the scheduler for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReport {
    /// A cycle ran and merged its batch.
    Completed {
        kind: RefreshKind,
        fetched: usize,
        merge: MergeSummary,
    },
    /// Another cycle was already in flight.
    Skipped,
}
