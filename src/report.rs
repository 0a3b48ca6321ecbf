//! Session outcome and statistics.

use std::fmt;
use std::time::Duration;

use crate::cook::CookReport;
use crate::courier::CourierReport;
use crate::progress::ProgressSnapshot;

/// Why a session ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// End of stream or a failed read.
    Disconnected,
    Cancelled,
    /// The batch ended mid-order.
    TruncatedBatch { bytes: usize },
    /// The shop was interrupted while serving.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every order delivered and acknowledged.
    Completed,
    Aborted(AbortReason),
}

impl SessionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SessionOutcome::Completed)
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Completed => write!(f, "completed"),
            SessionOutcome::Aborted(AbortReason::Disconnected) => write!(f, "client disconnected"),
            SessionOutcome::Aborted(AbortReason::Cancelled) => write!(f, "client cancelled"),
            SessionOutcome::Aborted(AbortReason::TruncatedBatch { bytes }) => {
                write!(f, "truncated batch of {bytes} bytes")
            }
            SessionOutcome::Aborted(AbortReason::Shutdown) => write!(f, "shop shutting down"),
        }
    }
}

/// Everything known about a finished session.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub orders: usize,
    pub elapsed: Duration,
    pub cooks: Vec<CookReport>,
    pub couriers: Vec<CourierReport>,
    pub final_progress: ProgressSnapshot,
    pub peak_oven_occupancy: usize,
    pub oven_capacity: usize,
    /// Records dropped from the shared queues at teardown.
    pub swept: usize,
    pub cpu_user_s: Option<f64>,
    pub cpu_sys_s: Option<f64>,
}

impl SessionReport {
    pub(crate) fn aborted_before_start(reason: AbortReason) -> Self {
        Self::empty(SessionOutcome::Aborted(reason))
    }

    pub(crate) fn empty(outcome: SessionOutcome) -> Self {
        Self {
            outcome,
            orders: 0,
            elapsed: Duration::ZERO,
            cooks: Vec::new(),
            couriers: Vec::new(),
            final_progress: ProgressSnapshot::default(),
            peak_oven_occupancy: 0,
            oven_capacity: 0,
            swept: 0,
            cpu_user_s: None,
            cpu_sys_s: None,
        }
    }

    pub fn delivered(&self) -> usize {
        self.final_progress.delivered
    }

    pub fn oven_overflow(&self) -> bool {
        self.peak_oven_occupancy > self.oven_capacity
    }

    /// Log per-worker statistics.
    pub fn log_stats(&self) {
        log::info!(
            "[STATS] outcome={} orders={} delivered={} elapsed_ms={} peak_oven={}",
            self.outcome,
            self.orders,
            self.delivered(),
            self.elapsed.as_millis(),
            self.peak_oven_occupancy
        );
        for cook in &self.cooks {
            log::info!("[STATS] cook {} prepared {} orders", cook.id, cook.cooked);
        }
        for courier in &self.couriers {
            log::info!(
                "[STATS] courier {} delivered {} orders",
                courier.id,
                courier.delivered
            );
        }
        if let (Some(user), Some(sys)) = (self.cpu_user_s, self.cpu_sys_s) {
            log::info!("[STATS] cpu_user_s={user:.4} cpu_sys_s={sys:.4}");
        }
    }
}

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
pub(crate) fn cpu_times_seconds() -> Option<(f64, f64)> {
    use libc::{RUSAGE_SELF, getrusage, rusage};
    let zero = libc::timeval {
        tv_sec: 0,
        tv_usec: 0,
    };
    let mut usage = rusage {
        ru_utime: zero,
        ru_stime: zero,
        ru_maxrss: 0,
        ru_ixrss: 0,
        ru_idrss: 0,
        ru_isrss: 0,
        ru_minflt: 0,
        ru_majflt: 0,
        ru_nswap: 0,
        ru_inblock: 0,
        ru_oublock: 0,
        ru_msgsnd: 0,
        ru_msgrcv: 0,
        ru_nsignals: 0,
        ru_nvcsw: 0,
        ru_nivcsw: 0,
    };
    let rc = unsafe { getrusage(RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
pub(crate) fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// CPU time spent between two snapshots.
pub(crate) fn cpu_delta(
    start: Option<(f64, f64)>,
    end: Option<(f64, f64)>,
) -> (Option<f64>, Option<f64>) {
    match (start, end) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            (Some(user_end - user_start), Some(sys_end - sys_start))
        }
        _ => (None, None),
    }
}
