//! Graceful shutdown bookkeeping: what triggered it, in-flight tracking and
//! the drain report.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storeguard_core::StoreError;
use tokio::sync::Notify;

/// What asked the process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownSignal {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// Requested programmatically.
    Requested,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::Requested => "requested",
        })
    }
}

/// Result of a graceful shutdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownReport {
    /// Signal that started the shutdown.
    pub signal: ShutdownSignal,
    /// True if every in-flight operation finished before the drain timeout.
    pub drained: bool,
    /// Operations still running when the connection was force-closed.
    pub abandoned: usize,
    /// Time spent waiting for in-flight operations.
    pub drain_time: Duration,
    /// Error returned by the driver while closing, if any.
    pub close_error: Option<StoreError>,
}

#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub(crate) fn enter(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            tracker: Arc::clone(self),
        }
    }

    /// Waits until no guard is alive.
    pub(crate) async fn wait_idle(&self) {
        loop {
            // Registered before the check so a release in between is not missed.
            let notified = self.idle.notified();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Marks one operation as in flight until dropped.
///
/// Graceful shutdown waits (up to its drain timeout) for every guard to be
/// released before closing the connection.
#[derive(Debug)]
pub struct InFlightGuard {
    tracker: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.tracker.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.tracker.idle.notify_waiters();
        }
    }
}
