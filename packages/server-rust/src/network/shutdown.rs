//! Readiness state and in-flight request accounting for graceful shutdown.
//!
//! The health state lives in an `ArcSwap` so probes read it without locks.
//! Requests are admitted through [`ShutdownController::admit`], which hands
//! out an RAII [`InFlightGuard`]; draining waits until every guard is gone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::Notify;

/// Server health state.
///
/// State machine: Starting -> Ready -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Row store not yet opened; not accepting API requests.
    Starting,
    /// Serving API requests.
    Ready,
    /// Shutdown requested; in-flight requests finish, new ones are refused.
    Draining,
    /// Every in-flight request has completed.
    Stopped,
}

impl HealthState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Default)]
struct InFlight {
    count: AtomicU64,
    idle: Notify,
}

/// Coordinates readiness, request admission and draining.
#[derive(Debug)]
pub struct ShutdownController {
    state: ArcSwap<HealthState>,
    in_flight: Arc<InFlight>,
}

impl ShutdownController {
    /// Creates a controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(HealthState::Starting),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn set_ready(&self) {
        self.state.store(Arc::new(HealthState::Ready));
    }

    /// Moves to `Draining`; subsequent [`admit`](Self::admit) calls fail.
    pub fn trigger_shutdown(&self) {
        self.state.store(Arc::new(HealthState::Draining));
    }

    #[must_use]
    pub fn health_state(&self) -> HealthState {
        **self.state.load()
    }

    /// Admits one request unless the server is draining or stopped.
    ///
    /// The request counts as in flight until the returned guard is dropped.
    #[must_use]
    pub fn admit(&self) -> Option<InFlightGuard> {
        match self.health_state() {
            HealthState::Draining | HealthState::Stopped => None,
            HealthState::Starting | HealthState::Ready => {
                self.in_flight.count.fetch_add(1, Ordering::AcqRel);
                Some(InFlightGuard {
                    in_flight: Arc::clone(&self.in_flight),
                })
            }
        }
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.count.load(Ordering::Acquire)
    }

    /// Waits until no request is in flight, up to `timeout`.
    ///
    /// On success the state becomes `Stopped` and `true` is returned. On
    /// timeout the state stays as it was and `false` is returned.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let idle = self.in_flight.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();

            if self.in_flight_count() == 0 {
                self.state.store(Arc::new(HealthState::Stopped));
                return true;
            }
            if tokio::time::timeout_at(deadline, idle).await.is_err() {
                return false;
            }
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks one admitted request as in flight until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.in_flight.idle.notify_waiters();
        }
    }
}
