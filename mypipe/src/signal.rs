//! Producer/consumer hand-off
//!
//! All shared state (the [`Ring`] and its cursors) sits behind one mutex.
//! Two boundary conditions decide who may proceed:
//!
//! - [`Boundary::HasSpace`]: the buffer is not full, writers may proceed
//! - [`Boundary::HasData`]: the buffer is not empty, readers may proceed
//!
//! A new pipe is in `HasSpace` only. Once partially filled, both hold.
//!
//! # Waiting
//!
//! A blocked caller checks its condition under the lock and then sleeps on
//! the condition variable, which releases the lock. The lock is therefore
//! held only for a check or for one buffer-sized copy, never across a wait.
//!
//! Async callers use the same check-lock-check order as the notification
//! queue: register interest first (`Notified::enable`), then check the
//! condition, then await. A signal sent between the check and the await is
//! not lost.
//!
//! # Releasing
//!
//! After a transfer the boundary signals are passed on outside the lock:
//!
//! - write: wake one reader; wake one more writer unless the buffer is now full
//! - read: wake one writer; wake one more reader unless the buffer is now empty
//!
//! Each woken waiter rechecks its condition, so waking a waiter that then
//! finds nothing to do is harmless.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard};
use tokio::sync::Notify;

use crate::error::PipeError;
use crate::interrupt::Interrupt;
use crate::ring::{Direction, Ring};

/// Boundary condition a transfer waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Boundary {
    HasSpace,
    HasData,
}

impl Boundary {
    fn holds(self, ring: &Ring) -> bool {
        match self {
            Self::HasSpace => !ring.is_full(),
            Self::HasData => !ring.is_empty(),
        }
    }
}

impl From<Direction> for Boundary {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Fill => Self::HasSpace,
            Direction::Drain => Self::HasData,
        }
    }
}

/// Shared state of one pipe
pub(crate) struct Signal {
    ring: Mutex<Ring>,
    space: Condvar,
    data: Condvar,
    space_async: Notify,
    data_async: Notify,
    debug_hint: String,
}

impl Signal {
    pub(crate) fn new(capacity: usize, debug_hint: &str) -> Self {
        Self {
            ring: Mutex::new(Ring::new(capacity)),
            space: Condvar::new(),
            data: Condvar::new(),
            space_async: Notify::new(),
            data_async: Notify::new(),
            debug_hint: debug_hint.to_string(),
        }
    }

    pub(crate) fn debug_hint(&self) -> &str {
        &self.debug_hint
    }

    /// Lock the ring without waiting for any boundary
    pub(crate) fn lock(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock()
    }

    fn condvar(&self, boundary: Boundary) -> &Condvar {
        match boundary {
            Boundary::HasSpace => &self.space,
            Boundary::HasData => &self.data,
        }
    }

    fn notify(&self, boundary: Boundary) -> &Notify {
        match boundary {
            Boundary::HasSpace => &self.space_async,
            Boundary::HasData => &self.data_async,
        }
    }

    /// Block until `boundary` holds and return the locked ring
    ///
    /// If `interrupt` is raised while the boundary does not hold, gives up
    /// with [`PipeError::Retry`]. A boundary that already holds wins over a
    /// raised interrupt. The interrupt learns about this pipe only once a
    /// wait is needed.
    pub(crate) fn acquire(
        self: &Arc<Self>,
        boundary: Boundary,
        interrupt: Option<&Interrupt>,
    ) -> Result<MutexGuard<'_, Ring>, PipeError> {
        let mut ring = self.ring.lock();
        let mut watching = false;
        loop {
            if boundary.holds(&ring) {
                return Ok(ring);
            }
            if let Some(interrupt) = interrupt {
                // Register before testing the flag, so a concurrent raise
                // either sees this pipe or is seen here
                if !watching {
                    interrupt.watch(self);
                    watching = true;
                }
                if interrupt.is_raised() {
                    log::debug!(
                        "pipe {}: wait for {boundary:?} interrupted, {ring:?}",
                        self.debug_hint
                    );
                    return Err(PipeError::Retry);
                }
            }
            self.condvar(boundary).wait(&mut ring);
        }
    }

    /// Lock the ring only if `boundary` already holds
    pub(crate) fn try_acquire(&self, boundary: Boundary) -> Result<MutexGuard<'_, Ring>, PipeError> {
        let ring = self.ring.lock();
        if boundary.holds(&ring) {
            Ok(ring)
        } else {
            Err(PipeError::WouldBlock)
        }
    }

    /// Wait until `boundary` has been observed to hold
    ///
    /// The boundary may be gone again by the time the caller locks the ring,
    /// so callers loop on [`Signal::try_acquire`].
    pub(crate) async fn wait_async(&self, boundary: Boundary) {
        loop {
            let notified = self.notify(boundary).notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if boundary.holds(&self.ring.lock()) {
                return;
            }
            notified.await;
        }
    }

    /// Unlock after a committed transfer and pass the boundary signals on
    pub(crate) fn release(&self, ring: MutexGuard<'_, Ring>, direction: Direction) {
        let has_space = !ring.is_full();
        let has_data = !ring.is_empty();
        drop(ring);

        // Signal outside lock
        match direction {
            Direction::Fill => {
                self.wake_one(Boundary::HasData);
                if has_space {
                    self.wake_one(Boundary::HasSpace);
                }
            }
            Direction::Drain => {
                self.wake_one(Boundary::HasSpace);
                if has_data {
                    self.wake_one(Boundary::HasData);
                }
            }
        }
    }

    /// Unlock after an aborted transfer, handing `boundary` to the next waiter
    pub(crate) fn abandon(&self, ring: MutexGuard<'_, Ring>, boundary: Boundary) {
        drop(ring);
        self.wake_one(boundary);
    }

    fn wake_one(&self, boundary: Boundary) {
        self.condvar(boundary).notify_one();
        self.notify(boundary).notify_one();
    }

    /// Wake every waiter so each can recheck its interrupt
    pub(crate) fn wake_all(&self) {
        // Waiters test the interrupt flag under the lock; taking it here
        // orders this wakeup after any such test.
        drop(self.ring.lock());
        for boundary in [Boundary::HasSpace, Boundary::HasData] {
            self.condvar(boundary).notify_all();
            self.notify(boundary).notify_waiters();
        }
    }
}

impl Drop for Signal {
    fn drop(&mut self) {
        log::info!("pipe {} exit", self.debug_hint);
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("debug_hint", &self.debug_hint)
            .field("ring", &*self.ring.lock())
            .finish_non_exhaustive()
    }
}
