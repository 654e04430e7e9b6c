//! Interruption of blocked transfers
//!
//! An [`Interrupt`] plays the role of a pending signal for the contexts that
//! share it. Once raised it stays raised until [`Interrupt::clear`]:
//!
//! - a transfer whose boundary condition already holds proceeds normally
//! - a transfer that would have to wait returns [`crate::PipeError::Retry`]
//! - a transfer already waiting is woken and returns `Retry`
//!
//! In all `Retry` cases no pipe state has changed.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::signal::Signal;

#[derive(Default)]
struct InterruptInner {
    raised: AtomicBool,
    /// Pipes this interrupt has waited on; raising wakes their waiters
    watched: Mutex<Vec<Weak<Signal>>>,
}

/// Shareable, sticky interrupt flag
#[derive(Clone, Default)]
pub struct Interrupt {
    inner: Arc<InterruptInner>,
}

impl Interrupt {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake every waiter on every watched pipe
    pub fn raise(&self) {
        self.inner.raised.store(true, Ordering::SeqCst);

        let signals: Vec<Arc<Signal>> = {
            let mut watched = self.inner.watched.lock();
            watched.retain(|signal| signal.strong_count() > 0);
            watched.iter().filter_map(Weak::upgrade).collect()
        };
        for signal in signals {
            log::debug!("interrupt raised, waking waiters of pipe {}", signal.debug_hint());
            signal.wake_all();
        }
    }

    /// Lower the flag so later waits block again
    pub fn clear(&self) {
        self.inner.raised.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.inner.raised.load(Ordering::SeqCst)
    }

    /// Remember `signal` so that [`Interrupt::raise`] can wake its waiters
    pub(crate) fn watch(&self, signal: &Arc<Signal>) {
        let mut watched = self.inner.watched.lock();
        watched.retain(|w| w.strong_count() > 0);
        let ptr = Arc::as_ptr(signal);
        if !watched.iter().any(|w| std::ptr::eq(w.as_ptr(), ptr)) {
            watched.push(Arc::downgrade(signal));
        }
    }
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupt")
            .field("raised", &self.is_raised())
            .field("watched", &self.inner.watched.lock().len())
            .finish()
    }
}
