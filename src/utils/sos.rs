use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Cooperative stop latch shared between the caller thread and the render loop.
///
/// Once cancelled it stays cancelled. Waiters blocked in [`SignalOfStop::wait_timeout`]
/// are woken immediately, which lets idle sleeps double as cancellation points.
#[derive(Debug)]
pub struct SignalOfStop {
    // Shared state between clones
    shared: Arc<SharedState>,
}

#[derive(Debug)]
struct SharedState {
    closing: AtomicBool,
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl SignalOfStop {
    pub fn new() -> SignalOfStop {
        SignalOfStop {
            shared: Arc::new(SharedState {
                closing: AtomicBool::new(false),
                mutex: Mutex::new(()),
                condvar: Condvar::new(),
            }),
        }
    }

    pub fn cancel(&self) {
        self.shared.closing.store(true, Ordering::SeqCst);

        // Lock briefly so a waiter between its flag check and its wait cannot miss the notify.
        // A poisoned lock still carries a valid unit guard.
        let _guard = self
            .shared
            .mutex
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.shared.condvar.notify_all();
    }

    pub fn cancelled(&self) -> bool {
        self.shared.closing.load(Ordering::SeqCst)
    }

    /// Block until cancelled or until `timeout` elapses.
    ///
    /// Returns `true` when the signal was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self
            .shared
            .mutex
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        while !self.cancelled() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = match self.shared.condvar.wait_timeout(guard, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }

    /// Sleep for `duration` unless cancelled first; `false` means the caller should stop.
    pub fn sleep(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.cancelled();
        }
        !self.wait_timeout(duration)
    }
}

impl Default for SignalOfStop {
    fn default() -> Self {
        Self::new()
    }
}

// Implementing the Clone trait
impl Clone for SignalOfStop {
    fn clone(&self) -> SignalOfStop {
        SignalOfStop {
            shared: Arc::clone(&self.shared),
        }
    }
}
