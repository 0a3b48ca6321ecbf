//! Counting signal announcing ready orders to couriers, and the session's
//! cancellation token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A counting signal: `post` adds one unit, consumers take units one at a time.
pub struct CountingSignal {
    count: Mutex<usize>,
    posted: Condvar,
}

impl Default for CountingSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CountingSignal {
    pub fn new() -> Self {
        Self {
            count: Mutex::new(0),
            posted: Condvar::new(),
        }
    }

    pub fn post(&self) {
        let mut guard = self.count.lock().expect("signal mutex poisoned");
        *guard += 1;
        self.posted.notify_one();
    }

    /// Consume one unit if present; never blocks.
    pub fn try_consume(&self) -> bool {
        let mut guard = self.count.lock().expect("signal mutex poisoned");
        if *guard == 0 {
            return false;
        }
        *guard -= 1;
        true
    }

    /// Wait at most `timeout` for a unit to consume.
    pub fn consume_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.count.lock().expect("signal mutex poisoned");
        loop {
            if *guard > 0 {
                *guard -= 1;
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            // Wait releases the lock and re-acquires it before returning.
            let (next, _) = self
                .posted
                .wait_timeout(guard, deadline - now)
                .expect("condvar wait failed");
            guard = next;
        }
    }

    /// Units posted but not yet consumed.
    pub fn pending(&self) -> usize {
        *self.count.lock().expect("signal mutex poisoned")
    }

    /// Drop all outstanding units.
    pub fn reset(&self) {
        let mut guard = self.count.lock().expect("signal mutex poisoned");
        *guard = 0;
    }
}

/// Shared stop flag checked at the head of every worker loop. Simulated
/// delays sleep on it so a cancelled session wakes its workers right away.
#[derive(Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    woken: Condvar,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let _guard = self.lock.lock().expect("cancellation mutex poisoned");
        self.cancelled.store(true, Ordering::SeqCst);
        self.woken.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless cancelled first. Returns `false` when the
    /// sleep was cut short.
    pub fn sleep(&self, duration: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(duration) else {
            // Effectively forever: wait for cancellation only.
            let mut guard = self.lock.lock().expect("cancellation mutex poisoned");
            while !self.is_cancelled() {
                guard = self.woken.wait(guard).expect("condvar wait failed");
            }
            return false;
        };
        let mut guard = self.lock.lock().expect("cancellation mutex poisoned");
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            let (next, _) = self
                .woken
                .wait_timeout(guard, deadline - now)
                .expect("condvar wait failed");
            guard = next;
        }
    }
}
