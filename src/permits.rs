//! Fixed-size permit pools guarding the oven doors and paddles.

use std::sync::Mutex;

struct PoolState {
    available: usize,
    peak_in_use: usize,
}

/// A counting resource with non-blocking acquisition only. Permits are
/// returned when the [`Permit`] guard is dropped.
pub struct PermitPool {
    name: &'static str,
    capacity: usize,
    state: Mutex<PoolState>,
}

/// One unit held from a [`PermitPool`].
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit<'a> {
    pool: &'a PermitPool,
}

impl PermitPool {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity,
            state: Mutex::new(PoolState {
                available: capacity,
                peak_in_use: 0,
            }),
        }
    }

    /// Take a permit if one is free right now.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut guard = self.state.lock().expect("permit pool mutex poisoned");
        if guard.available == 0 {
            return None;
        }
        guard.available -= 1;
        let in_use = self.capacity - guard.available;
        if in_use > guard.peak_in_use {
            guard.peak_in_use = in_use;
        }
        Some(Permit { pool: self })
    }

    fn release(&self) {
        let mut guard = self.state.lock().expect("permit pool mutex poisoned");
        debug_assert!(
            guard.available < self.capacity,
            "{} pool released more permits than it holds",
            self.name
        );
        if guard.available < self.capacity {
            guard.available += 1;
        } else {
            log::error!("[PERMIT] {} over-release ignored", self.name);
        }
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        let guard = self.state.lock().expect("permit pool mutex poisoned");
        guard.available
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }

    /// Highest number of permits held at the same time so far.
    pub fn peak_in_use(&self) -> usize {
        let guard = self.state.lock().expect("permit pool mutex poisoned");
        guard.peak_in_use
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.pool.release();
    }
}
