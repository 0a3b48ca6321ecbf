//! The shared oven: a bounded number of slots behind door and paddle permits.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::permits::{Permit, PermitPool};

/// Slot counter plus the two permit pools that gate access to it.
///
/// Slots are only taken or given back through an [`OvenAccess`], which holds
/// one door and one paddle for its whole lifetime.
pub struct Oven {
    capacity: usize,
    free_slots: Mutex<usize>,
    doors: PermitPool,
    paddles: PermitPool,
    peak_occupancy: AtomicUsize,
}

/// Proof that the holder has both a door and a paddle.
pub struct OvenAccess<'a> {
    oven: &'a Oven,
    _door: Permit<'a>,
    _paddle: Permit<'a>,
}

impl Oven {
    pub fn new(capacity: usize, doors: usize, paddles: usize) -> Self {
        Self {
            capacity,
            free_slots: Mutex::new(capacity),
            doors: PermitPool::new("door", doors),
            paddles: PermitPool::new("paddle", paddles),
            peak_occupancy: AtomicUsize::new(0),
        }
    }

    /// Grab a door and then a paddle without blocking. When the paddle is
    /// missing the door goes back before returning.
    pub fn try_open(&self) -> Option<OvenAccess<'_>> {
        let door = self.doors.try_acquire()?;
        let Some(paddle) = self.paddles.try_acquire() else {
            drop(door);
            return None;
        };
        Some(OvenAccess {
            oven: self,
            _door: door,
            _paddle: paddle,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn free_slots(&self) -> usize {
        *self.free_slots.lock().expect("oven slot mutex poisoned")
    }

    /// Orders currently inside the oven.
    pub fn occupied(&self) -> usize {
        self.capacity - self.free_slots()
    }

    /// Highest occupancy observed during the session.
    pub fn peak_occupancy(&self) -> usize {
        self.peak_occupancy.load(Ordering::SeqCst)
    }

    pub fn doors(&self) -> &PermitPool {
        &self.doors
    }

    pub fn paddles(&self) -> &PermitPool {
        &self.paddles
    }

    fn record_occupancy(&self, current: usize) {
        let mut prev = self.peak_occupancy.load(Ordering::SeqCst);
        while current > prev {
            match self.peak_occupancy.compare_exchange(
                prev,
                current,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(next) => prev = next,
            }
        }
    }
}

impl OvenAccess<'_> {
    /// Take one slot if any is free.
    pub fn reserve_slot(&self) -> bool {
        let mut free = self
            .oven
            .free_slots
            .lock()
            .expect("oven slot mutex poisoned");
        if *free == 0 {
            return false;
        }
        *free -= 1;
        self.oven.record_occupancy(self.oven.capacity - *free);
        true
    }

    /// Give a slot back after taking an order out.
    pub fn release_slot(&self) {
        let mut free = self
            .oven
            .free_slots
            .lock()
            .expect("oven slot mutex poisoned");
        debug_assert!(*free < self.oven.capacity, "oven slot released twice");
        if *free < self.oven.capacity {
            *free += 1;
        }
    }

    pub fn free_slots(&self) -> usize {
        self.oven.free_slots()
    }
}
