//! Per-session progress counters, each updated independently.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters describing where the session's orders are. Every field is its
/// own atomic; there is no lock spanning several of them.
#[derive(Default)]
pub struct Progress {
    total: AtomicUsize,
    waiting_preparation: AtomicUsize,
    in_preparation: AtomicUsize,
    waiting_oven: AtomicUsize,
    cooked: AtomicUsize,
    waiting_courier: AtomicUsize,
    unsignaled: AtomicUsize,
    in_delivery: AtomicUsize,
    delivered: AtomicUsize,
}

/// Point-in-time copy of [`Progress`] plus the oven occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub waiting_preparation: usize,
    pub in_preparation: usize,
    pub waiting_oven: usize,
    pub in_oven: usize,
    pub cooked: usize,
    pub waiting_courier: usize,
    pub in_delivery: usize,
    pub delivered: usize,
}

fn decrement(counter: &AtomicUsize, name: &str) {
    let prev = counter.fetch_sub(1, Ordering::SeqCst);
    debug_assert!(prev > 0, "{name} counter underflow");
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session with `orders` waiting to be prepared.
    pub fn begin(&self, orders: usize) {
        self.total.store(orders, Ordering::SeqCst);
        self.waiting_preparation.store(orders, Ordering::SeqCst);
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn cooked(&self) -> usize {
        self.cooked.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub fn in_delivery(&self) -> usize {
        self.in_delivery.load(Ordering::SeqCst)
    }

    /// Orders neither delivered nor already riding with a courier.
    pub fn unclaimed(&self) -> usize {
        self.total()
            .saturating_sub(self.delivered())
            .saturating_sub(self.in_delivery())
    }

    pub fn start_preparation(&self) {
        decrement(&self.waiting_preparation, "waiting_preparation");
        self.in_preparation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn finish_preparation(&self) {
        decrement(&self.in_preparation, "in_preparation");
        self.waiting_oven.fetch_add(1, Ordering::SeqCst);
    }

    /// Preparation was interrupted; the order waits to be prepared again.
    pub fn abandon_preparation(&self) {
        decrement(&self.in_preparation, "in_preparation");
        self.waiting_preparation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn enter_oven(&self) {
        decrement(&self.waiting_oven, "waiting_oven");
    }

    /// An order left the oven and sits in the ready queue.
    pub fn mark_cooked(&self) {
        self.cooked.fetch_add(1, Ordering::SeqCst);
        self.waiting_courier.fetch_add(1, Ordering::SeqCst);
        self.unsignaled.fetch_add(1, Ordering::SeqCst);
    }

    /// Claim one cooked order that has not been announced to couriers yet.
    pub fn take_unsignaled(&self) -> bool {
        self.unsignaled
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    pub fn pick_up(&self) {
        decrement(&self.waiting_courier, "waiting_courier");
        self.in_delivery.fetch_add(1, Ordering::SeqCst);
    }

    pub fn mark_delivered(&self) {
        // Delivered goes up before in-delivery goes down so `unclaimed`
        // never overshoots while a courier is between the two.
        self.delivered.fetch_add(1, Ordering::SeqCst);
        decrement(&self.in_delivery, "in_delivery");
    }

    pub fn is_cooking_done(&self) -> bool {
        self.cooked() >= self.total()
    }

    pub fn is_delivery_done(&self) -> bool {
        self.delivered() >= self.total()
    }

    pub fn snapshot(&self, in_oven: usize) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total(),
            waiting_preparation: self.waiting_preparation.load(Ordering::SeqCst),
            in_preparation: self.in_preparation.load(Ordering::SeqCst),
            waiting_oven: self.waiting_oven.load(Ordering::SeqCst),
            in_oven,
            cooked: self.cooked(),
            waiting_courier: self.waiting_courier.load(Ordering::SeqCst),
            in_delivery: self.in_delivery(),
            delivered: self.delivered(),
        }
    }
}

impl ProgressSnapshot {
    /// Sum over the mutually exclusive order states.
    pub fn accounted(&self) -> usize {
        self.waiting_preparation
            + self.in_preparation
            + self.waiting_oven
            + self.in_oven
            + self.waiting_courier
            + self.in_delivery
            + self.delivered
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "waiting_preparation={} in_preparation={} waiting_oven={} in_oven={} \
             waiting_courier={} on_couriers={} delivered={}/{}",
            self.waiting_preparation,
            self.in_preparation,
            self.waiting_oven,
            self.in_oven,
            self.waiting_courier,
            self.in_delivery,
            self.delivered,
            self.total
        )
    }
}
