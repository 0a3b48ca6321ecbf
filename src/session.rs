//! Session-scoped shared state handed to every worker.

use std::sync::Mutex;

use crate::config::ShopConfig;
use crate::oven::Oven;
use crate::progress::{Progress, ProgressSnapshot};
use crate::ring_queue::RingQueue;
use crate::signal::{CancellationToken, CountingSignal};
use crate::types::{DeliveryClaim, Order};

/// Everything one client session shares between the dispatcher, cooks and
/// couriers. A fresh `Session` is built per client, so nothing leaks from one
/// session into the next.
pub struct Session {
    config: ShopConfig,
    progress: Progress,
    pending: RingQueue<Order>,
    ready: RingQueue<Order>,
    in_delivery: RingQueue<DeliveryClaim>,
    oven: Oven,
    ready_signal: CountingSignal,
    cancellation: CancellationToken,
    fault: Mutex<Option<String>>,
}

impl Session {
    pub fn new(config: ShopConfig) -> Self {
        let oven = Oven::new(config.oven_capacity, config.oven_doors, config.oven_paddles);
        Self {
            config,
            progress: Progress::new(),
            pending: RingQueue::new(),
            ready: RingQueue::new(),
            in_delivery: RingQueue::new(),
            oven,
            ready_signal: CountingSignal::new(),
            cancellation: CancellationToken::new(),
            fault: Mutex::new(None),
        }
    }

    /// Seed the pending queue; the session total becomes `orders.len()`.
    pub fn load(&self, orders: &[Order]) {
        self.progress.begin(orders.len());
        for order in orders {
            self.pending.enqueue(*order);
            log::debug!(
                "[DISPATCH] queued order from customer {} to {}",
                order.customer_id,
                order.destination
            );
        }
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn pending(&self) -> &RingQueue<Order> {
        &self.pending
    }

    pub fn ready(&self) -> &RingQueue<Order> {
        &self.ready
    }

    pub fn in_delivery(&self) -> &RingQueue<DeliveryClaim> {
        &self.in_delivery
    }

    pub fn oven(&self) -> &Oven {
        &self.oven
    }

    pub fn ready_signal(&self) -> &CountingSignal {
        &self.ready_signal
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Whether workers should leave their loops.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.progress.snapshot(self.oven.occupied())
    }

    /// Post the ready signal once per cooked order not yet announced.
    pub fn kick_couriers(&self) -> usize {
        let mut kicked = 0;
        while self.progress.take_unsignaled() {
            self.ready_signal.post();
            kicked += 1;
        }
        kicked
    }

    /// Record that a worker died; the first report wins.
    pub fn report_fault(&self, worker: &str) {
        let mut guard = self.fault.lock().expect("fault mutex poisoned");
        if guard.is_none() {
            *guard = Some(worker.to_string());
        }
    }

    pub fn fault(&self) -> Option<String> {
        self.fault.lock().expect("fault mutex poisoned").clone()
    }

    /// Drop whatever is left in the shared queues. Returns the number of
    /// records swept.
    pub fn teardown(&self) -> usize {
        let swept = self.pending.clear() + self.ready.clear() + self.in_delivery.clear();
        self.ready_signal.reset();
        if swept > 0 {
            log::info!("[DISPATCH] swept {swept} unfinished order record(s)");
        }
        swept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders(count: i32) -> Vec<Order> {
        (0..count).map(|id| Order::new(id, id, id)).collect()
    }

    #[test]
    fn load_seeds_pending_queue_and_total() {
        let session = Session::new(ShopConfig::default());
        session.load(&orders(4));
        assert_eq!(session.pending().len(), 4);
        let snap = session.snapshot();
        assert_eq!(snap.total, 4);
        assert_eq!(snap.waiting_preparation, 4);
        assert_eq!(snap.accounted(), 4);
    }

    #[test]
    fn kick_posts_once_per_cooked_order() {
        let session = Session::new(ShopConfig::default());
        session.load(&orders(3));
        session.progress().mark_cooked();
        session.progress().mark_cooked();
        assert_eq!(session.kick_couriers(), 2);
        assert_eq!(session.kick_couriers(), 0);
        assert_eq!(session.ready_signal().pending(), 2);
    }

    #[test]
    fn teardown_leaves_nothing_claimable() {
        let session = Session::new(ShopConfig::default());
        session.load(&orders(3));
        session.ready().enqueue(Order::new(9, 1, 1));
        session.ready_signal().post();
        session.in_delivery().enqueue(DeliveryClaim {
            courier: 0,
            order: Order::new(8, 2, 2),
        });
        assert_eq!(session.teardown(), 5);
        assert!(session.pending().is_empty());
        assert!(session.ready().is_empty());
        assert!(session.in_delivery().is_empty());
        assert!(!session.ready_signal().try_consume());
    }

    #[test]
    fn first_fault_is_kept() {
        let session = Session::new(ShopConfig::default());
        assert!(session.fault().is_none());
        session.report_fault("cook-1");
        session.report_fault("courier-0");
        assert_eq!(session.fault().as_deref(), Some("cook-1"));
    }
}
