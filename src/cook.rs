//! Cook worker: prepares pending orders and cycles them through the oven.

use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::oven::OvenAccess;
use crate::ring_queue::RingQueue;
use crate::session::Session;
use crate::types::{CookId, ScheduledOrder, StagedOrder};

/// What a cook accomplished during a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CookReport {
    pub id: CookId,
    /// Orders this cook took out of the oven.
    pub cooked: usize,
    /// Orders still staged or baking when the cook stopped.
    pub abandoned: usize,
}

pub struct Cook {
    id: CookId,
    session: Arc<Session>,
    rng: StdRng,
    staging: RingQueue<StagedOrder>,
    baking: RingQueue<ScheduledOrder>,
    cooked: usize,
}

impl Cook {
    pub fn new(id: CookId, session: Arc<Session>) -> Self {
        Self::with_rng(id, session, StdRng::from_entropy())
    }

    pub fn with_rng(id: CookId, session: Arc<Session>, rng: StdRng) -> Self {
        Self {
            id,
            session,
            rng,
            staging: RingQueue::new(),
            baking: RingQueue::new(),
            cooked: 0,
        }
    }

    /// Work until every order of the session is cooked or the session stops.
    pub fn run(mut self) -> CookReport {
        log::debug!("[COOK] cook {} on shift", self.id);
        while !self.session.is_cancelled() && !self.session.progress().is_cooking_done() {
            let prepared = self.prepare_next();

            let session = Arc::clone(&self.session);
            let moved = match session.oven().try_open() {
                Some(access) => {
                    let unloaded = self.unload_due(&access);
                    let loaded = self.load_staged(&access);
                    unloaded + loaded
                }
                None => 0,
            };

            if !prepared && moved == 0 {
                self.session.cancellation().sleep(self.session.config().backoff());
            }
        }

        let abandoned = self.staging.clear() + self.baking.clear();
        if abandoned > 0 {
            log::warn!("[COOK] cook {} dropped {abandoned} unfinished order(s)", self.id);
        }
        log::info!("[COOK] cook {} is done, cooked {} order(s)", self.id, self.cooked);
        CookReport {
            id: self.id,
            cooked: self.cooked,
            abandoned,
        }
    }

    /// Take one pending order and prepare it. Returns whether an order was
    /// picked up.
    fn prepare_next(&mut self) -> bool {
        let Some(order) = self.session.pending().dequeue() else {
            return false;
        };
        let progress = self.session.progress();
        progress.start_preparation();
        log::debug!(
            "[COOK] cook {} is preparing order for customer {}",
            self.id,
            order.customer_id
        );

        let started = Instant::now();
        let preparation = self.session.config().preparation_time(&mut self.rng);
        if !self.session.cancellation().sleep(preparation) {
            // Hand the order back so teardown sweeps it with the rest.
            progress.abandon_preparation();
            self.session.pending().enqueue(order);
            log::debug!(
                "[COOK] cook {} stopped preparing order for customer {}",
                self.id,
                order.customer_id
            );
            return true;
        }
        // Bake for half as long as the preparation took.
        let bake = started.elapsed() / 2;

        progress.finish_preparation();
        self.staging.enqueue(StagedOrder { order, bake });
        log::debug!(
            "[COOK] cook {} prepared order for customer {}",
            self.id,
            order.customer_id
        );
        true
    }

    /// One pass over the baking set: every order present when the pass starts
    /// is looked at exactly once, against a single `now`. Due orders move to
    /// the ready queue.
    fn unload_due(&mut self, access: &OvenAccess<'_>) -> usize {
        let now = Instant::now();
        let mut remaining = self.baking.len();
        let mut unloaded = 0;
        while remaining > 0 {
            remaining -= 1;
            let Some(current) = self.baking.peek() else {
                break;
            };
            if !current.is_due(now) {
                self.baking.advance();
                continue;
            }
            let Some(done) = self.baking.take_current() else {
                break;
            };
            access.release_slot();
            self.session.ready().enqueue(done.order);
            self.session.progress().mark_cooked();
            self.cooked += 1;
            unloaded += 1;
            log::debug!(
                "[COOK] cook {} put order for customer {} in the delivery queue",
                self.id,
                done.order.customer_id
            );
        }
        unloaded
    }

    /// Move staged orders into the oven while slots are free.
    fn load_staged(&mut self, access: &OvenAccess<'_>) -> usize {
        let mut loaded = 0;
        while !self.staging.is_empty() && access.reserve_slot() {
            let Some(staged) = self.staging.dequeue() else {
                access.release_slot();
                break;
            };
            self.session.progress().enter_oven();
            self.baking
                .enqueue(ScheduledOrder::schedule(staged, Instant::now()));
            loaded += 1;
            log::debug!(
                "[COOK] cook {} put order for customer {} in the oven",
                self.id,
                staged.order.customer_id
            );
        }
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShopConfig;
    use crate::types::Order;
    use std::time::Duration;

    fn fast_config() -> ShopConfig {
        ShopConfig {
            time_unit_ms: 1,
            preparation_min_units: 1,
            preparation_max_units: 2,
            ..ShopConfig::default()
        }
    }

    fn cook_with(session: &Arc<Session>) -> Cook {
        Cook::with_rng(0, Arc::clone(session), StdRng::seed_from_u64(1))
    }

    #[test]
    fn single_cook_cooks_every_order() {
        let session = Arc::new(Session::new(fast_config()));
        let orders: Vec<Order> = (0..8).map(|id| Order::new(id, 1, 1)).collect();
        session.load(&orders);

        let report = cook_with(&session).run();

        assert_eq!(report.cooked, 8);
        assert_eq!(report.abandoned, 0);
        assert_eq!(session.ready().len(), 8);
        assert_eq!(session.progress().cooked(), 8);
        assert_eq!(session.oven().occupied(), 0);
        assert!(session.oven().peak_occupancy() <= 6);
        let snap = session.snapshot();
        assert_eq!(snap.waiting_courier, 8);
        assert_eq!(snap.accounted(), 8);
    }

    #[test]
    fn blocked_oven_keeps_orders_staged() {
        let config = ShopConfig {
            oven_doors: 1,
            ..fast_config()
        };
        let session = Arc::new(Session::new(config));
        session.load(&[Order::new(1, 0, 1)]);
        // Hold the only door so the cook can never get in.
        let access = session.oven().try_open().expect("door");

        let mut cook = cook_with(&session);
        assert!(cook.prepare_next());
        assert!(session.oven().try_open().is_none());
        assert_eq!(cook.staging.len(), 1);
        assert_eq!(session.snapshot().waiting_oven, 1);
        drop(access);

        let access = session.oven().try_open().expect("door after release");
        assert_eq!(cook.load_staged(&access), 1);
        assert_eq!(session.oven().occupied(), 1);
    }

    #[test]
    fn scan_removes_only_due_orders() {
        let session = Arc::new(Session::new(fast_config()));
        session.load(&[Order::new(1, 0, 1), Order::new(2, 0, 2), Order::new(3, 0, 3)]);
        let mut cook = cook_with(&session);
        for (id, bake) in [(1, 0), (2, 60_000), (3, 0)] {
            session.pending().dequeue();
            session.progress().start_preparation();
            session.progress().finish_preparation();
            cook.staging.enqueue(StagedOrder {
                order: Order::new(id, 0, id),
                bake: Duration::from_millis(bake),
            });
        }

        let access = session.oven().try_open().expect("access");
        assert_eq!(cook.load_staged(&access), 3);
        assert_eq!(session.oven().occupied(), 3);
        thread_sleep_ms(2);
        assert_eq!(cook.unload_due(&access), 2);
        assert_eq!(session.oven().occupied(), 1);
        assert_eq!(cook.baking.len(), 1);
        assert_eq!(cook.baking.peek().map(|s| s.order.customer_id), Some(2));

        let ready: Vec<i32> = std::iter::from_fn(|| session.ready().dequeue())
            .map(|order| order.customer_id)
            .collect();
        assert_eq!(ready, vec![1, 3]);
        // A second pass finds nothing new.
        assert_eq!(cook.unload_due(&access), 0);
    }

    #[test]
    fn staged_orders_respect_free_slots() {
        let config = ShopConfig {
            oven_capacity: 2,
            ..fast_config()
        };
        let session = Arc::new(Session::new(config));
        let orders: Vec<Order> = (0..4).map(|id| Order::new(id, 0, 0)).collect();
        session.load(&orders);
        let mut cook = cook_with(&session);
        for order in orders {
            session.pending().dequeue();
            session.progress().start_preparation();
            session.progress().finish_preparation();
            cook.staging.enqueue(StagedOrder {
                order,
                bake: Duration::from_secs(60),
            });
        }
        let access = session.oven().try_open().expect("access");
        assert_eq!(cook.load_staged(&access), 2);
        assert_eq!(cook.staging.len(), 2);
        assert_eq!(access.free_slots(), 0);
        assert_eq!(session.snapshot().waiting_oven, 2);
    }

    #[test]
    fn cancelled_preparation_returns_order_to_pending() {
        let config = ShopConfig {
            time_unit_ms: 1000,
            preparation_min_units: 30,
            preparation_max_units: 30,
            ..ShopConfig::default()
        };
        let session = Arc::new(Session::new(config));
        session.load(&[Order::new(1, 1, 1)]);
        let cook = cook_with(&session);
        let worker = std::thread::spawn(move || cook.run());
        thread_sleep_ms(20);
        session.cancel();
        let report = worker.join().expect("cook thread panicked");
        assert_eq!(report.cooked, 0);
        assert_eq!(report.abandoned, 0);

        // The interrupted order is back in line, not lost.
        assert_eq!(session.pending().len(), 1);
        let snap = session.snapshot();
        assert_eq!(snap.in_preparation, 0);
        assert_eq!(snap.waiting_preparation, 1);
        assert_eq!(snap.accounted(), 1);
        assert_eq!(session.teardown(), 1);
    }

    #[test]
    fn staged_and_baking_orders_count_as_abandoned() {
        let session = Arc::new(Session::new(fast_config()));
        let orders: Vec<Order> = (0..3).map(|id| Order::new(id, 2, 2)).collect();
        session.load(&orders);
        let mut cook = cook_with(&session);
        for order in orders {
            session.pending().dequeue();
            session.progress().start_preparation();
            session.progress().finish_preparation();
            cook.staging.enqueue(StagedOrder {
                order,
                bake: Duration::from_secs(60),
            });
        }
        {
            let access = session.oven().try_open().expect("access");
            session.progress().enter_oven();
            let staged = cook.staging.dequeue().expect("staged order");
            assert!(access.reserve_slot());
            cook.baking
                .enqueue(ScheduledOrder::schedule(staged, Instant::now()));
        }
        session.cancel();

        let report = cook.run();

        assert_eq!(report.cooked, 0);
        assert_eq!(report.abandoned, 3);
    }

    fn thread_sleep_ms(ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}
