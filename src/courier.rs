//! Courier worker: claims ready orders and delivers them in batches.

use std::sync::Arc;

use crate::ring_queue::RingQueue;
use crate::session::Session;
use crate::types::{CourierId, DeliveryClaim, Order, Position};

/// What a courier accomplished during a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CourierReport {
    pub id: CourierId,
    pub delivered: usize,
    /// Every point reached, in order, including returns to the shop.
    pub route: Vec<Position>,
}

pub struct Courier {
    id: CourierId,
    session: Arc<Session>,
    position: Position,
    batch: RingQueue<Order>,
    delivered: usize,
    route: Vec<Position>,
}

impl Courier {
    pub fn new(id: CourierId, session: Arc<Session>) -> Self {
        Self {
            id,
            session,
            position: Position::ORIGIN,
            batch: RingQueue::new(),
            delivered: 0,
            route: Vec::new(),
        }
    }

    /// Work until every order of the session is delivered or the session stops.
    pub fn run(mut self) -> CourierReport {
        log::debug!("[COURIER] courier {} on shift", self.id);
        let batch_cap = self.session.config().delivery_batch;
        while !self.session.is_cancelled() && !self.session.progress().is_delivery_done() {
            let carrying = self.batch.len();
            let short_tail = self.session.progress().unclaimed() < batch_cap;
            if carrying > 0 && (carrying >= batch_cap || short_tail) {
                self.deliver_batch();
                continue;
            }
            self.try_claim();
        }

        log::info!(
            "[COURIER] courier {} is done, delivered {} order(s)",
            self.id,
            self.delivered
        );
        self.return_to_shop();
        CourierReport {
            id: self.id,
            delivered: self.delivered,
            route: self.route,
        }
    }

    /// Wait briefly on the ready signal and pick up one order if announced.
    fn try_claim(&mut self) -> bool {
        let signal = self.session.ready_signal();
        if !signal.consume_timeout(self.session.config().backoff()) {
            return false;
        }
        let Some(order) = self.session.ready().dequeue() else {
            // Signals are posted after the order is queued, so this means
            // the queue was swept.
            log::warn!("[COURIER] courier {} signalled on empty ready queue", self.id);
            return false;
        };
        self.session.progress().pick_up();
        self.session.in_delivery().enqueue(DeliveryClaim {
            courier: self.id,
            order,
        });
        self.batch.enqueue(order);
        log::debug!(
            "[COURIER] courier {} is taking order for customer {}",
            self.id,
            order.customer_id
        );
        true
    }

    /// Deliver everything carried, in pickup order, then head back.
    fn deliver_batch(&mut self) {
        while let Some(order) = self.batch.dequeue() {
            log::debug!(
                "[COURIER] courier {} is delivering order for customer {} to {}",
                self.id,
                order.customer_id,
                order.destination
            );
            let travel = self
                .session
                .config()
                .travel_time(self.position, order.destination);
            if !self.session.cancellation().sleep(travel) {
                return;
            }
            let id = self.id;
            self.session
                .in_delivery()
                .take_where(|claim| claim.courier == id && claim.order == order);
            self.session.progress().mark_delivered();
            self.position = order.destination;
            self.route.push(order.destination);
            self.delivered += 1;
            log::debug!(
                "[COURIER] order for customer {} to {} is delivered",
                order.customer_id,
                order.destination
            );
        }
        self.return_to_shop();
    }

    fn return_to_shop(&mut self) {
        if self.position.is_origin() {
            return;
        }
        log::debug!("[COURIER] courier {} is returning to the shop", self.id);
        let travel = self
            .session
            .config()
            .travel_time(self.position, Position::ORIGIN);
        if !self.session.cancellation().sleep(travel) {
            return;
        }
        self.position = Position::ORIGIN;
        self.route.push(Position::ORIGIN);
        log::debug!("[COURIER] courier {} returned to the shop", self.id);
    }
}
