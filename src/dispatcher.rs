//! Dispatcher: runs one client session from batch to acknowledgment.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::config::ShopConfig;
use crate::crew::Crew;
use crate::error::{Result, ShopError};
use crate::link::{ClientLink, LinkEvent};
use crate::progress::ProgressSnapshot;
use crate::protocol::{self, BatchError, MAX_BATCH_ORDERS};
use crate::report::{self, AbortReason, SessionOutcome, SessionReport};
use crate::session::Session;
use crate::types::Order;

pub struct Dispatcher {
    config: ShopConfig,
    shutdown: Arc<AtomicBool>,
}

enum MonitorExit {
    Finished(SessionOutcome),
    WorkerFault(String),
}

impl Dispatcher {
    pub fn new(config: ShopConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Abort the running session once `flag` is raised, typically by a
    /// signal handler.
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    pub fn config(&self) -> &ShopConfig {
        &self.config
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Read the client's batch and run it to the end.
    pub fn serve<L: ClientLink>(&self, link: &mut L) -> Result<SessionReport> {
        let bytes = match link.read_batch() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::warn!("[DISPATCH] client disconnected before sending orders");
                return Ok(SessionReport::aborted_before_start(AbortReason::Disconnected));
            }
            Err(err) => {
                log::warn!("[DISPATCH] could not read order batch: {err}");
                return Ok(SessionReport::aborted_before_start(AbortReason::Disconnected));
            }
        };

        let orders = match protocol::parse_batch(&bytes) {
            Ok(orders) => orders,
            Err(BatchError::Truncated { bytes }) => {
                log::warn!("[DISPATCH] batch cut off mid-order after {bytes} bytes");
                return Ok(SessionReport::aborted_before_start(
                    AbortReason::TruncatedBatch { bytes },
                ));
            }
            Err(BatchError::TooLarge { orders }) => {
                return Err(ShopError::BatchTooLarge {
                    orders,
                    max: MAX_BATCH_ORDERS,
                });
            }
        };
        self.run_orders(orders, link)
    }

    /// Cook and deliver `orders`, watching `link` for a hang-up or cancel.
    pub fn run_orders<L: ClientLink>(
        &self,
        orders: Vec<Order>,
        link: &mut L,
    ) -> Result<SessionReport> {
        if orders.len() > MAX_BATCH_ORDERS {
            return Err(ShopError::BatchTooLarge {
                orders: orders.len(),
                max: MAX_BATCH_ORDERS,
            });
        }
        if orders.is_empty() {
            log::info!("[DISPATCH] empty batch, nothing to cook");
            link.acknowledge()?;
            return Ok(SessionReport::empty(SessionOutcome::Completed));
        }

        let session = Arc::new(Session::new(self.config.clone()));
        session.load(&orders);
        log::info!("[DISPATCH] accepted {} order(s)", orders.len());

        let cpu_start = report::cpu_times_seconds();
        let start = Instant::now();
        let crew = match Crew::spawn(&session) {
            Ok(crew) => crew,
            Err(err) => {
                session.teardown();
                return Err(err);
            }
        };
        log::info!("[DISPATCH] {} worker(s) on shift", crew.size());

        let exit = self.monitor(&session, link);
        let outcome = match &exit {
            MonitorExit::Finished(SessionOutcome::Completed) => SessionOutcome::Completed,
            MonitorExit::Finished(outcome) => {
                session.cancel();
                *outcome
            }
            MonitorExit::WorkerFault(worker) => {
                log::error!("[DISPATCH] worker {worker} died, stopping session");
                session.cancel();
                SessionOutcome::Aborted(AbortReason::Disconnected)
            }
        };

        let joined = crew.join();
        let swept = session.teardown();
        let (cooks, couriers) = match (joined, exit) {
            (Err(err), _) => return Err(err),
            (Ok(_), MonitorExit::WorkerFault(worker)) => {
                return Err(ShopError::WorkerPanicked { worker });
            }
            (Ok(reports), MonitorExit::Finished(_)) => reports,
        };

        let (cpu_user_s, cpu_sys_s) =
            report::cpu_delta(cpu_start, report::cpu_times_seconds());
        let report = SessionReport {
            outcome,
            orders: orders.len(),
            elapsed: start.elapsed(),
            cooks,
            couriers,
            final_progress: session.snapshot(),
            peak_oven_occupancy: session.oven().peak_occupancy(),
            oven_capacity: session.oven().capacity(),
            swept,
            cpu_user_s,
            cpu_sys_s,
        };

        if outcome.is_completed() {
            log::info!("[DISPATCH] all orders are cooked and delivered");
            link.acknowledge()?;
        } else {
            log::warn!("[DISPATCH] session aborted: {outcome}");
        }
        Ok(report)
    }

    /// Watch progress until the session completes, the client leaves, or a
    /// worker dies.
    fn monitor<L: ClientLink>(&self, session: &Session, link: &mut L) -> MonitorExit {
        let mut last: Option<ProgressSnapshot> = None;
        loop {
            let snapshot = session.snapshot();
            debug_assert!(snapshot.delivered <= snapshot.total);
            if last != Some(snapshot) {
                log::info!("[PROGRESS] {snapshot}");
                last = Some(snapshot);
            }
            session.kick_couriers();

            if session.progress().is_delivery_done() {
                return MonitorExit::Finished(SessionOutcome::Completed);
            }
            if let Some(worker) = session.fault() {
                return MonitorExit::WorkerFault(worker);
            }
            if self.shutdown_requested() {
                log::warn!("[DISPATCH] shop is shutting down, cleaning up the session");
                return MonitorExit::Finished(SessionOutcome::Aborted(AbortReason::Shutdown));
            }

            match link.poll(self.config.poll_timeout()) {
                Ok(LinkEvent::Quiet) => {}
                Ok(LinkEvent::Ignored(bytes)) => {
                    log::debug!("[DISPATCH] ignored {bytes} byte(s) from client");
                }
                Ok(LinkEvent::Closed) => {
                    log::warn!("[DISPATCH] client disconnected");
                    return MonitorExit::Finished(SessionOutcome::Aborted(
                        AbortReason::Disconnected,
                    ));
                }
                Ok(LinkEvent::Cancelled) => {
                    log::warn!("[DISPATCH] client cancelled orders");
                    return MonitorExit::Finished(SessionOutcome::Aborted(
                        AbortReason::Cancelled,
                    ));
                }
                Err(err) => {
                    log::warn!("[DISPATCH] could not read from client: {err}");
                    return MonitorExit::Finished(SessionOutcome::Aborted(
                        AbortReason::Disconnected,
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::MemoryLink;

    fn fast_config() -> ShopConfig {
        ShopConfig {
            cooks: 2,
            couriers: 2,
            time_unit_ms: 1,
            preparation_min_units: 1,
            preparation_max_units: 3,
            travel_divisor: 1,
            poll_timeout_ms: 2,
            ..ShopConfig::default()
        }
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ShopConfig {
            couriers: 0,
            ..ShopConfig::default()
        };
        assert!(matches!(
            Dispatcher::new(config),
            Err(ShopError::Config(_))
        ));
    }

    #[test]
    fn completed_session_acknowledges_once() {
        let dispatcher = Dispatcher::new(fast_config()).expect("config");
        let orders: Vec<Order> = (0..6).map(|id| Order::new(id, id, 2)).collect();
        let mut link = MemoryLink::new(protocol::encode_batch(&orders));

        let report = dispatcher.serve(&mut link).expect("session");

        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert_eq!(report.delivered(), 6);
        assert_eq!(report.swept, 0);
        assert!(!report.oven_overflow());
        assert_eq!(link.acknowledgments(), 1);
    }

    #[test]
    fn raised_shutdown_flag_aborts_and_sweeps() {
        let flag = Arc::new(AtomicBool::new(true));
        let config = ShopConfig {
            cooks: 1,
            couriers: 1,
            time_unit_ms: 200,
            preparation_min_units: 3,
            preparation_max_units: 5,
            poll_timeout_ms: 2,
            ..ShopConfig::default()
        };
        let dispatcher = Dispatcher::new(config)
            .expect("config")
            .with_shutdown(Arc::clone(&flag));
        let orders: Vec<Order> = (0..3).map(|id| Order::new(id, 4, 4)).collect();
        let mut link = MemoryLink::new(protocol::encode_batch(&orders));

        let report = dispatcher.serve(&mut link).expect("session");

        assert_eq!(report.outcome, SessionOutcome::Aborted(AbortReason::Shutdown));
        assert_eq!(report.delivered(), 0);
        let abandoned: usize = report.cooks.iter().map(|cook| cook.abandoned).sum();
        assert_eq!(report.swept + abandoned, 3);
        assert_eq!(link.acknowledgments(), 0);
    }

    #[test]
    fn hang_up_before_batch_is_a_disconnect() {
        let dispatcher = Dispatcher::new(fast_config()).expect("config");
        let mut link = MemoryLink::closed();
        let report = dispatcher.serve(&mut link).expect("session");
        assert_eq!(
            report.outcome,
            SessionOutcome::Aborted(AbortReason::Disconnected)
        );
        assert_eq!(link.acknowledgments(), 0);
    }

    #[test]
    fn oversized_order_list_is_an_error() {
        let dispatcher = Dispatcher::new(fast_config()).expect("config");
        let orders: Vec<Order> = (0..=MAX_BATCH_ORDERS as i32)
            .map(|id| Order::new(id, 0, 0))
            .collect();
        let mut link = MemoryLink::new(Vec::new());
        assert!(matches!(
            dispatcher.run_orders(orders, &mut link),
            Err(ShopError::BatchTooLarge { .. })
        ));
        assert_eq!(link.acknowledgments(), 0);
    }
}
