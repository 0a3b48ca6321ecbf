//! Spawning and joining the cook and courier pools.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::cook::{Cook, CookReport};
use crate::courier::{Courier, CourierReport};
use crate::error::{Result, ShopError};
use crate::session::Session;

/// Reports a panicking worker to the session so the dispatcher can stop.
struct PanicSentinel {
    name: String,
    session: Arc<Session>,
}

impl Drop for PanicSentinel {
    fn drop(&mut self) {
        if thread::panicking() {
            self.session.report_fault(&self.name);
        }
    }
}

/// Running worker threads of one session.
pub struct Crew {
    cooks: Vec<(String, JoinHandle<CookReport>)>,
    couriers: Vec<(String, JoinHandle<CourierReport>)>,
}

fn spawn_worker<T, F>(name: String, session: &Arc<Session>, work: F) -> Result<JoinHandle<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let sentinel = PanicSentinel {
        name: name.clone(),
        session: Arc::clone(session),
    };
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            let _sentinel = sentinel;
            work()
        })
        .map_err(|source| ShopError::Spawn { role: name, source })
}

impl Crew {
    /// Start `cooks` cooks and `couriers` couriers on `session`. If a spawn
    /// fails the already running workers are cancelled and joined.
    pub fn spawn(session: &Arc<Session>) -> Result<Self> {
        let mut crew = Crew {
            cooks: Vec::new(),
            couriers: Vec::new(),
        };
        if let Err(err) = crew.spawn_all(session) {
            session.cancel();
            let _ = crew.join();
            return Err(err);
        }
        Ok(crew)
    }

    fn spawn_all(&mut self, session: &Arc<Session>) -> Result<()> {
        for id in 0..session.config().cooks {
            let name = format!("cook-{id}");
            let cook = Cook::new(id, Arc::clone(session));
            let handle = spawn_worker(name.clone(), session, move || cook.run())?;
            self.cooks.push((name, handle));
        }
        for id in 0..session.config().couriers {
            let name = format!("courier-{id}");
            let courier = Courier::new(id, Arc::clone(session));
            let handle = spawn_worker(name.clone(), session, move || courier.run())?;
            self.couriers.push((name, handle));
        }
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.cooks.len() + self.couriers.len()
    }

    /// Wait for every worker. All threads are joined even if one panicked;
    /// the first panic is returned as an error.
    pub fn join(self) -> Result<(Vec<CookReport>, Vec<CourierReport>)> {
        let mut panicked: Option<String> = None;
        let mut cooks = Vec::with_capacity(self.cooks.len());
        for (name, handle) in self.cooks {
            match handle.join() {
                Ok(report) => cooks.push(report),
                Err(_) => {
                    log::error!("[CREW] {name} panicked");
                    panicked.get_or_insert(name);
                }
            }
        }
        let mut couriers = Vec::with_capacity(self.couriers.len());
        for (name, handle) in self.couriers {
            match handle.join() {
                Ok(report) => couriers.push(report),
                Err(_) => {
                    log::error!("[CREW] {name} panicked");
                    panicked.get_or_insert(name);
                }
            }
        }
        match panicked {
            Some(worker) => Err(ShopError::WorkerPanicked { worker }),
            None => Ok((cooks, couriers)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShopConfig;
    use crate::types::Order;

    #[test]
    fn crew_drains_a_small_session() {
        let config = ShopConfig {
            cooks: 2,
            couriers: 2,
            time_unit_ms: 1,
            preparation_min_units: 1,
            preparation_max_units: 2,
            travel_divisor: 1,
            ..ShopConfig::default()
        };
        let session = Arc::new(Session::new(config));
        let orders: Vec<Order> = (0..5).map(|id| Order::new(id, id % 3, 1)).collect();
        session.load(&orders);

        let crew = Crew::spawn(&session).expect("spawn crew");
        assert_eq!(crew.size(), 4);
        // Stand in for the dispatcher's signalling.
        while !session.progress().is_delivery_done() {
            session.kick_couriers();
            thread::sleep(std::time::Duration::from_millis(1));
        }
        let (cooks, couriers) = crew.join().expect("join crew");

        assert_eq!(cooks.iter().map(|c| c.cooked).sum::<usize>(), 5);
        assert_eq!(couriers.iter().map(|c| c.delivered).sum::<usize>(), 5);
        assert!(session.fault().is_none());
    }

    #[test]
    fn panicking_worker_is_reported() {
        let session = Arc::new(Session::new(ShopConfig::default()));
        let handle = spawn_worker("cook-9".to_string(), &session, || -> usize {
            panic!("burnt");
        })
        .expect("spawn");
        assert!(handle.join().is_err());
        assert_eq!(session.fault().as_deref(), Some("cook-9"));
    }
}
