//! A simulated food shop: a dispatcher takes one client's batch of orders,
//! a cook pool prepares and bakes them in a shared oven guarded by door and
//! paddle permits, and a courier pool delivers them in small batches.

pub mod client;
pub mod config;
pub mod cook;
pub mod courier;
pub mod crew;
pub mod demo;
pub mod dispatcher;
pub mod error;
pub mod link;
pub mod logging;
pub mod oven;
pub mod permits;
pub mod progress;
pub mod protocol;
pub mod report;
pub mod ring_queue;
pub mod server;
pub mod session;
pub mod signal;
pub mod types;

pub use config::ShopConfig;
pub use dispatcher::Dispatcher;
pub use error::{ConfigError, Result, ShopError};
pub use link::{ClientLink, LinkEvent, MemoryLink};
pub use report::{AbortReason, SessionOutcome, SessionReport};
pub use server::Server;
pub use types::{Order, Position};
