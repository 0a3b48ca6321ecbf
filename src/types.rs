//! Order model and identifiers shared across the shop.

use std::fmt;
use std::time::{Duration, Instant};

/// Customer identifier as sent by the client.
pub type CustomerId = i32;
/// Index of a cook thread within the cook pool.
pub type CookId = usize;
/// Index of a courier thread within the courier pool.
pub type CourierId = usize;

/// A point on the delivery grid. The shop sits at the origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// The shop's own location.
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn is_origin(&self) -> bool {
        *self == Self::ORIGIN
    }

    /// Squared euclidean distance; travel time is proportional to it.
    pub fn distance_squared(&self, other: Position) -> u64 {
        let dx = (i64::from(self.x) - i64::from(other.x)).unsigned_abs();
        let dy = (i64::from(self.y) - i64::from(other.y)).unsigned_abs();
        (dx * dx).saturating_add(dy * dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A customer's order. Immutable once parsed from the inbound batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Order {
    pub customer_id: CustomerId,
    pub destination: Position,
}

impl Order {
    pub fn new(customer_id: CustomerId, x: i32, y: i32) -> Self {
        Self {
            customer_id,
            destination: Position::new(x, y),
        }
    }
}

/// A prepared order sitting in a cook's staging queue, waiting for a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StagedOrder {
    pub order: Order,
    /// How long the order has to stay in the oven once inserted.
    pub bake: Duration,
}

/// An order inside the oven together with the instant it may be taken out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledOrder {
    pub order: Order,
    pub ready_at: Instant,
}

impl ScheduledOrder {
    /// Schedule a staged order that enters the oven at `inserted_at`.
    pub fn schedule(staged: StagedOrder, inserted_at: Instant) -> Self {
        Self {
            order: staged.order,
            ready_at: inserted_at + staged.bake,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.ready_at <= now
    }
}

/// Bookkeeping record for an order a courier has picked up but not delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeliveryClaim {
    pub courier: CourierId,
    pub order: Order,
}
