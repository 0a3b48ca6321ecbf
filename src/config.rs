//! Shop configuration: resource sizes, pool sizes and simulated timing.

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Position;

/// Largest accepted pool size, courier speed and resource count.
pub const MAX_POOL_SIZE: u64 = 1024;
/// Longest preparation, in time units.
pub const MAX_PREPARATION_UNITS: u64 = 3600;

/// Plain numbers consumed by the core. Every simulated delay is expressed in
/// time units of `time_unit_ms` milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Orders the oven holds at once.
    pub oven_capacity: usize,
    /// Doors through which orders enter or leave the oven.
    pub oven_doors: usize,
    /// Paddles needed to move orders in or out.
    pub oven_paddles: usize,
    pub cooks: usize,
    pub couriers: usize,
    /// Divides courier travel time.
    pub courier_speed: u64,
    /// Orders a courier carries per trip.
    pub delivery_batch: usize,
    pub preparation_min_units: u64,
    pub preparation_max_units: u64,
    /// Squared distance covered per time unit at speed 1.
    pub travel_divisor: u64,
    pub time_unit_ms: u64,
    /// How long the dispatcher waits on the client per monitor round.
    pub poll_timeout_ms: u64,
    /// Pause after a worker iteration that made no progress.
    pub backoff_ms: u64,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            oven_capacity: 6,
            oven_doors: 2,
            oven_paddles: 3,
            cooks: 4,
            couriers: 4,
            courier_speed: 1,
            delivery_batch: 3,
            preparation_min_units: 3,
            preparation_max_units: 5,
            travel_divisor: 10_000,
            time_unit_ms: 1000,
            poll_timeout_ms: 1000,
            backoff_ms: 1,
        }
    }
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl ShopConfig {
    /// Load configuration from a TOML file; missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("oven_capacity", self.oven_capacity as u64, 1, MAX_POOL_SIZE)?;
        check_range("oven_doors", self.oven_doors as u64, 1, MAX_POOL_SIZE)?;
        check_range("oven_paddles", self.oven_paddles as u64, 1, MAX_POOL_SIZE)?;
        check_range("cooks", self.cooks as u64, 1, MAX_POOL_SIZE)?;
        check_range("couriers", self.couriers as u64, 1, MAX_POOL_SIZE)?;
        check_range("courier_speed", self.courier_speed, 1, MAX_POOL_SIZE)?;
        check_range("delivery_batch", self.delivery_batch as u64, 1, MAX_POOL_SIZE)?;
        check_range(
            "preparation_max_units",
            self.preparation_max_units,
            0,
            MAX_PREPARATION_UNITS,
        )?;
        if self.preparation_min_units > self.preparation_max_units {
            return Err(ConfigError::InvertedPreparationBounds {
                min: self.preparation_min_units,
                max: self.preparation_max_units,
            });
        }
        check_range("travel_divisor", self.travel_divisor, 1, u64::from(u32::MAX))?;
        check_range("time_unit_ms", self.time_unit_ms, 1, 60_000)?;
        check_range("poll_timeout_ms", self.poll_timeout_ms, 1, 60_000)?;
        check_range("backoff_ms", self.backoff_ms, 0, 1000)?;
        Ok(())
    }

    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Random preparation latency within the configured bounds.
    pub fn preparation_time<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let units = rng.gen_range(self.preparation_min_units..=self.preparation_max_units);
        self.time_unit().saturating_mul(units as u32)
    }

    /// Simulated travel time, proportional to the squared distance.
    pub fn travel_time(&self, from: Position, to: Position) -> Duration {
        let units = from.distance_squared(to) as f64
            / (self.courier_speed.max(1) * self.travel_divisor.max(1)) as f64;
        let nanos = self.time_unit().as_nanos() as f64 * units;
        if nanos >= u64::MAX as f64 {
            return Duration::from_nanos(u64::MAX);
        }
        Duration::from_nanos(nanos as u64)
    }
}
