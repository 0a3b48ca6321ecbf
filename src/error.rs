//! Error types for the shop.

use thiserror::Error;

/// Unrecoverable session or startup failures. Contention, disconnects and
/// cancellations are not errors; see `SessionOutcome`.
#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The listener itself failed; per-session I/O errors use `Io`.
    #[error("Failed to accept a client: {0}")]
    Accept(#[source] std::io::Error),

    #[error("Order batch of {orders} orders exceeds the limit of {max}")]
    BatchTooLarge { orders: usize, max: usize },

    #[error("Failed to spawn {role} thread: {source}")]
    Spawn {
        role: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker {worker} panicked")]
    WorkerPanicked { worker: String },
}

/// Rejected configuration values.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be in range {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("preparation bounds are inverted: min {min} > max {max}")]
    InvertedPreparationBounds { min: u64, max: u64 },

    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, ShopError>;
