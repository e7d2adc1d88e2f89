//! Error types for the ordered map and its index.

use thiserror::Error;

/// Error variants for vEB-indexed map operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A strict (`try_`-prefixed) operation required a key that is absent.
    #[error("missing key: {0}")]
    MissingKey(u64),

    /// A key lies at or beyond the configured universe capacity.
    #[error("key {key} out of range for capacity {capacity}")]
    OutOfRange {
        /// The offending key.
        key: u64,
        /// The capacity of the universe that rejected it.
        capacity: u64,
    },

    /// A capacity upgrade would shrink the universe.
    #[error("cannot shrink capacity from {current} to {requested}")]
    CapacityShrink {
        /// Capacity before the attempted upgrade.
        current: u64,
        /// Capacity the upgrade would have produced.
        requested: u64,
    },

    /// Constructor parameters do not describe a valid universe.
    #[error("invalid universe: {0}")]
    InvalidUniverse(String),
}

/// A specialized Result type for vEB map operations.
pub type Result<T> = std::result::Result<T, Error>;
