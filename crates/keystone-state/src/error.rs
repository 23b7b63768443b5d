//! Error types for player state handling and persistence.

use std::num::ParseIntError;

use keystone_types::CodecError;

/// Errors raised while reading or transforming a player document in memory.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// A model payload could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The reserved `version` key holds something other than an integer.
    #[error("stored schema version {value:?} is not an integer")]
    InvalidVersion {
        /// The raw stored value.
        value: String,
        /// The underlying parse error.
        source: ParseIntError,
    },

    /// The reserved `Timestamp` key holds something other than an integer.
    #[error("stored command timestamp {value:?} is not an integer")]
    InvalidTimestamp {
        /// The raw stored value.
        value: String,
        /// The underlying parse error.
        source: ParseIntError,
    },

    /// A registered migration rejected the document.
    #[error("migration from version {from_version} failed: {reason}")]
    Migration {
        /// The source version of the failing migration.
        from_version: u64,
        /// Description of the failure.
        reason: String,
    },
}

/// Errors raised by a [`PlayerStateStore`](crate::PlayerStateStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// The backend could not be configured or reached.
    #[error("Configuration error: {0}")]
    Config(String),
}
