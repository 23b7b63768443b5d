//! Error taxonomy for command validation, resolution, and execution.
//!
//! Every error maps to an [`ErrorKind`] whose [`as_str`](ErrorKind::as_str)
//! tag is what the caller receives alongside the message.

use std::fmt;

use keystone_state::StateError;
use keystone_types::{ClientVersion, CodecError};

/// Stable tag identifying the class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required envelope key is absent.
    MissingField,
    /// An envelope key is present but cannot be parsed.
    MalformedField,
    /// The client build is older than the server accepts.
    OutdatedClient,
    /// The command timestamp does not advance the player's sequence.
    OutOfOrder,
    /// Access level, origin, or environment lock rejected the command.
    InsufficientPermission,
    /// The command type name is not registered.
    CommandNotFound,
    /// The command failed while executing.
    Execution,
}

impl ErrorKind {
    /// The tag returned to callers.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "MissingFieldError",
            Self::MalformedField => "MalformedFieldError",
            Self::OutdatedClient => "OutdatedClientError",
            Self::OutOfOrder => "OutOfOrderError",
            Self::InsufficientPermission => "InsufficientPermissionError",
            Self::CommandNotFound => "CommandNotFoundError",
            Self::Execution => "ExecutionError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised from inside a command's `execute`.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// A game rule refused the mutation (not enough currency, item locked, ...).
    #[error("{reason}")]
    Rejected {
        /// Description of the refused rule.
        reason: String,
    },

    /// A model could not be read or written.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The player document is inconsistent.
    #[error(transparent)]
    State(#[from] StateError),
}

impl ExecutionError {
    /// Build a [`ExecutionError::Rejected`] from a reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Errors returned by command validation, resolution, and execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// A required envelope key is absent.
    #[error("command data requires the field {field}")]
    MissingField {
        /// The missing key.
        field: String,
    },

    /// An envelope key could not be parsed.
    #[error("field {field} has an invalid value {value:?}: {reason}")]
    MalformedField {
        /// The offending key.
        field: String,
        /// The raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The command's serialized fields do not match its type.
    #[error("invalid payload for command {command}: {source}")]
    InvalidPayload {
        /// The command type name.
        command: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// The client build is older than the configured minimum.
    #[error("outdated client {actual} but expected minimal version {required}")]
    OutdatedClient {
        /// The version the client reported.
        actual: ClientVersion,
        /// The minimum the server accepts.
        required: ClientVersion,
    },

    /// The timestamp does not exceed the last accepted one.
    #[error("outdated command timestamp for command {command}. Command out of order?")]
    OutOfOrder {
        /// The command type name.
        command: String,
        /// The rejected timestamp.
        timestamp: i64,
        /// The last timestamp accepted for this player.
        last_timestamp: i64,
    },

    /// The command may not run for this caller or in this environment.
    #[error("insufficient permissions to run command {command}")]
    InsufficientPermission {
        /// The command type name.
        command: String,
    },

    /// The type name does not resolve in the registry.
    #[error("command {command} is not registered")]
    CommandNotFound {
        /// The unresolved type name.
        command: String,
    },

    /// The command failed while executing. Nothing was persisted.
    #[error("command {command} failed: {source}")]
    Execution {
        /// The command type name.
        command: String,
        /// The failure raised by the command.
        source: ExecutionError,
    },
}

impl CommandError {
    /// The kind tag of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField { .. } => ErrorKind::MissingField,
            Self::MalformedField { .. } | Self::InvalidPayload { .. } => ErrorKind::MalformedField,
            Self::OutdatedClient { .. } => ErrorKind::OutdatedClient,
            Self::OutOfOrder { .. } => ErrorKind::OutOfOrder,
            Self::InsufficientPermission { .. } => ErrorKind::InsufficientPermission,
            Self::CommandNotFound { .. } => ErrorKind::CommandNotFound,
            Self::Execution { .. } => ErrorKind::Execution,
        }
    }

    /// Whether the error was raised before any state was touched.
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::Execution { .. })
    }
}
