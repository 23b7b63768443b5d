//! Error types for command execution.
//!
//! [`ServerError`] wraps every failure a caller of the executor can see and
//! renders it into the payload returned to game clients.

use std::collections::BTreeMap;

use keystone_commands::{CommandError, ErrorKind};
use keystone_state::{StateError, StoreError};
use keystone_types::fields;

/// Top-level error returned by [`CommandExecutor`](crate::CommandExecutor).
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The command was rejected or failed while executing.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The stored player document is inconsistent or a migration failed.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// The document store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ServerError {
    /// Stable tag identifying the failure class.
    pub const fn kind_tag(&self) -> &'static str {
        match self {
            Self::Command(e) => e.kind().as_str(),
            Self::State(_) => "StateError",
            Self::Store(_) => "StoreError",
        }
    }

    /// The command error kind, if this is a command failure.
    pub const fn command_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Command(e) => Some(e.kind()),
            Self::State(_) | Self::Store(_) => None,
        }
    }

    /// Payload returned to the client in place of a response.
    pub fn to_error_data(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (fields::LOGIC_EXCEPTION.to_owned(), self.to_string()),
            (fields::ERROR_KIND.to_owned(), self.kind_tag().to_owned()),
        ])
    }
}
