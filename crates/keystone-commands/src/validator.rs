//! The envelope gate every client command passes before touching state.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. Completeness -- `Timestamp` and `ClientVersion` are present (and parse).
//! 2. Compatibility -- `ClientVersion` is at least the configured minimum.
//! 3. Ordering -- `Timestamp` is strictly greater than the player's last
//!    accepted timestamp. Future timestamps are fine; only the sequence is
//!    checked.
//! 4. Permission -- initialization-only commands, environment locks, and
//!    admin commands without a trusted origin are all rejected with the
//!    same [`CommandError::InsufficientPermission`].
//!
//! Validation never mutates anything. Success yields an [`Authorization`]
//! that the executor consumes to record the accepted timestamp.

use keystone_types::ClientVersion;

use crate::command::{AccessLevel, DeploymentEnvironment, ExecutionMode, GameCommand};
use crate::envelope::CommandEnvelope;
use crate::error::CommandError;
use crate::origin::ExecutionOrigin;

/// Proof that one command passed validation.
///
/// Only [`CommandValidator::validate`] creates it, and consuming it is the
/// only way to learn the accepted timestamp.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an authorization must be consumed by executing the command"]
pub struct Authorization {
    timestamp: i64,
}

impl Authorization {
    /// Consume the authorization, yielding the accepted timestamp.
    pub const fn into_timestamp(self) -> i64 {
        self.timestamp
    }
}

/// Server-side validation policy.
#[derive(Debug, Clone)]
pub struct CommandValidator {
    min_client_version: ClientVersion,
    environment: DeploymentEnvironment,
    development_mode: bool,
}

impl CommandValidator {
    /// Create a validator for a server running in `environment`.
    pub const fn new(min_client_version: ClientVersion, environment: DeploymentEnvironment) -> Self {
        Self {
            min_client_version,
            environment,
            development_mode: false,
        }
    }

    /// In development mode admin commands do not need a trusted origin.
    /// Environment locks still apply.
    #[must_use]
    pub const fn with_development_mode(mut self, enabled: bool) -> Self {
        self.development_mode = enabled;
        self
    }

    /// Minimum accepted client version.
    pub const fn min_client_version(&self) -> &ClientVersion {
        &self.min_client_version
    }

    /// Environment this validator enforces locks against.
    pub const fn environment(&self) -> DeploymentEnvironment {
        self.environment
    }

    /// Run every check against one command.
    ///
    /// `last_timestamp` is the player's last accepted timestamp; a player
    /// with none is treated as having accepted timestamp `0`.
    ///
    /// # Errors
    ///
    /// Returns the first failing check's [`CommandError`].
    pub fn validate(
        &self,
        command_name: &str,
        command: &dyn GameCommand,
        envelope: &CommandEnvelope,
        origin: ExecutionOrigin,
        last_timestamp: Option<i64>,
    ) -> Result<Authorization, CommandError> {
        // 1. Completeness: report a missing key before any parse failure.
        envelope.require(keystone_types::fields::TIMESTAMP)?;
        envelope.require(keystone_types::fields::CLIENT_VERSION)?;
        let timestamp = envelope.timestamp()?;
        let client_version = envelope.client_version()?;

        // 2. Compatibility
        if client_version < self.min_client_version {
            return Err(CommandError::OutdatedClient {
                actual: client_version,
                required: self.min_client_version.clone(),
            });
        }

        // 3. Ordering
        let last_timestamp = last_timestamp.unwrap_or(0);
        if timestamp <= last_timestamp {
            return Err(CommandError::OutOfOrder {
                command: command_name.to_owned(),
                timestamp,
                last_timestamp,
            });
        }

        // 4. Permission
        if let Err(reason) = self.check_permission(command, origin) {
            tracing::debug!(
                command = command_name,
                ?origin,
                reason,
                "Command permission denied"
            );
            return Err(CommandError::InsufficientPermission {
                command: command_name.to_owned(),
            });
        }

        Ok(Authorization { timestamp })
    }

    /// Permission stage. The `Err` string is for server logs only and never
    /// reaches the caller.
    fn check_permission(
        &self,
        command: &dyn GameCommand,
        origin: ExecutionOrigin,
    ) -> Result<(), &'static str> {
        if command.execution_mode() == ExecutionMode::Initialization {
            return Err("initialization commands are server-only");
        }

        if let Some(lock) = command.environment_lock()
            && !lock.allowed_environments().contains(&self.environment)
        {
            return Err("environment not allowed");
        }

        if command.access_level() == AccessLevel::Admin
            && !origin.is_trusted()
            && !self.development_mode
        {
            return Err("admin command from untrusted origin");
        }

        Ok(())
    }
}
