//! The capability set every command declares.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::CommandContext;
use crate::error::ExecutionError;

/// Optional key/value output a command hands back to the caller.
pub type CommandResult = BTreeMap<String, String>;

/// Minimum trust tier needed to run a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    /// Any authenticated player.
    #[default]
    Player,
    /// Only callers proven to be the server (or in development mode).
    Admin,
}

/// Who is allowed to trigger a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Sent by a client and validated through the envelope gate.
    #[default]
    Server,
    /// Run only by the server when a player's state is loaded. Clients can
    /// never invoke it.
    Initialization,
}

/// Deployment stage a server instance runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentEnvironment {
    /// Local and shared development servers.
    #[default]
    Development,
    /// Pre-release staging.
    Staging,
    /// Live production.
    Production,
}

impl DeploymentEnvironment {
    /// Lowercase name as used in configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for DeploymentEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown deployment environment {other:?}")),
        }
    }
}

/// Restricts a command to a fixed set of deployment environments.
pub trait EnvironmentLock {
    /// Environments in which the command may run.
    fn allowed_environments(&self) -> &[DeploymentEnvironment];
}

/// One authoritative state mutation.
///
/// Implementations hold the command's deserialized fields. The defaults
/// describe an ordinary player command with no environment restriction and
/// no result payload.
pub trait GameCommand: Send + Sync + fmt::Debug {
    /// Trust tier required to run this command.
    fn access_level(&self) -> AccessLevel {
        AccessLevel::Player
    }

    /// Who may trigger this command.
    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::Server
    }

    /// The command's environment restriction, if it has one.
    fn environment_lock(&self) -> Option<&dyn EnvironmentLock> {
        None
    }

    /// Apply the mutation to the player's state.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError`] if a game rule refuses the mutation or a
    /// model cannot be read or written. Any changes made before the error
    /// are discarded.
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), ExecutionError>;

    /// Output to return to the caller, taken once after a successful execute.
    fn take_result(&mut self) -> Option<CommandResult> {
        None
    }
}
