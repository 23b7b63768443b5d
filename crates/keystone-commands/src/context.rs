//! What a command sees while it executes.

use chrono::{DateTime, Utc};
use keystone_state::ServerState;
use keystone_types::{CodecError, Model, ModelHash, PlayerId};

use crate::command::DeploymentEnvironment;
use crate::origin::ExecutionOrigin;

/// Server-wide facts a command may consult while executing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandServices {
    /// Deployment stage of this server.
    pub environment: DeploymentEnvironment,
    /// Version of the game configuration this server runs.
    pub configuration_version: u64,
    /// Wall-clock time at which execution started.
    pub now: DateTime<Utc>,
}

impl CommandServices {
    /// Services stamped with the current time.
    pub fn new(environment: DeploymentEnvironment, configuration_version: u64) -> Self {
        Self {
            environment,
            configuration_version,
            now: Utc::now(),
        }
    }
}

/// Execution context for one command.
///
/// Model reads and writes go through the player's [`ServerState`], so every
/// write is tracked for the response delta and for persistence.
#[derive(Debug)]
pub struct CommandContext<'a> {
    player_id: &'a PlayerId,
    origin: ExecutionOrigin,
    services: &'a CommandServices,
    state: &'a mut ServerState,
}

impl<'a> CommandContext<'a> {
    /// Assemble a context around a loaded, migrated state.
    pub fn new(
        player_id: &'a PlayerId,
        origin: ExecutionOrigin,
        services: &'a CommandServices,
        state: &'a mut ServerState,
    ) -> Self {
        Self {
            player_id,
            origin,
            services,
            state,
        }
    }

    /// The player whose state is being mutated.
    pub const fn player_id(&self) -> &PlayerId {
        self.player_id
    }

    /// Who triggered the command.
    pub const fn origin(&self) -> ExecutionOrigin {
        self.origin
    }

    /// Server-wide facts.
    pub const fn services(&self) -> &CommandServices {
        self.services
    }

    /// Read a model, defaulting if the player never had one.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the stored payload is corrupt.
    pub fn model<T: Model>(&self) -> Result<T, CodecError> {
        self.state.deserialize_model()
    }

    /// Write a model back.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the model cannot be serialized.
    pub fn update<T: Model>(&mut self, model: &T) -> Result<ModelHash, CodecError> {
        self.state.update_model(model)
    }

    /// Read a model, let `f` change it, and write it back.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the model cannot be read or written.
    pub fn modify<T, F>(&mut self, f: F) -> Result<ModelHash, CodecError>
    where
        T: Model,
        F: FnOnce(&mut T),
    {
        let mut model = self.model::<T>()?;
        f(&mut model);
        self.update(&model)
    }

    /// Borrow the underlying state document.
    pub fn state(&self) -> &ServerState {
        &*self.state
    }
}
