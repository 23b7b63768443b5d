//! Command execution orchestration.
//!
//! One call to [`CommandExecutor::execute`] runs the whole pipeline for a
//! single command while holding the player's lock:
//!
//! ```text
//! acquire lock -> load -> migrate -> resolve -> validate -> execute
//!              -> capture result -> delta -> persist -> release
//! ```
//!
//! Nothing is written unless the command executed successfully. A rejected
//! or failing command leaves the stored document exactly as it was.

use std::collections::BTreeMap;

use keystone_commands::{
    CommandContext, CommandEnvelope, CommandError, CommandRegistry, CommandResult,
    CommandServices, CommandValidator, DeploymentEnvironment, ExecutionOrigin, GameCommand,
};
use keystone_state::{PlayerStateStore, ServerState, StateError, StateMigrations};
use keystone_types::{PlayerId, StateDelta, fields};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::locks::PlayerLockManager;

/// Outcome of one successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResponse {
    /// Models the command touched, with their post-command hashes.
    pub delta: StateDelta,
    /// The command's own output, if it produces one.
    pub result: Option<CommandResult>,
    /// Wire payload for the client: the delta under `StateDelta` and, when
    /// the client's game configuration is stale, `ConfigurationVersion`.
    pub data: BTreeMap<String, String>,
}

/// Orchestrates command execution against a player document store.
pub struct CommandExecutor<S> {
    store: S,
    registry: CommandRegistry,
    migrations: StateMigrations,
    validator: CommandValidator,
    locks: PlayerLockManager,
    environment: DeploymentEnvironment,
    configuration_version: u64,
    secret_key: Option<String>,
}

impl<S: PlayerStateStore> CommandExecutor<S> {
    /// Wire an executor from its collaborators and the server configuration.
    pub fn new(
        store: S,
        registry: CommandRegistry,
        migrations: StateMigrations,
        config: &ServerConfig,
    ) -> Self {
        Self {
            store,
            registry,
            migrations,
            validator: config.validator(),
            locks: PlayerLockManager::new(),
            environment: config.server.environment,
            configuration_version: config.game.configuration_version,
            secret_key: config.secret_key().map(str::to_owned),
        }
    }

    /// The underlying document store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The command registry.
    pub const fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Run one command for `player_id`.
    ///
    /// `data` is the command envelope. The caller is trusted only if the
    /// envelope carries the configured server secret.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Command`] if the command is unknown, rejected
    /// by validation, or fails while executing; [`ServerError::State`] if the
    /// stored document cannot be migrated; [`ServerError::Store`] if loading
    /// or persisting fails. In every case nothing is persisted.
    pub async fn execute(
        &self,
        player_id: &PlayerId,
        command_type_name: &str,
        data: BTreeMap<String, String>,
    ) -> Result<CommandResponse, ServerError> {
        let envelope = CommandEnvelope::new(data);
        let origin = ExecutionOrigin::from_envelope(&envelope, self.secret_key.as_deref());
        self.run(player_id, command_type_name, &envelope, origin)
            .await
    }

    /// Run one command on behalf of an in-process server caller.
    ///
    /// Same as [`execute`](Self::execute) but with a
    /// [`ServerTrusted`](ExecutionOrigin::ServerTrusted) origin, for
    /// scheduled jobs and backend services that never hold an envelope
    /// secret.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    pub async fn execute_trusted(
        &self,
        player_id: &PlayerId,
        command_type_name: &str,
        data: BTreeMap<String, String>,
    ) -> Result<CommandResponse, ServerError> {
        let envelope = CommandEnvelope::new(data);
        self.run(
            player_id,
            command_type_name,
            &envelope,
            ExecutionOrigin::ServerTrusted,
        )
        .await
    }

    async fn run(
        &self,
        player_id: &PlayerId,
        command_type_name: &str,
        envelope: &CommandEnvelope,
        origin: ExecutionOrigin,
    ) -> Result<CommandResponse, ServerError> {
        let request_id = Uuid::now_v7();
        tracing::debug!(
            %request_id,
            player_id = %player_id,
            command = command_type_name,
            ?origin,
            "Running command"
        );

        let outcome = self
            .run_locked(player_id, command_type_name, envelope, origin)
            .await;

        let saved_deltas = outcome.as_ref().map_or(0, |(_, saved)| *saved);
        tracing::info!(
            %request_id,
            command = command_type_name,
            player_id = %player_id,
            saved_deltas,
            success = outcome.is_ok(),
            "GameCommand"
        );

        match outcome {
            Ok((response, _)) => Ok(response),
            Err(err) => {
                if matches!(&err, ServerError::Command(e) if e.is_validation()) {
                    tracing::debug!(%request_id, error = %err, kind = err.kind_tag(), "Command rejected");
                } else {
                    tracing::warn!(%request_id, error = %err, kind = err.kind_tag(), "Command failed");
                }
                Err(err)
            }
        }
    }

    async fn run_locked(
        &self,
        player_id: &PlayerId,
        command_type_name: &str,
        envelope: &CommandEnvelope,
        origin: ExecutionOrigin,
    ) -> Result<(CommandResponse, usize), ServerError> {
        let _slot = self.locks.acquire(player_id).await;

        let mut state = self.store.get_player_state(player_id).await?;
        self.migrate(player_id, &mut state)?;

        let mut command = self.registry.build(command_type_name, envelope)?;
        let authorization = self.validator.validate(
            command_type_name,
            command.as_ref(),
            envelope,
            origin,
            state.last_timestamp()?,
        )?;

        let services = CommandServices::new(self.environment, self.configuration_version);
        execute_command(
            player_id,
            command_type_name,
            command.as_mut(),
            origin,
            &services,
            &mut state,
        )?;
        let result = command.take_result();
        state.set_last_timestamp(authorization.into_timestamp());

        let delta = state.deltas().clone();
        let saved = self.persist(player_id, &mut state).await?;

        let mut data = BTreeMap::new();
        if let Some(client_version) = envelope.configuration_version()
            && client_version < self.configuration_version
        {
            data.insert(
                fields::CONFIGURATION_VERSION.to_owned(),
                self.configuration_version.to_string(),
            );
        }
        delta.write_to(&mut data).map_err(StateError::from)?;

        Ok((
            CommandResponse {
                delta,
                result,
                data,
            },
            saved,
        ))
    }

    /// Run every initialization command for `player_id` and persist once.
    ///
    /// Commands run in registration order with a trusted origin against
    /// one loaded state; the returned delta covers every model any of them
    /// touched. Nothing is persisted if
    /// any of them fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if loading, migrating, executing, or
    /// persisting fails.
    pub async fn run_initialization_commands(
        &self,
        player_id: &PlayerId,
    ) -> Result<StateDelta, ServerError> {
        let _slot = self.locks.acquire(player_id).await;
        let mut state = self.store.get_player_state(player_id).await?;
        self.migrate(player_id, &mut state)?;
        let delta = self.initialize(player_id, &mut state)?;
        self.persist(player_id, &mut state).await?;
        Ok(delta)
    }

    /// Write `initial_state` as the player's document if they have none.
    ///
    /// Returns whether a document was created.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Store`] if the store fails.
    pub async fn setup_player(
        &self,
        player_id: &PlayerId,
        initial_state: BTreeMap<String, String>,
    ) -> Result<bool, ServerError> {
        let _slot = self.locks.acquire(player_id).await;
        self.setup_locked(player_id, initial_state).await
    }

    /// Prepare a player for a session.
    ///
    /// Creates the document from `initial_state` if needed, migrates it,
    /// runs the initialization commands, and persists the result. Returns
    /// the prepared state.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if any step fails; nothing past the initial
    /// document is persisted in that case.
    pub async fn load_player(
        &self,
        player_id: &PlayerId,
        initial_state: BTreeMap<String, String>,
    ) -> Result<ServerState, ServerError> {
        let _slot = self.locks.acquire(player_id).await;
        self.setup_locked(player_id, initial_state).await?;

        let mut state = self.store.get_player_state(player_id).await?;
        self.migrate(player_id, &mut state)?;
        self.initialize(player_id, &mut state)?;
        self.persist(player_id, &mut state).await?;
        Ok(state)
    }

    /// Delete the player's document.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Store`] if the store fails.
    pub async fn remove_player(&self, player_id: &PlayerId) -> Result<(), ServerError> {
        let _slot = self.locks.acquire(player_id).await;
        self.store.delete_player_state(player_id).await?;
        tracing::info!(player_id = %player_id, "Player data removed");
        Ok(())
    }

    async fn setup_locked(
        &self,
        player_id: &PlayerId,
        initial_state: BTreeMap<String, String>,
    ) -> Result<bool, ServerError> {
        let existing = self.store.get_player_state(player_id).await?;
        if !existing.is_empty() {
            return Ok(false);
        }

        let mut state = ServerState::from_data(initial_state);
        if state.version()?.is_none() {
            state.set_version(self.migrations.current_version());
        }
        let document = state.into_data();
        let keys = document.len();
        self.store.update_player_state(player_id, document).await?;
        tracing::info!(player_id = %player_id, keys, "Player document created");
        Ok(true)
    }

    fn migrate(&self, player_id: &PlayerId, state: &mut ServerState) -> Result<(), ServerError> {
        let applied = self.migrations.run_migrations(state)?;
        state.settle_delta();
        if applied > 0 {
            tracing::info!(
                player_id = %player_id,
                applied,
                version = self.migrations.current_version(),
                "Player state migrated"
            );
        }
        Ok(())
    }

    fn initialize(
        &self,
        player_id: &PlayerId,
        state: &mut ServerState,
    ) -> Result<StateDelta, ServerError> {
        let services = CommandServices::new(self.environment, self.configuration_version);
        let commands = self.registry.initialization_commands();
        tracing::debug!(
            player_id = %player_id,
            commands = ?commands.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            "Running initialization commands"
        );

        for (name, mut command) in commands {
            execute_command(
                player_id,
                name,
                command.as_mut(),
                ExecutionOrigin::ServerTrusted,
                &services,
                state,
            )?;
        }
        Ok(state.deltas().clone())
    }

    /// Persist the touched subset of `state`, returning how many keys were
    /// written.
    async fn persist(
        &self,
        player_id: &PlayerId,
        state: &mut ServerState,
    ) -> Result<usize, ServerError> {
        if !state.has_updates() {
            return Ok(0);
        }
        let updated = state.only_updated_state();
        let saved = updated.len();
        self.store.update_player_state(player_id, updated).await?;
        tracing::debug!(player_id = %player_id, saved, "Player state persisted");
        state.clear_updates();
        Ok(saved)
    }
}

impl<S> std::fmt::Debug for CommandExecutor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("registry", &self.registry)
            .field("migrations", &self.migrations)
            .field("validator", &self.validator)
            .field("environment", &self.environment)
            .field("configuration_version", &self.configuration_version)
            .finish_non_exhaustive()
    }
}

fn execute_command(
    player_id: &PlayerId,
    command_type_name: &str,
    command: &mut dyn GameCommand,
    origin: ExecutionOrigin,
    services: &CommandServices,
    state: &mut ServerState,
) -> Result<(), CommandError> {
    let mut ctx = CommandContext::new(player_id, origin, services, state);
    command
        .execute(&mut ctx)
        .map_err(|source| CommandError::Execution {
            command: command_type_name.to_owned(),
            source,
        })
}
