//! A client stand-in that predicts each command locally and checks its
//! prediction against the server's delta.

use keystone_commands::{
    CommandContext, CommandEnvelope, CommandRegistry, CommandServices, DeploymentEnvironment,
    ExecutionOrigin,
};
use keystone_state::ServerState;
use keystone_types::{PlayerId, StateDelta, client_delta, desynced_between, find_desynced};
use tracing::{info, warn};

/// Local copy of one player's state, advanced by client-side prediction.
#[derive(Debug)]
pub struct ClientMirror {
    player_id: PlayerId,
    state: ServerState,
    services: CommandServices,
    /// Local state after the in-flight prediction, if it succeeded.
    pending: Option<ServerState>,
    /// Every server delta received this session.
    received: StateDelta,
}

impl ClientMirror {
    /// Start from the state the server handed out at login.
    pub fn new(player_id: PlayerId, login_state: &ServerState, configuration_version: u64) -> Self {
        Self {
            player_id,
            state: ServerState::from_data(login_state.data().clone()),
            services: CommandServices::new(DeploymentEnvironment::Development, configuration_version),
            pending: None,
            received: StateDelta::new(),
        }
    }

    /// Run the command against a copy of the local state, as a game client
    /// would before the server answers. The prediction takes effect in
    /// [`reconcile`](Self::reconcile) and is dropped by
    /// [`rollback`](Self::rollback).
    pub fn predict(&mut self, registry: &CommandRegistry, name: &str, envelope: &CommandEnvelope) {
        self.pending = None;
        let mut command = match registry.build(name, envelope) {
            Ok(command) => command,
            Err(e) => {
                warn!(command = name, error = %e, "Client could not build command");
                return;
            }
        };

        let mut scratch = self.state.clone();
        let mut ctx = CommandContext::new(
            &self.player_id,
            ExecutionOrigin::ClientUntrusted,
            &self.services,
            &mut scratch,
        );
        match command.execute(&mut ctx) {
            Ok(()) => {
                scratch.clear_updates();
                self.pending = Some(scratch);
            }
            Err(e) => warn!(command = name, error = %e, "Client prediction failed"),
        }
    }

    /// Apply the pending prediction and compare the local state with the
    /// server delta. Returns the desynced model types.
    ///
    /// # Errors
    ///
    /// Returns an error if a local model cannot be serialized.
    pub fn reconcile(&mut self, server_delta: &StateDelta) -> anyhow::Result<Vec<String>> {
        if let Some(predicted) = self.pending.take() {
            self.state = predicted;
        }
        self.received.merge(server_delta);
        let desynced = find_desynced(server_delta, &self.state)?;
        if desynced.is_empty() {
            info!(types = server_delta.len(), "Client in sync");
        } else {
            warn!(?desynced, "Client desynced from server");
        }
        Ok(desynced)
    }

    /// Drop the pending prediction after the server rejected the command.
    pub fn rollback(&mut self) {
        self.pending = None;
    }

    /// Compare a hash snapshot of the whole local state with every delta
    /// received this session.
    ///
    /// # Errors
    ///
    /// Returns an error if a local model cannot be serialized.
    pub fn session_report(&self) -> anyhow::Result<Vec<String>> {
        let snapshot = client_delta(&self.state)?;
        Ok(desynced_between(&snapshot, &self.received))
    }

    /// Overwrite a raw local key, simulating a client that drifted.
    pub fn tamper(&mut self, key: &str, value: &str) {
        self.state.set(key, value);
        self.state.clear_updates();
    }
}
