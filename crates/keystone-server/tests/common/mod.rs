//! Shared fixtures for executor integration tests: a tiny game with a
//! wallet, a profile, and a handful of commands.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::BTreeMap;

use keystone_commands::{
    AccessLevel, CommandContext, CommandRegistry, CommandResult, DeploymentEnvironment,
    EnvironmentLock, ExecutionError, ExecutionMode, GameCommand,
};
use keystone_server::{CommandExecutor, ServerConfig};
use keystone_state::{
    InMemoryStateStore, PlayerStateStore, ServerState, StateError, StateMigrations, StoreError,
};
use keystone_types::{ClientVersion, Model, PlayerId, fields};
use serde::{Deserialize, Serialize};

pub const SECRET: &str = "server-secret";
pub const CONFIGURATION_VERSION: u64 = 5;
pub const SCHEMA_VERSION: u64 = 1;

// =============================================================================
// Models
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub coins: u64,
    pub gems: u64,
}

impl Model for Wallet {
    const TYPE_ID: &'static str = "Wallet";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub starter_granted: bool,
}

impl Model for Profile {
    const TYPE_ID: &'static str = "Profile";
}

// =============================================================================
// Commands
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SetCoins {
    pub amount: u64,
}

impl GameCommand for SetCoins {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), ExecutionError> {
        ctx.modify::<Wallet, _>(|wallet| wallet.coins = self.amount)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct AddCoins {
    pub amount: u64,
    #[serde(skip)]
    result: Option<CommandResult>,
}

impl GameCommand for AddCoins {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), ExecutionError> {
        let mut wallet = ctx.model::<Wallet>()?;
        wallet.coins = wallet.coins.saturating_add(self.amount);
        ctx.update(&wallet)?;
        self.result = Some(BTreeMap::from([(
            "coins".to_owned(),
            wallet.coins.to_string(),
        )]));
        Ok(())
    }

    fn take_result(&mut self) -> Option<CommandResult> {
        self.result.take()
    }
}

/// Writes the wallet before checking the balance, so a rejection leaves an
/// in-memory mutation behind.
#[derive(Debug, Deserialize)]
pub struct SpendCoins {
    pub amount: u64,
}

impl GameCommand for SpendCoins {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), ExecutionError> {
        let before = ctx.model::<Wallet>()?;
        ctx.modify::<Wallet, _>(|wallet| wallet.coins = wallet.coins.saturating_sub(self.amount))?;
        if before.coins < self.amount {
            return Err(ExecutionError::rejected("not enough coins"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct GrantGems {
    pub amount: u64,
}

impl GameCommand for GrantGems {
    fn access_level(&self) -> AccessLevel {
        AccessLevel::Admin
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), ExecutionError> {
        ctx.modify::<Wallet, _>(|wallet| wallet.gems = wallet.gems.saturating_add(self.amount))?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ResetWallet {}

impl EnvironmentLock for ResetWallet {
    fn allowed_environments(&self) -> &[DeploymentEnvironment] {
        &[DeploymentEnvironment::Development, DeploymentEnvironment::Staging]
    }
}

impl GameCommand for ResetWallet {
    fn environment_lock(&self) -> Option<&dyn EnvironmentLock> {
        Some(self)
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), ExecutionError> {
        ctx.update(&Wallet::default())?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct Rename {
    pub name: String,
}

impl GameCommand for Rename {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), ExecutionError> {
        let name = self.name.clone();
        ctx.modify::<Profile, _>(|profile| profile.name = name)?;
        Ok(())
    }
}

/// Grants starter gems exactly once per player.
#[derive(Debug, Default, Deserialize)]
pub struct StarterGems {}

impl GameCommand for StarterGems {
    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::Initialization
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), ExecutionError> {
        let mut profile = ctx.model::<Profile>()?;
        if profile.starter_granted {
            return Ok(());
        }
        profile.starter_granted = true;
        ctx.update(&profile)?;
        ctx.modify::<Wallet, _>(|wallet| wallet.gems = wallet.gems.saturating_add(10))?;
        Ok(())
    }
}

// =============================================================================
// Wiring
// =============================================================================

pub fn registry() -> CommandRegistry {
    CommandRegistry::new()
        .with_command::<SetCoins>("SetCoins")
        .with_command::<AddCoins>("AddCoins")
        .with_command::<SpendCoins>("SpendCoins")
        .with_command::<GrantGems>("GrantGems")
        .with_command::<ResetWallet>("ResetWallet")
        .with_command::<Rename>("Rename")
        .with_initialization_command::<StarterGems>("StarterGems")
}

/// Version 0 documents kept coins under a raw `LegacyCoins` key.
pub fn migrations() -> StateMigrations {
    StateMigrations::new(SCHEMA_VERSION).with_migration(0, |state: &mut ServerState| {
        let Some(raw) = state.get("LegacyCoins") else {
            return Ok(());
        };
        let coins = raw.parse::<u64>().map_err(|e| StateError::Migration {
            from_version: 0,
            reason: format!("LegacyCoins {raw:?}: {e}"),
        })?;
        let mut wallet = state.deserialize_model::<Wallet>()?;
        wallet.coins = coins;
        state.update_model(&wallet)?;
        Ok(())
    })
}

pub fn config(environment: DeploymentEnvironment) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.server.environment = environment;
    config.server.min_client_version = ClientVersion::new(1, 0, 0);
    config.game.configuration_version = CONFIGURATION_VERSION;
    config.security.secret_key = Some(SECRET.to_owned());
    config
}

pub fn executor() -> CommandExecutor<InMemoryStateStore> {
    executor_in(DeploymentEnvironment::Production)
}

pub fn executor_in(environment: DeploymentEnvironment) -> CommandExecutor<InMemoryStateStore> {
    CommandExecutor::new(
        InMemoryStateStore::new(),
        registry(),
        migrations(),
        &config(environment),
    )
}

/// A client envelope with the given timestamp and `CommandData` payload.
pub fn envelope(timestamp: i64, payload: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (fields::TIMESTAMP.to_owned(), timestamp.to_string()),
        (fields::CLIENT_VERSION.to_owned(), "1.0.0".to_owned()),
        (fields::COMMAND_DATA.to_owned(), payload.to_owned()),
    ])
}

pub fn with_field(
    mut data: BTreeMap<String, String>,
    key: &str,
    value: &str,
) -> BTreeMap<String, String> {
    data.insert(key.to_owned(), value.to_owned());
    data
}

pub async fn wallet<S: PlayerStateStore>(store: &S, player: &PlayerId) -> Wallet {
    store
        .get_player_state(player)
        .await
        .unwrap()
        .deserialize_model()
        .unwrap()
}

/// Yields to the scheduler before every store call so concurrent commands
/// interleave at each await point.
#[derive(Debug, Default)]
pub struct YieldingStore {
    pub inner: InMemoryStateStore,
}

impl PlayerStateStore for YieldingStore {
    async fn get_player_state(&self, player_id: &PlayerId) -> Result<ServerState, StoreError> {
        tokio::task::yield_now().await;
        self.inner.get_player_state(player_id).await
    }

    async fn update_player_state(
        &self,
        player_id: &PlayerId,
        partial: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.inner.update_player_state(player_id, partial).await
    }

    async fn delete_player_state(&self, player_id: &PlayerId) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.inner.delete_player_state(player_id).await
    }
}
