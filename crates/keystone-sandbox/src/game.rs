//! A small sample economy: coins, gems, and an item inventory.
//!
//! These commands stand in for a real game's content so the pipeline can be
//! exercised end to end.

use std::collections::BTreeMap;

use keystone_commands::{
    AccessLevel, CommandContext, CommandRegistry, CommandResult, DeploymentEnvironment,
    EnvironmentLock, ExecutionError, ExecutionMode, GameCommand,
};
use keystone_state::{ServerState, StateError, StateMigrations};
use keystone_types::Model;
use serde::{Deserialize, Serialize};

/// Schema version of the sample models.
pub const SCHEMA_VERSION: u64 = 2;

// =============================================================================
// Models
// =============================================================================

/// Soft and hard currency balances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Soft currency.
    pub coins: u64,
    /// Hard currency.
    pub gems: u64,
}

impl Model for Wallet {
    const TYPE_ID: &'static str = "Wallet";
}

/// Owned items and their counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Item id to count.
    pub items: BTreeMap<String, u32>,
}

impl Model for Inventory {
    const TYPE_ID: &'static str = "Inventory";
}

/// Daily login bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginStreak {
    /// Last UTC day (days since epoch) a bonus was granted.
    pub last_day: i64,
    /// Consecutive days with a login.
    pub streak: u32,
}

impl Model for LoginStreak {
    const TYPE_ID: &'static str = "LoginStreak";
}

// =============================================================================
// Commands
// =============================================================================

/// Adds coins, e.g. a match reward.
#[derive(Debug, Deserialize)]
pub struct AddCoins {
    amount: u64,
}

impl GameCommand for AddCoins {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), ExecutionError> {
        ctx.modify::<Wallet, _>(|wallet| wallet.coins = wallet.coins.saturating_add(self.amount))?;
        Ok(())
    }
}

/// Buys `quantity` of an item for coins.
#[derive(Debug, Deserialize)]
pub struct BuyItem {
    item: String,
    price: u64,
    #[serde(default = "one")]
    quantity: u32,
    #[serde(skip)]
    result: Option<CommandResult>,
}

const fn one() -> u32 {
    1
}

impl GameCommand for BuyItem {
    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), ExecutionError> {
        let cost = self.price.saturating_mul(u64::from(self.quantity));
        let mut wallet = ctx.model::<Wallet>()?;
        let Some(remaining) = wallet.coins.checked_sub(cost) else {
            return Err(ExecutionError::rejected(format!(
                "{} costs {cost} coins but the wallet holds {}",
                self.item, wallet.coins
            )));
        };
        wallet.coins = remaining;
        ctx.update(&wallet)?;

        let mut inventory = ctx.model::<Inventory>()?;
        let count = inventory.items.entry(self.item.clone()).or_default();
        *count = count.saturating_add(self.quantity);
        let owned = *count;
        ctx.update(&inventory)?;

        self.result = Some(BTreeMap::from([(self.item.clone(), owned.to_string())]));
        Ok(())
    }

    fn take_result(&mut self) -> Option<CommandResult> {
        self.result.take()
    }
}

/// Support tool: grants gems. Requires a trusted caller.
#[derive(Debug, Deserialize)]
pub struct GrantGems {
    amount: u64,
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

/// QA cheat: wipes wallet and inventory. Never available in production.
#[derive(Debug, Deserialize)]
pub struct ResetProgress {}

impl EnvironmentLock for ResetProgress {
    fn allowed_environments(&self) -> &[DeploymentEnvironment] {
        &[DeploymentEnvironment::Development, DeploymentEnvironment::Staging]
    }
}

impl GameCommand for ResetProgress {
    fn environment_lock(&self) -> Option<&dyn EnvironmentLock> {
        Some(self)
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), ExecutionError> {
        ctx.update(&Wallet::default())?;
        ctx.update(&Inventory::default())?;
        Ok(())
    }
}

/// Grants a login bonus once per UTC day.
#[derive(Debug, Default, Deserialize)]
pub struct DailyLogin {}

impl GameCommand for DailyLogin {
    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::Initialization
    }

    fn execute(&mut self, ctx: &mut CommandContext<'_>) -> Result<(), ExecutionError> {
        let today = ctx
            .services()
            .now
            .timestamp()
            .div_euclid(86_400);
        let mut login = ctx.model::<LoginStreak>()?;
        if login.last_day == today {
            return Ok(());
        }
        login.streak = if login.last_day.saturating_add(1) == today {
            login.streak.saturating_add(1)
        } else {
            1
        };
        login.last_day = today;
        let bonus = u64::from(login.streak.min(7)).saturating_mul(10);
        ctx.update(&login)?;
        ctx.modify::<Wallet, _>(|wallet| wallet.coins = wallet.coins.saturating_add(bonus))?;
        Ok(())
    }
}

// =============================================================================
// Wiring
// =============================================================================

/// Every sample command.
pub fn registry() -> CommandRegistry {
    CommandRegistry::new()
        .with_command::<AddCoins>("AddCoins")
        .with_command::<BuyItem>("BuyItem")
        .with_command::<GrantGems>("GrantGems")
        .with_command::<ResetProgress>("ResetProgress")
        .with_initialization_command::<DailyLogin>("DailyLogin")
}

/// Schema history of the sample models.
///
/// - v0 -> v1: coins moved from the raw `Coins` key into [`Wallet`].
/// - v1 -> v2: inventory counts were introduced; nothing to rewrite.
pub fn migrations() -> StateMigrations {
    StateMigrations::new(SCHEMA_VERSION).with_migration(0, |state: &mut ServerState| {
        let Some(raw) = state.get("Coins") else {
            return Ok(());
        };
        let coins = raw.trim().parse::<u64>().map_err(|e| StateError::Migration {
            from_version: 0,
            reason: format!("raw Coins value {raw:?}: {e}"),
        })?;
        let mut wallet = state.deserialize_model::<Wallet>()?;
        wallet.coins = wallet.coins.saturating_add(coins);
        state.update_model(&wallet)?;
        Ok(())
    })
}
