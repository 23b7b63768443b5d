//! Command execution for Keystone game servers.
//!
//! This crate wires the state, command, and validation layers into the
//! entry point a game backend calls for every gameplay request:
//!
//! ```text
//! Execute(player, command, envelope)
//!   |
//!   +-- PlayerLockManager   one writer per player
//!   +-- PlayerStateStore    load / persist touched keys
//!   +-- StateMigrations     upgrade stored schema
//!   +-- CommandRegistry     name -> command instance
//!   +-- CommandValidator    completeness, version, ordering, permission
//!   +-- GameCommand         the mutation itself
//!   |
//!   +--> CommandResponse { delta, result, data }
//! ```
//!
//! # Modules
//!
//! - [`config`] -- [`ServerConfig`] loaded from YAML with env overrides.
//! - [`executor`] -- [`CommandExecutor`] and [`CommandResponse`].
//! - [`locks`] -- [`PlayerLockManager`], keyed per-player exclusion.
//! - [`error`] -- [`ServerError`].

pub mod config;
pub mod error;
pub mod executor;
pub mod locks;

pub use config::{ConfigError, ServerConfig};
pub use error::ServerError;
pub use executor::{CommandExecutor, CommandResponse};
pub use locks::{PlayerLockGuard, PlayerLockManager};
