//! Player state documents and their persistence for Keystone.
//!
//! A player's state is one flat document of `type id -> payload` strings.
//! [`ServerState`] wraps a freshly loaded document for the duration of one
//! command, recording which models the command touched so that only those
//! keys are written back.
//!
//! # Architecture
//!
//! ```text
//! PlayerStateStore::get_player_state
//!     |
//!     +-- StateMigrations::run_migrations   (schema upgrade, in memory)
//!     |
//!     +-- command execution                 (ServerState::update_model)
//!     |
//!     +-- PlayerStateStore::update_player_state(only_updated_state)
//! ```
//!
//! # Modules
//!
//! - [`server_state`] -- [`ServerState`] with dirty tracking.
//! - [`migrations`] -- [`StateMigrations`], the schema-version upgrade table.
//! - [`store`] -- [`PlayerStateStore`] and the in-memory backend.
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) backend.
//! - [`error`] -- [`StateError`] and [`StoreError`].

pub mod dragonfly;
pub mod error;
pub mod migrations;
pub mod server_state;
pub mod store;

pub use dragonfly::DragonflyStateStore;
pub use error::{StateError, StoreError};
pub use migrations::{Migration, StateMigrations};
pub use server_state::ServerState;
pub use store::{InMemoryStateStore, PlayerStateStore};
