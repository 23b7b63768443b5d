//! `Dragonfly` (Redis-compatible) player document store.
//!
//! Each player's document is one Redis hash, so a partial update is a
//! single `HSET` and merge-by-key comes for free.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `player:{id}:state` | Hash | `type id -> payload` plus `version` and `Timestamp` |

use std::collections::{BTreeMap, HashMap};

use fred::prelude::*;
use keystone_types::PlayerId;

use crate::error::StoreError;
use crate::server_state::ServerState;
use crate::store::PlayerStateStore;

/// Connection handle to a `Dragonfly` instance holding player documents.
#[derive(Clone)]
pub struct DragonflyStateStore {
    client: Client,
}

impl DragonflyStateStore {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    fn state_key(player_id: &PlayerId) -> String {
        format!("player:{player_id}:state")
    }
}

impl PlayerStateStore for DragonflyStateStore {
    async fn get_player_state(&self, player_id: &PlayerId) -> Result<ServerState, StoreError> {
        let document: HashMap<String, String> =
            self.client.hgetall(Self::state_key(player_id)).await?;
        Ok(ServerState::from_data(document.into_iter().collect()))
    }

    async fn update_player_state(
        &self,
        player_id: &PlayerId,
        partial: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        if partial.is_empty() {
            return Ok(());
        }
        let keys = partial.len();
        let values: HashMap<String, String> = partial.into_iter().collect();
        let _: i64 = self.client.hset(Self::state_key(player_id), values).await?;
        tracing::debug!(player_id = %player_id, keys, "Merged player state");
        Ok(())
    }

    async fn delete_player_state(&self, player_id: &PlayerId) -> Result<(), StoreError> {
        let _: u32 = self.client.del(Self::state_key(player_id)).await?;
        Ok(())
    }
}
