//! The per-player document persistence boundary.
//!
//! Stores accept full or partial documents and merge by key: keys absent
//! from an update keep their stored value. Single-writer-per-player is the
//! caller's job; stores only guarantee that one update call is applied as
//! a unit.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use keystone_types::PlayerId;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::server_state::ServerState;

/// Persistence for player state documents.
pub trait PlayerStateStore: Send + Sync {
    /// Load a player's whole document. A player with no document yields an
    /// empty state.
    fn get_player_state(
        &self,
        player_id: &PlayerId,
    ) -> impl Future<Output = Result<ServerState, StoreError>> + Send;

    /// Merge `partial` into the stored document by key.
    fn update_player_state(
        &self,
        player_id: &PlayerId,
        partial: BTreeMap<String, String>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove a player's document entirely.
    fn delete_player_state(
        &self,
        player_id: &PlayerId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Process-local store, used by tests and the sandbox.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    documents: RwLock<HashMap<PlayerId, BTreeMap<String, String>>>,
}

impl InMemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw copy of a player's stored document, if any.
    pub async fn document(&self, player_id: &PlayerId) -> Option<BTreeMap<String, String>> {
        self.documents.read().await.get(player_id).cloned()
    }

    /// Number of players with a stored document.
    pub async fn player_count(&self) -> usize {
        self.documents.read().await.len()
    }
}

impl PlayerStateStore for InMemoryStateStore {
    async fn get_player_state(&self, player_id: &PlayerId) -> Result<ServerState, StoreError> {
        let documents = self.documents.read().await;
        Ok(ServerState::from_data(
            documents.get(player_id).cloned().unwrap_or_default(),
        ))
    }

    async fn update_player_state(
        &self,
        player_id: &PlayerId,
        partial: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        documents
            .entry(player_id.clone())
            .or_default()
            .extend(partial);
        Ok(())
    }

    async fn delete_player_state(&self, player_id: &PlayerId) -> Result<(), StoreError> {
        self.documents.write().await.remove(player_id);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn doc(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[tokio::test]
    async fn unknown_player_loads_empty() {
        let store = InMemoryStateStore::new();
        let state = store.get_player_state(&PlayerId::new("nobody")).await.unwrap();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn partial_update_merges_by_key() {
        let store = InMemoryStateStore::new();
        let player = PlayerId::new("p1");
        store
            .update_player_state(&player, doc(&[("Wallet", "a"), ("Inventory", "b")]))
            .await
            .unwrap();
        store
            .update_player_state(&player, doc(&[("Wallet", "c")]))
            .await
            .unwrap();

        let stored = store.document(&player).await.unwrap();
        assert_eq!(stored, doc(&[("Inventory", "b"), ("Wallet", "c")]));
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let store = InMemoryStateStore::new();
        let player = PlayerId::new("p1");
        store
            .update_player_state(&player, doc(&[("Wallet", "a")]))
            .await
            .unwrap();
        store.delete_player_state(&player).await.unwrap();
        assert_eq!(store.player_count().await, 0);
    }
}
