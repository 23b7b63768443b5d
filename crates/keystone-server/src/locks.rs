//! Keyed per-player mutual exclusion.
//!
//! Each player id maps to its own lazily-created lock. Locks are never
//! removed, so two callers for the same player always meet on the same
//! mutex. The only way to hold a lock is a [`PlayerLockGuard`], which
//! releases on drop, so every exit path (including `?` and cancellation)
//! lets the next command in.

use std::collections::HashMap;
use std::sync::Arc;

use keystone_types::PlayerId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Hands out exclusive execution slots per player.
#[derive(Debug, Default)]
pub struct PlayerLockManager {
    locks: Mutex<HashMap<PlayerId, Arc<Mutex<()>>>>,
}

impl PlayerLockManager {
    /// Create a manager with no locks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for `player_id`'s slot and hold it until the guard drops.
    ///
    /// Waiters are served in arrival order. Different players never
    /// contend beyond the brief lookup of their lock.
    pub async fn acquire(&self, player_id: &PlayerId) -> PlayerLockGuard {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(player_id.clone()).or_default())
        };
        let guard = lock.lock_owned().await;
        tracing::trace!(player_id = %player_id, "Player lock acquired");
        PlayerLockGuard {
            player_id: player_id.clone(),
            _guard: guard,
        }
    }

    /// Number of players that have ever been locked.
    pub async fn tracked_players(&self) -> usize {
        self.locks.lock().await.len()
    }
}

/// Exclusive execution slot for one player.
#[derive(Debug)]
pub struct PlayerLockGuard {
    player_id: PlayerId,
    _guard: OwnedMutexGuard<()>,
}

impl PlayerLockGuard {
    /// The player this slot belongs to.
    pub const fn player_id(&self) -> &PlayerId {
        &self.player_id
    }
}

impl Drop for PlayerLockGuard {
    fn drop(&mut self) {
        tracing::trace!(player_id = %self.player_id, "Player lock released");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_player_is_serialized() {
        let manager = PlayerLockManager::new();
        let player = PlayerId::new("p1");

        let first = manager.acquire(&player).await;
        assert_eq!(first.player_id(), &player);

        let blocked = tokio::time::timeout(Duration::from_millis(50), manager.acquire(&player)).await;
        assert!(blocked.is_err(), "second acquire must wait while the first guard lives");

        drop(first);
        let second = tokio::time::timeout(Duration::from_millis(500), manager.acquire(&player)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn different_players_do_not_contend() {
        let manager = PlayerLockManager::new();
        let _a = manager.acquire(&PlayerId::new("a")).await;
        let b = tokio::time::timeout(Duration::from_millis(500), manager.acquire(&PlayerId::new("b"))).await;
        assert!(b.is_ok());
        assert_eq!(manager.tracked_players().await, 2);
    }

    #[tokio::test]
    async fn locks_are_reused_not_removed() {
        let manager = PlayerLockManager::new();
        let player = PlayerId::new("p1");
        for _ in 0..3 {
            let _guard = manager.acquire(&player).await;
        }
        assert_eq!(manager.tracked_players().await, 1);
    }

    #[tokio::test]
    async fn released_on_error_path() {
        async fn failing(manager: &PlayerLockManager, player: &PlayerId) -> Result<(), &'static str> {
            let _guard = manager.acquire(player).await;
            Err("boom")
        }

        let manager = PlayerLockManager::new();
        let player = PlayerId::new("p1");
        assert!(failing(&manager, &player).await.is_err());
        let next = tokio::time::timeout(Duration::from_millis(500), manager.acquire(&player)).await;
        assert!(next.is_ok());
    }
}
