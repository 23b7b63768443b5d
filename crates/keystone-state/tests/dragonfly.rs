//! Integration tests for the `Dragonfly` player document store.
//!
//! These tests require a live `Dragonfly` (or Redis) instance. Run with:
//!
//! ```bash
//! docker run -d -p 6379:6379 docker.dragonflydb.io/dragonflydb/dragonfly
//! cargo test -p keystone-state -- --ignored
//! ```

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::BTreeMap;

use keystone_state::{DragonflyStateStore, PlayerStateStore};
use keystone_types::PlayerId;

/// Dragonfly connection URL for the local Docker instance.
const DRAGONFLY_URL: &str = "redis://localhost:6379";

#[tokio::test]
#[ignore = "requires a running Dragonfly instance"]
async fn partial_updates_merge_into_hash() {
    let store = DragonflyStateStore::connect(DRAGONFLY_URL)
        .await
        .expect("Failed to connect to Dragonfly -- is Docker running?");
    let player = PlayerId::new("it-merge-player");
    store.delete_player_state(&player).await.unwrap();

    let mut first = BTreeMap::new();
    first.insert("Wallet".to_owned(), r#"{"coins":1}"#.to_owned());
    first.insert("Inventory".to_owned(), r#"{"items":[]}"#.to_owned());
    store.update_player_state(&player, first).await.unwrap();

    let mut second = BTreeMap::new();
    second.insert("Wallet".to_owned(), r#"{"coins":2}"#.to_owned());
    store.update_player_state(&player, second).await.unwrap();

    let state = store.get_player_state(&player).await.unwrap();
    assert_eq!(state.get("Wallet"), Some(r#"{"coins":2}"#));
    assert_eq!(state.get("Inventory"), Some(r#"{"items":[]}"#));

    store.delete_player_state(&player).await.unwrap();
    assert!(store.get_player_state(&player).await.unwrap().is_empty());
}
