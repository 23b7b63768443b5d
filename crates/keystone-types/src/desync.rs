//! Client/server reconciliation.
//!
//! After the server executes a command it returns the [`StateDelta`] of the
//! models it touched. A caller that predicted the command locally rehashes
//! its own copy of each of those models; any mismatch means the local
//! prediction diverged from server truth. Nothing here performs I/O.

use crate::delta::StateDelta;
use crate::error::CodecError;
use crate::hash::content_hash;
use crate::provider::DataProvider;

/// Return every type in `server_delta` whose local payload hashes differently.
///
/// A type the provider does not hold at all counts as desynced. An empty
/// result means the provider agrees with the server on every touched model.
///
/// # Errors
///
/// Returns [`CodecError`] if a local model cannot be serialized.
pub fn find_desynced<P>(server_delta: &StateDelta, local: &P) -> Result<Vec<String>, CodecError>
where
    P: DataProvider + ?Sized,
{
    let mut desynced = Vec::new();
    for (type_id, server_hash) in server_delta.iter() {
        let local_hash = local.serialized(type_id)?.map(|payload| content_hash(&payload));
        if local_hash != Some(server_hash) {
            desynced.push(type_id.to_owned());
        }
    }
    Ok(desynced)
}

/// Hash every model a provider holds.
///
/// Clients take this snapshot when they enqueue a command so the server's
/// answer can be checked later with [`desynced_between`], even if the local
/// models moved on in the meantime.
///
/// # Errors
///
/// Returns [`CodecError`] if a model cannot be serialized.
pub fn client_delta<P>(local: &P) -> Result<StateDelta, CodecError>
where
    P: DataProvider + ?Sized,
{
    let mut delta = StateDelta::new();
    for type_id in local.type_ids() {
        if let Some(payload) = local.serialized(&type_id)? {
            delta.track(type_id, content_hash(&payload));
        }
    }
    Ok(delta)
}

/// Compare a snapshot from [`client_delta`] with a server delta.
///
/// Only types present in both with differing hashes are reported.
pub fn desynced_between(client: &StateDelta, server: &StateDelta) -> Vec<String> {
    server
        .iter()
        .filter(|(type_id, hash)| client.get(type_id).is_some_and(|local| local != *hash))
        .map(|(type_id, _)| type_id.to_owned())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::hash::hash_model;
    use crate::model::Model;
    use crate::provider::LocalDataProvider;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Wallet {
        coins: u64,
    }

    impl Model for Wallet {
        const TYPE_ID: &'static str = "Wallet";
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Inventory {
        items: Vec<String>,
    }

    impl Model for Inventory {
        const TYPE_ID: &'static str = "Inventory";
    }

    fn server_delta_after_purchase() -> StateDelta {
        let mut delta = StateDelta::new();
        delta.track_model(&Wallet { coins: 40 }).unwrap();
        delta
            .track_model(&Inventory {
                items: vec!["sword".into()],
            })
            .unwrap();
        delta
    }

    #[test]
    fn stale_local_state_is_reported() {
        let mut local = LocalDataProvider::new();
        local.insert(Wallet { coins: 100 });
        local.insert(Inventory::default());

        let desynced = find_desynced(&server_delta_after_purchase(), &local).unwrap();
        assert_eq!(desynced, vec!["Inventory".to_owned(), "Wallet".to_owned()]);
    }

    #[test]
    fn matching_local_state_is_clean() {
        let mut local = LocalDataProvider::new();
        local.insert(Wallet { coins: 40 });
        local.insert(Inventory {
            items: vec!["sword".into()],
        });

        assert!(find_desynced(&server_delta_after_purchase(), &local).unwrap().is_empty());
    }

    #[test]
    fn absent_local_type_is_desynced() {
        let mut local = LocalDataProvider::new();
        local.insert(Wallet { coins: 40 });

        let desynced = find_desynced(&server_delta_after_purchase(), &local).unwrap();
        assert_eq!(desynced, vec!["Inventory".to_owned()]);
    }

    #[test]
    fn empty_server_delta_is_never_desynced() {
        let local = LocalDataProvider::new();
        assert!(find_desynced(&StateDelta::new(), &local).unwrap().is_empty());
    }

    #[test]
    fn snapshot_comparison_ignores_types_missing_on_client() {
        let mut local = LocalDataProvider::new();
        local.insert(Wallet { coins: 100 });
        let snapshot = client_delta(&local).unwrap();
        assert_eq!(snapshot.get("Wallet"), Some(hash_model(&Wallet { coins: 100 }).unwrap()));

        let desynced = desynced_between(&snapshot, &server_delta_after_purchase());
        assert_eq!(desynced, vec!["Wallet".to_owned()]);
    }
}
