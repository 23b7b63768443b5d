//! One player's state document with per-command dirty tracking.
//!
//! The document is an ordered `key -> payload` map. Model payloads live
//! under their model's [`TYPE_ID`](keystone_types::Model::TYPE_ID); two
//! reserved raw keys hold bookkeeping:
//!
//! | Key | Contents |
//! |-----|----------|
//! | `version` | Schema version, integer string |
//! | `Timestamp` | Last accepted command timestamp, integer string |
//!
//! Every [`update_model`](ServerState::update_model) records the model's
//! post-write hash in the state's [`StateDelta`]. Raw writes through
//! [`set`](ServerState::set) are persisted too but never show up in the
//! delta, which only describes models.

use std::collections::{BTreeMap, BTreeSet};

use keystone_types::{
    CodecError, DataProvider, Model, ModelHash, StateDelta, content_hash, deserialize_model,
    fields, serialize_model,
};

use crate::error::StateError;

/// A player's document plus the set of keys touched since it was loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerState {
    data: BTreeMap<String, String>,
    delta: StateDelta,
    updated_keys: BTreeSet<String>,
}

impl ServerState {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a document loaded from storage. Nothing is marked dirty.
    pub const fn from_data(data: BTreeMap<String, String>) -> Self {
        Self {
            data,
            delta: StateDelta::new(),
            updated_keys: BTreeSet::new(),
        }
    }

    // =========================================================================
    // Raw key access
    // =========================================================================

    /// Raw value stored at `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Store a raw value and mark the key for persistence.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.updated_keys.insert(key.clone());
        self.data.insert(key, value.into());
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Whether the document holds no keys at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Borrow the whole document.
    pub const fn data(&self) -> &BTreeMap<String, String> {
        &self.data
    }

    /// Consume the state, returning the whole document.
    pub fn into_data(self) -> BTreeMap<String, String> {
        self.data
    }

    // =========================================================================
    // Typed model access
    // =========================================================================

    /// Serialize `model`, store it under `T::TYPE_ID`, and record its hash.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the model cannot be serialized. The
    /// document is left untouched in that case.
    pub fn update_model<T: Model>(&mut self, model: &T) -> Result<ModelHash, CodecError> {
        let payload = serialize_model(model)?;
        let hash = content_hash(&payload);
        self.data.insert(T::TYPE_ID.to_owned(), payload);
        self.delta.track(T::TYPE_ID, hash);
        Ok(hash)
    }

    /// Decode the stored model of type `T`.
    ///
    /// A model that was never written decodes to `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if a stored payload does not match `T`.
    pub fn deserialize_model<T: Model>(&self) -> Result<T, CodecError> {
        self.data
            .get(T::TYPE_ID)
            .map_or_else(|| Ok(T::default()), |payload| deserialize_model(payload))
    }

    // =========================================================================
    // Dirty tracking
    // =========================================================================

    /// Whether any model was updated since load.
    pub fn has_delta(&self) -> bool {
        !self.delta.is_empty()
    }

    /// Whether anything, model or raw key, needs persisting.
    pub fn has_updates(&self) -> bool {
        self.has_delta() || !self.updated_keys.is_empty()
    }

    /// Hashes of every model updated since load.
    pub const fn deltas(&self) -> &StateDelta {
        &self.delta
    }

    /// The subset of the document touched since load, ready for a
    /// merge-by-key write.
    pub fn only_updated_state(&self) -> BTreeMap<String, String> {
        self.delta
            .types()
            .chain(self.updated_keys.iter().map(String::as_str))
            .filter_map(|key| {
                self.data
                    .get(key)
                    .map(|value| (key.to_owned(), value.clone()))
            })
            .collect()
    }

    /// Fold the recorded delta into the persistence set.
    ///
    /// Models updated so far stay marked for the next write but no longer
    /// appear in [`deltas`](Self::deltas). Migrations call this so the
    /// following command reports only what it changed itself.
    pub fn settle_delta(&mut self) {
        self.updated_keys.extend(self.delta.types().map(str::to_owned));
        self.delta.clear();
    }

    /// Forget every recorded update, keeping the document as is.
    pub fn clear_updates(&mut self) {
        self.delta.clear();
        self.updated_keys.clear();
    }

    // =========================================================================
    // Reserved keys
    // =========================================================================

    /// Stored schema version, or `None` for an unversioned document.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidVersion`] if the key is not an integer.
    pub fn version(&self) -> Result<Option<u64>, StateError> {
        self.get(fields::VERSION)
            .map(|raw| {
                raw.parse::<u64>().map_err(|source| StateError::InvalidVersion {
                    value: raw.to_owned(),
                    source,
                })
            })
            .transpose()
    }

    /// Stamp the schema version.
    pub fn set_version(&mut self, version: u64) {
        self.set(fields::VERSION, version.to_string());
    }

    /// Timestamp of the last accepted command, or `None` if none was accepted.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidTimestamp`] if the key is not an integer.
    pub fn last_timestamp(&self) -> Result<Option<i64>, StateError> {
        self.get(fields::TIMESTAMP)
            .map(|raw| {
                raw.parse::<i64>().map_err(|source| StateError::InvalidTimestamp {
                    value: raw.to_owned(),
                    source,
                })
            })
            .transpose()
    }

    /// Record the timestamp of an accepted command.
    pub fn set_last_timestamp(&mut self, timestamp: i64) {
        self.set(fields::TIMESTAMP, timestamp.to_string());
    }
}

/// Every non-reserved key counts as a model type, including raw keys left
/// behind by old schemas. Such keys never appear in a server delta, so
/// [`find_desynced`](keystone_types::find_desynced) and
/// [`desynced_between`](keystone_types::desynced_between) ignore them.
impl DataProvider for ServerState {
    fn type_ids(&self) -> Vec<String> {
        self.data
            .keys()
            .filter(|k| k.as_str() != fields::VERSION && k.as_str() != fields::TIMESTAMP)
            .cloned()
            .collect()
    }

    fn serialized(&self, type_id: &str) -> Result<Option<String>, CodecError> {
        Ok(self.data.get(type_id).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use keystone_types::{find_desynced, hash_model};
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Wallet {
        coins: u64,
    }

    impl Model for Wallet {
        const TYPE_ID: &'static str = "Wallet";
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Loadout {
        weapon: String,
        skin: Option<String>,
    }

    impl Model for Loadout {
        const TYPE_ID: &'static str = "Loadout";
    }

    fn loaded_state() -> ServerState {
        let mut data = BTreeMap::new();
        data.insert("Wallet".to_owned(), r#"{"coins":10}"#.to_owned());
        data.insert(
            "Loadout".to_owned(),
            r#"{"weapon":"bow","skin":null}"#.to_owned(),
        );
        data.insert(fields::VERSION.to_owned(), "3".to_owned());
        ServerState::from_data(data)
    }

    #[test]
    fn absent_model_decodes_to_default() {
        let state = ServerState::new();
        assert_eq!(state.deserialize_model::<Wallet>().unwrap(), Wallet::default());
    }

    #[test]
    fn update_model_tracks_exactly_one_entry() {
        let mut state = ServerState::new();
        let wallet = Wallet { coins: 100 };
        state.update_model(&wallet).unwrap();

        let updated = state.only_updated_state();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated.get("Wallet").unwrap(), &serialize_model(&wallet).unwrap());

        assert_eq!(state.deltas().len(), 1);
        assert_eq!(state.deltas().get("Wallet"), Some(hash_model(&wallet).unwrap()));
    }

    #[test]
    fn loaded_document_is_clean() {
        let state = loaded_state();
        assert!(!state.has_delta());
        assert!(!state.has_updates());
        assert!(state.only_updated_state().is_empty());
        assert_eq!(state.deserialize_model::<Wallet>().unwrap().coins, 10);
    }

    #[test]
    fn only_updated_state_skips_untouched_models() {
        let mut state = loaded_state();
        state.update_model(&Wallet { coins: 11 }).unwrap();

        let updated = state.only_updated_state();
        assert_eq!(updated.keys().collect::<Vec<_>>(), vec!["Wallet"]);
    }

    #[test]
    fn raw_writes_persist_but_stay_out_of_delta() {
        let mut state = loaded_state();
        state.set_last_timestamp(77);

        assert!(state.has_updates());
        assert!(!state.has_delta());
        assert_eq!(
            state.only_updated_state().get(fields::TIMESTAMP).map(String::as_str),
            Some("77")
        );
        assert_eq!(state.last_timestamp().unwrap(), Some(77));
    }

    #[test]
    fn repeated_updates_keep_latest_hash() {
        let mut state = ServerState::new();
        state.update_model(&Wallet { coins: 1 }).unwrap();
        let latest = state.update_model(&Wallet { coins: 2 }).unwrap();
        assert_eq!(state.deltas().get("Wallet"), Some(latest));
        assert_eq!(state.deltas().len(), 1);
    }

    #[test]
    fn bad_reserved_keys_are_errors() {
        let mut state = ServerState::new();
        state.set(fields::VERSION, "three");
        assert!(matches!(state.version(), Err(StateError::InvalidVersion { .. })));
        state.set(fields::TIMESTAMP, "soon");
        assert!(matches!(
            state.last_timestamp(),
            Err(StateError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn provider_view_hides_reserved_keys() {
        let mut state = loaded_state();
        state.set_last_timestamp(5);
        assert_eq!(state.type_ids(), vec!["Loadout".to_owned(), "Wallet".to_owned()]);
    }

    #[test]
    fn own_delta_is_in_sync_with_itself() {
        let mut state = loaded_state();
        state
            .update_model(&Loadout {
                weapon: "axe".into(),
                skin: Some("gold".into()),
            })
            .unwrap();
        assert!(find_desynced(state.deltas(), &state).unwrap().is_empty());
    }

    #[test]
    fn settled_models_persist_without_a_delta() {
        let mut state = loaded_state();
        let wallet = Wallet { coins: 50 };
        state.update_model(&wallet).unwrap();
        state.settle_delta();

        assert!(!state.has_delta());
        assert!(state.has_updates());
        assert_eq!(
            state.only_updated_state().get("Wallet"),
            Some(&serialize_model(&wallet).unwrap())
        );

        state.update_model(&Loadout::default()).unwrap();
        assert_eq!(state.deltas().types().collect::<Vec<_>>(), vec!["Loadout"]);
        assert_eq!(
            state.only_updated_state().keys().collect::<Vec<_>>(),
            vec!["Loadout", "Wallet"]
        );
    }

    #[test]
    fn leftover_raw_keys_never_report_desync() {
        let mut state = loaded_state();
        state.set("LegacyCoins", "40");
        assert!(state.type_ids().contains(&"LegacyCoins".to_owned()));

        let snapshot = keystone_types::client_delta(&state).unwrap();
        let mut server = StateDelta::new();
        server.track("Wallet", content_hash(r#"{"coins":10}"#));
        assert!(keystone_types::desynced_between(&snapshot, &server).is_empty());
        assert!(find_desynced(&server, &state).unwrap().is_empty());
    }

    #[test]
    fn clear_updates_resets_tracking() {
        let mut state = loaded_state();
        state.update_model(&Wallet { coins: 0 }).unwrap();
        state.set_version(4);
        state.clear_updates();
        assert!(!state.has_updates());
        assert_eq!(state.version().unwrap(), Some(4));
    }
}
