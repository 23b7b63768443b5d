//! Sparse per-type hash sets produced by command execution.
//!
//! A [`StateDelta`] names only the model types a command touched, each
//! paired with the hash of its post-command payload. It never carries model
//! data, so it is cheap to ship back to the client on every response.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::fields;
use crate::hash::{ModelHash, hash_model};
use crate::model::Model;

/// Mapping from model type identifier to post-mutation content hash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDelta {
    modified: BTreeMap<String, ModelHash>,
}

impl StateDelta {
    /// Create an empty delta.
    pub const fn new() -> Self {
        Self {
            modified: BTreeMap::new(),
        }
    }

    /// Record that `type_id` now hashes to `hash`, replacing any earlier entry.
    pub fn track(&mut self, type_id: impl Into<String>, hash: ModelHash) {
        self.modified.insert(type_id.into(), hash);
    }

    /// Hash `model` and record it under its type identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the model cannot be serialized.
    pub fn track_model<T: Model>(&mut self, model: &T) -> Result<ModelHash, CodecError> {
        let hash = hash_model(model)?;
        self.track(T::TYPE_ID, hash);
        Ok(hash)
    }

    /// Hash recorded for `type_id`, if it was modified.
    pub fn get(&self, type_id: &str) -> Option<ModelHash> {
        self.modified.get(type_id).copied()
    }

    /// Whether `type_id` was modified.
    pub fn contains(&self, type_id: &str) -> bool {
        self.modified.contains_key(type_id)
    }

    /// Whether no type was modified.
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty()
    }

    /// Number of modified types.
    pub fn len(&self) -> usize {
        self.modified.len()
    }

    /// Modified type identifiers in sorted order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.modified.keys().map(String::as_str)
    }

    /// `(type, hash)` pairs in sorted type order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ModelHash)> {
        self.modified.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Fold `other` into this delta. Entries in `other` win.
    pub fn merge(&mut self, other: &Self) {
        for (type_id, hash) in &other.modified {
            self.modified.insert(type_id.clone(), *hash);
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.modified.clear();
    }

    /// Store this delta as JSON under [`fields::STATE_DELTA`] in a response map.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Serialize`] if the delta cannot be encoded.
    pub fn write_to(&self, data: &mut BTreeMap<String, String>) -> Result<(), CodecError> {
        let json = serde_json::to_string(self).map_err(|source| CodecError::Serialize {
            type_id: fields::STATE_DELTA.to_owned(),
            source,
        })?;
        data.insert(fields::STATE_DELTA.to_owned(), json);
        Ok(())
    }

    /// Read a delta written by [`write_to`](Self::write_to).
    ///
    /// A response without the key yields an empty delta.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Deserialize`] if the stored JSON is malformed.
    pub fn read_from(data: &BTreeMap<String, String>) -> Result<Self, CodecError> {
        data.get(fields::STATE_DELTA).map_or_else(
            || Ok(Self::new()),
            |json| {
                serde_json::from_str(json).map_err(|source| CodecError::Deserialize {
                    type_id: fields::STATE_DELTA.to_owned(),
                    source,
                })
            },
        )
    }
}

impl FromIterator<(String, ModelHash)> for StateDelta {
    fn from_iter<I: IntoIterator<Item = (String, ModelHash)>>(iter: I) -> Self {
        Self {
            modified: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_later_hash() {
        let mut first = StateDelta::new();
        first.track("Wallet", ModelHash(1));
        first.track("Inventory", ModelHash(2));

        let mut second = StateDelta::new();
        second.track("Wallet", ModelHash(3));

        first.merge(&second);
        assert_eq!(first.get("Wallet"), Some(ModelHash(3)));
        assert_eq!(first.get("Inventory"), Some(ModelHash(2)));
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn response_data_carries_delta() {
        let mut delta = StateDelta::new();
        delta.track("Wallet", ModelHash(42));

        let mut data = BTreeMap::new();
        delta.write_to(&mut data).unwrap();
        assert_eq!(data.get(fields::STATE_DELTA).unwrap(), r#"{"Wallet":42}"#);
        assert_eq!(StateDelta::read_from(&data).unwrap(), delta);
    }

    #[test]
    fn missing_response_key_is_empty_delta() {
        let delta = StateDelta::read_from(&BTreeMap::new()).unwrap();
        assert!(delta.is_empty());
    }
}
