//! The model contract and its JSON codec.
//!
//! A model is one top-level document in a player's state (wallet, inventory,
//! loadout, ...). Each model type is stored under a stable string
//! identifier, and its payload is the model's `serde_json` serialization.
//! Fields serialize in declaration order, so two readers compiled from the
//! same model definitions produce byte-identical payloads.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;

/// A top-level player-state model.
///
/// `Default` is required because reading a model that was never written
/// yields the default instance rather than an error.
pub trait Model: Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static {
    /// The identifier this model is stored under.
    const TYPE_ID: &'static str;
}

/// Serialize a model into its stored payload.
///
/// # Errors
///
/// Returns [`CodecError::Serialize`] if `serde_json` rejects the value.
pub fn serialize_model<T: Model>(model: &T) -> Result<String, CodecError> {
    serde_json::to_string(model).map_err(|source| CodecError::Serialize {
        type_id: T::TYPE_ID.to_owned(),
        source,
    })
}

/// Decode a stored payload back into its model type.
///
/// # Errors
///
/// Returns [`CodecError::Deserialize`] if the payload does not match `T`.
pub fn deserialize_model<T: Model>(payload: &str) -> Result<T, CodecError> {
    serde_json::from_str(payload).map_err(|source| CodecError::Deserialize {
        type_id: T::TYPE_ID.to_owned(),
        source,
    })
}
