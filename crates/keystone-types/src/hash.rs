//! Content hashing for serialized models.
//!
//! A [`ModelHash`] is the first eight bytes (big-endian) of the SHA-256
//! digest of a model's payload. The server stores it in every delta and the
//! client recomputes it locally, so the function must never change without
//! a protocol bump.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CodecError;
use crate::model::{Model, serialize_model};

/// Fixed-width content hash of a serialized model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelHash(pub u64);

impl fmt::Display for ModelHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Hash a serialized payload.
pub fn content_hash(payload: &str) -> ModelHash {
    let digest = Sha256::digest(payload.as_bytes());
    ModelHash(
        digest
            .first_chunk::<8>()
            .map_or(0, |bytes| u64::from_be_bytes(*bytes)),
    )
}

/// Serialize a model and hash the result.
///
/// # Errors
///
/// Returns [`CodecError`] if the model cannot be serialized.
pub fn hash_model<T: Model>(model: &T) -> Result<ModelHash, CodecError> {
    Ok(content_hash(&serialize_model(model)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable() {
        // SHA-256("") = e3b0c442 98fc1c14 ...
        assert_eq!(content_hash(""), ModelHash(0xe3b0_c442_98fc_1c14));
    }

    #[test]
    fn different_payloads_differ() {
        assert_ne!(content_hash(r#"{"coins":1}"#), content_hash(r#"{"coins":2}"#));
    }

    #[test]
    fn display_is_zero_padded_hex() {
        assert_eq!(ModelHash(0xab).to_string(), "00000000000000ab");
    }
}
