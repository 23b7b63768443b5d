//! Shared types for the Keystone command-execution core.
//!
//! This crate has no I/O. It defines the contract every other crate builds
//! on: how a typed model becomes a string payload, how that payload is
//! hashed, and how a set of per-type hashes (a [`StateDelta`]) is compared
//! against a caller's local belief of state.
//!
//! # Modules
//!
//! - [`model`] -- The [`Model`] trait and the JSON model codec.
//! - [`hash`] -- [`ModelHash`] and the content hash function.
//! - [`delta`] -- [`StateDelta`], the sparse type -> hash mapping.
//! - [`provider`] -- [`DataProvider`] and the typed [`LocalDataProvider`].
//! - [`desync`] -- Client/server reconciliation from deltas.
//! - [`fields`] -- Well-known envelope and document keys.
//! - [`ids`] -- [`PlayerId`].
//! - [`version`] -- [`ClientVersion`] parsing and ordering.
//! - [`error`] -- [`CodecError`] and [`VersionParseError`].

pub mod delta;
pub mod desync;
pub mod error;
pub mod fields;
pub mod hash;
pub mod ids;
pub mod model;
pub mod provider;
pub mod version;

pub use delta::StateDelta;
pub use desync::{client_delta, desynced_between, find_desynced};
pub use error::{CodecError, VersionParseError};
pub use hash::{ModelHash, content_hash, hash_model};
pub use ids::PlayerId;
pub use model::{Model, deserialize_model, serialize_model};
pub use provider::{DataProvider, LocalDataProvider};
pub use version::ClientVersion;
