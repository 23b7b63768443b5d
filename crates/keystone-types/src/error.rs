//! Error types for the model codec and version parsing.

use std::num::ParseIntError;

/// Errors raised while converting a model to or from its string payload.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The model could not be serialized.
    #[error("failed to serialize model {type_id}: {source}")]
    Serialize {
        /// Identifier of the model type.
        type_id: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// The stored payload could not be decoded into the model type.
    #[error("failed to deserialize model {type_id}: {source}")]
    Deserialize {
        /// Identifier of the model type.
        type_id: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// Errors raised while parsing a [`ClientVersion`](crate::ClientVersion).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    /// The version string was empty.
    #[error("version string is empty")]
    Empty,

    /// The version had more components than `major.minor.build.revision`.
    #[error("version {0} has too many components")]
    TooManyComponents(String),

    /// A component was not a non-negative integer.
    #[error("version {version} has an invalid component {component:?}: {source}")]
    InvalidComponent {
        /// The full version string.
        version: String,
        /// The offending component.
        component: String,
        /// The underlying parse error.
        source: ParseIntError,
    },
}
