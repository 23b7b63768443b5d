//! Well-known keys shared between the client, the envelope, and the
//! persisted player document.

/// Envelope key holding the caller-supplied monotonic command timestamp.
///
/// The same key stores the last accepted timestamp in the player document.
pub const TIMESTAMP: &str = "Timestamp";

/// Envelope key holding the client's build version.
pub const CLIENT_VERSION: &str = "ClientVersion";

/// Envelope key naming the command type to resolve in the registry.
pub const COMMAND_TYPE_NAME: &str = "CommandTypeName";

/// Envelope key holding the command's serialized fields as a JSON object.
pub const COMMAND_DATA: &str = "CommandData";

/// Envelope key carrying the server secret that proves a trusted origin.
pub const SECRET_KEY: &str = "SecretKey";

/// Envelope and response key holding the game configuration version.
pub const CONFIGURATION_VERSION: &str = "ConfigurationVersion";

/// Document key holding the player state's schema version.
pub const VERSION: &str = "version";

/// Response key holding the serialized [`StateDelta`](crate::StateDelta).
pub const STATE_DELTA: &str = "StateDelta";

/// Error payload key holding the human-readable failure message.
pub const LOGIC_EXCEPTION: &str = "LogicException";

/// Error payload key holding the failure kind tag.
pub const ERROR_KIND: &str = "ErrorKind";
