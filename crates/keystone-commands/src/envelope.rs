//! The transport mapping carrying one command.
//!
//! | Key | Required | Contents |
//! |-----|----------|----------|
//! | `Timestamp` | yes | Monotonic integer chosen by the caller |
//! | `ClientVersion` | yes | Client build version |
//! | `CommandTypeName` | yes | Registry identifier |
//! | `CommandData` | no | JSON object with the command's fields (`{}` if absent) |
//! | `SecretKey` | no | Server secret proving a trusted origin |
//! | `ConfigurationVersion` | no | Game configuration version the client runs |

use std::collections::BTreeMap;

use keystone_types::{ClientVersion, fields};

use crate::error::CommandError;

/// Payload used when an envelope carries no [`CommandData`](fields::COMMAND_DATA).
const EMPTY_PAYLOAD: &str = "{}";

/// Key/value envelope for one command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandEnvelope {
    fields: BTreeMap<String, String>,
}

impl CommandEnvelope {
    /// Wrap raw envelope fields.
    pub const fn new(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    /// Set a field, replacing any earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Raw value of a field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Borrow every field.
    pub const fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// The command's serialized fields.
    pub fn payload(&self) -> &str {
        self.get(fields::COMMAND_DATA).unwrap_or(EMPTY_PAYLOAD)
    }

    /// The caller's timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::MissingField`] if absent or
    /// [`CommandError::MalformedField`] if not an integer.
    pub fn timestamp(&self) -> Result<i64, CommandError> {
        let raw = self.require(fields::TIMESTAMP)?;
        raw.trim().parse().map_err(|e: std::num::ParseIntError| {
            CommandError::MalformedField {
                field: fields::TIMESTAMP.to_owned(),
                value: raw.to_owned(),
                reason: e.to_string(),
            }
        })
    }

    /// The client's build version.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::MissingField`] if absent or
    /// [`CommandError::MalformedField`] if unparseable.
    pub fn client_version(&self) -> Result<ClientVersion, CommandError> {
        let raw = self.require(fields::CLIENT_VERSION)?;
        raw.parse().map_err(|e: keystone_types::VersionParseError| {
            CommandError::MalformedField {
                field: fields::CLIENT_VERSION.to_owned(),
                value: raw.to_owned(),
                reason: e.to_string(),
            }
        })
    }

    /// The game configuration version the client reports, if present and numeric.
    pub fn configuration_version(&self) -> Option<u64> {
        self.get(fields::CONFIGURATION_VERSION)
            .and_then(|raw| raw.trim().parse().ok())
    }

    /// Fail with [`CommandError::MissingField`] if `key` is absent.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::MissingField`] naming `key`.
    pub fn require(&self, key: &str) -> Result<&str, CommandError> {
        self.get(key).ok_or_else(|| CommandError::MissingField {
            field: key.to_owned(),
        })
    }
}

impl From<BTreeMap<String, String>> for CommandEnvelope {
    fn from(fields: BTreeMap<String, String>) -> Self {
        Self::new(fields)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CommandEnvelope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
