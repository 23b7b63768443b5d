//! Request scripts replayed by the sandbox.
//!
//! ```json
//! {
//!   "player_id": "demo-player",
//!   "client_version": "1.0.0",
//!   "initial_state": { "version": "0", "Coins": "40" },
//!   "requests": [
//!     { "command": "AddCoins", "data": { "amount": 25 } },
//!     { "command": "GrantGems", "data": { "amount": 5 }, "trusted": true },
//!     { "command": "AddCoins", "data": { "amount": 1 }, "timestamp_offset": -1 }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use keystone_types::fields;
use serde::Deserialize;

/// Script bundled with the binary, used when no path is given.
const DEFAULT_SCRIPT: &str = include_str!("../scenario.json");

/// A scripted session for one player.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// The player every request runs for.
    pub player_id: String,
    /// Client build reported in every envelope.
    #[serde(default = "default_client_version")]
    pub client_version: String,
    /// Game configuration version the client reports.
    #[serde(default)]
    pub configuration_version: Option<u64>,
    /// Document written if the player has none.
    #[serde(default)]
    pub initial_state: BTreeMap<String, String>,
    /// Requests in submission order.
    pub requests: Vec<ScriptRequest>,
}

/// One scripted request.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptRequest {
    /// Registered command name.
    pub command: String,
    /// Command fields, sent as the `CommandData` JSON object.
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    /// Attach the server secret to the envelope.
    #[serde(default)]
    pub trusted: bool,
    /// Shift this request's timestamp relative to the session clock; a
    /// non-positive offset replays an old timestamp.
    #[serde(default = "default_offset")]
    pub timestamp_offset: i64,
    /// Skip the client-side prediction, so the client falls behind.
    #[serde(default)]
    pub skip_prediction: bool,
    /// Raw local keys to overwrite before predicting.
    #[serde(default)]
    pub tamper: BTreeMap<String, String>,
}

impl Script {
    /// Load a script from a JSON file, or the bundled default if `path` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read script {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("failed to parse script {}", path.display()))
            }
            None => serde_json::from_str(DEFAULT_SCRIPT).context("bundled script is invalid"),
        }
    }
}

impl ScriptRequest {
    /// Build the command envelope for this request.
    pub fn envelope(
        &self,
        script: &Script,
        timestamp: i64,
        secret: Option<&str>,
    ) -> BTreeMap<String, String> {
        let mut envelope = BTreeMap::from([
            (fields::TIMESTAMP.to_owned(), timestamp.to_string()),
            (fields::CLIENT_VERSION.to_owned(), script.client_version.clone()),
            (fields::COMMAND_TYPE_NAME.to_owned(), self.command.clone()),
            (
                fields::COMMAND_DATA.to_owned(),
                serde_json::Value::Object(self.data.clone()).to_string(),
            ),
        ]);
        if let Some(version) = script.configuration_version {
            envelope.insert(fields::CONFIGURATION_VERSION.to_owned(), version.to_string());
        }
        if self.trusted
            && let Some(secret) = secret
        {
            envelope.insert(fields::SECRET_KEY.to_owned(), secret.to_owned());
        }
        envelope
    }
}

fn default_client_version() -> String {
    "1.0.0".to_owned()
}

const fn default_offset() -> i64 {
    1
}
