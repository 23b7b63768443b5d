//! Configuration loading and typed config structures for a Keystone server.
//!
//! The configuration lives in `keystone-config.yaml`. Every section is
//! optional and falls back to development-friendly defaults.
//!
//! ```yaml
//! server:
//!   environment: production
//!   min_client_version: "1.4.0"
//!   development_mode: false
//! game:
//!   configuration_version: 12
//! security:
//!   secret_key: "..."
//! infrastructure:
//!   dragonfly_url: "redis://localhost:6379"
//! logging:
//!   level: info
//! ```

use std::path::Path;

use keystone_commands::{CommandValidator, DeploymentEnvironment};
use keystone_types::ClientVersion;
use serde::Deserialize;

/// Overrides `security.secret_key`.
pub const SECRET_KEY_ENV: &str = "KEYSTONE_SECRET_KEY";
/// Overrides `server.environment`.
pub const ENVIRONMENT_ENV: &str = "KEYSTONE_ENVIRONMENT";
/// Overrides `infrastructure.dragonfly_url`.
pub const DRAGONFLY_URL_ENV: &str = "DRAGONFLY_URL";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override holds an unusable value.
    #[error("invalid value {value:?} for {variable}: {reason}")]
    InvalidOverride {
        /// The environment variable name.
        variable: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration, mirroring `keystone-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Deployment and client compatibility settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Game content settings.
    #[serde(default)]
    pub game: GameConfig,

    /// Trusted-caller settings.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Infrastructure connection strings.
    #[serde(default)]
    pub infrastructure: InfrastructureConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::InvalidOverride`] if an environment override is unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::InvalidOverride`] if an environment override is unusable.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override values from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if `KEYSTONE_ENVIRONMENT`
    /// names no known environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|variable| std::env::var(variable).ok())
    }

    /// Override values from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if the environment override
    /// names no known environment.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(SECRET_KEY_ENV) {
            self.security.secret_key = Some(secret);
        }
        if let Some(raw) = lookup(ENVIRONMENT_ENV) {
            self.server.environment =
                raw.parse()
                    .map_err(|reason| ConfigError::InvalidOverride {
                        variable: ENVIRONMENT_ENV,
                        value: raw.clone(),
                        reason,
                    })?;
        }
        if let Some(url) = lookup(DRAGONFLY_URL_ENV) {
            self.infrastructure.dragonfly_url = Some(url);
        }
        Ok(())
    }

    /// The validation policy this configuration describes.
    pub fn validator(&self) -> CommandValidator {
        CommandValidator::new(
            self.server.min_client_version.clone(),
            self.server.environment,
        )
        .with_development_mode(self.server.development_mode)
    }

    /// The configured server secret, ignoring an empty value.
    pub fn secret_key(&self) -> Option<&str> {
        self.security
            .secret_key
            .as_deref()
            .filter(|secret| !secret.is_empty())
    }
}

/// Deployment and client compatibility settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Deployment stage, checked against command environment locks.
    #[serde(default)]
    pub environment: DeploymentEnvironment,

    /// Oldest client build the server accepts.
    #[serde(default)]
    pub min_client_version: ClientVersion,

    /// Lets admin commands run without a trusted origin.
    #[serde(default)]
    pub development_mode: bool,

    /// Build number of the running server.
    #[serde(default)]
    pub build_number: String,

    /// Source commit of the running server.
    #[serde(default)]
    pub build_commit: String,
}

/// Game content settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// Version of the game configuration the server runs. Clients reporting
    /// an older version are told to refresh.
    #[serde(default)]
    pub configuration_version: u64,
}

/// Trusted-caller settings.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SecurityConfig {
    /// Shared secret that marks an envelope as server-trusted.
    #[serde(default)]
    pub secret_key: Option<String>,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Infrastructure connection strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InfrastructureConfig {
    /// Dragonfly (Redis-compatible) URL. Without one, player documents are
    /// kept in memory.
    #[serde(default)]
    pub dragonfly_url: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}
