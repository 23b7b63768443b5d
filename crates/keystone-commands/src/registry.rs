//! Closed mapping from command type name to constructor.
//!
//! Every command the server understands is registered once at startup.
//! Nothing resolves by reflection: an unregistered name is a
//! [`CommandError::CommandNotFound`].

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;

use crate::command::{ExecutionMode, GameCommand};
use crate::envelope::CommandEnvelope;
use crate::error::CommandError;

/// Builds a command instance from an envelope's payload.
type Factory = Box<dyn Fn(&CommandEnvelope) -> Result<Box<dyn GameCommand>, CommandError> + Send + Sync>;

/// Builds a fresh initialization command.
type InitFactory = Box<dyn Fn() -> Box<dyn GameCommand> + Send + Sync>;

/// Registry of every command type the server can run.
#[derive(Default)]
pub struct CommandRegistry {
    factories: BTreeMap<String, Factory>,
    initialization: Vec<(String, InitFactory)>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `C` under `name`, decoded from the envelope's `CommandData`.
    ///
    /// Registering a name twice replaces the earlier entry.
    #[must_use]
    pub fn with_command<C>(mut self, name: &str) -> Self
    where
        C: GameCommand + DeserializeOwned + 'static,
    {
        self.register::<C>(name);
        self
    }

    /// Register `C` as an initialization command.
    ///
    /// Initialization commands run, in registration order, whenever a
    /// player's state is loaded. They are also resolvable by name so a
    /// client trying to invoke one gets a permission error rather than a
    /// lookup failure.
    #[must_use]
    pub fn with_initialization_command<C>(mut self, name: &str) -> Self
    where
        C: GameCommand + DeserializeOwned + Default + 'static,
    {
        if C::default().execution_mode() != ExecutionMode::Initialization {
            tracing::warn!(
                command = name,
                "Initialization command does not declare ExecutionMode::Initialization"
            );
        }
        self.register::<C>(name);
        let factory: InitFactory = Box::new(|| Box::new(C::default()) as Box<dyn GameCommand>);
        self.initialization.push((name.to_owned(), factory));
        self
    }

    fn register<C>(&mut self, name: &str)
    where
        C: GameCommand + DeserializeOwned + 'static,
    {
        let command_name = name.to_owned();
        let factory: Factory = Box::new(move |envelope: &CommandEnvelope| {
            serde_json::from_str::<C>(envelope.payload())
                .map(|command| Box::new(command) as Box<dyn GameCommand>)
                .map_err(|source| CommandError::InvalidPayload {
                    command: command_name.clone(),
                    source,
                })
        });
        if self.factories.insert(name.to_owned(), factory).is_some() {
            tracing::warn!(command = name, "Command registered twice; keeping the latest");
        }
    }

    /// Resolve `name` and decode its payload from `envelope`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::CommandNotFound`] for an unknown name, or
    /// [`CommandError::InvalidPayload`] if the payload does not decode.
    pub fn build(
        &self,
        name: &str,
        envelope: &CommandEnvelope,
    ) -> Result<Box<dyn GameCommand>, CommandError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| CommandError::CommandNotFound {
                command: name.to_owned(),
            })?;
        factory(envelope)
    }

    /// Fresh instances of every initialization command, in registration order.
    pub fn initialization_commands(&self) -> Vec<(&str, Box<dyn GameCommand>)> {
        self.initialization
            .iter()
            .map(|(name, factory)| (name.as_str(), factory()))
            .collect()
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Every registered name in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Number of registered command types.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.factories.keys().collect::<Vec<_>>())
            .field(
                "initialization",
                &self.initialization.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}
