//! Command capabilities, envelope validation, and resolution for Keystone.
//!
//! A command is one authoritative state mutation. This crate defines what a
//! command can declare about itself ([`GameCommand`]), the transport mapping
//! that carries it ([`CommandEnvelope`]), the closed registry that turns a
//! type name into an instance ([`CommandRegistry`]), and the gate every
//! client command passes before it may touch state ([`CommandValidator`]).
//!
//! # Modules
//!
//! - [`command`] -- [`GameCommand`], [`AccessLevel`], [`ExecutionMode`],
//!   [`EnvironmentLock`], [`DeploymentEnvironment`].
//! - [`context`] -- [`CommandContext`] handed to `execute`.
//! - [`envelope`] -- [`CommandEnvelope`] field access.
//! - [`origin`] -- [`ExecutionOrigin`], the trusted-caller tag.
//! - [`registry`] -- [`CommandRegistry`].
//! - [`validator`] -- [`CommandValidator`] and its [`Authorization`] token.
//! - [`error`] -- [`CommandError`], [`ExecutionError`], [`ErrorKind`].

pub mod command;
pub mod context;
pub mod envelope;
pub mod error;
pub mod origin;
pub mod registry;
pub mod validator;

pub use command::{
    AccessLevel, CommandResult, DeploymentEnvironment, EnvironmentLock, ExecutionMode, GameCommand,
};
pub use context::{CommandContext, CommandServices};
pub use envelope::CommandEnvelope;
pub use error::{CommandError, ErrorKind, ExecutionError};
pub use origin::ExecutionOrigin;
pub use registry::CommandRegistry;
pub use validator::{Authorization, CommandValidator};
