//! Execution origin, the caller-authentication tag threaded through
//! validation and execution.

use keystone_types::fields;

use crate::envelope::CommandEnvelope;

/// Whether a command invocation comes from a trusted server caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionOrigin {
    /// Backend services, scheduled jobs, and callers holding the server secret.
    ServerTrusted,
    /// A game client.
    ClientUntrusted,
}

impl ExecutionOrigin {
    /// Whether the origin is trusted.
    pub const fn is_trusted(self) -> bool {
        matches!(self, Self::ServerTrusted)
    }

    /// Derive the origin from the envelope's [`SecretKey`](fields::SECRET_KEY).
    ///
    /// The caller is trusted only when the server has a secret configured
    /// and the envelope presents exactly that secret.
    pub fn from_envelope(envelope: &CommandEnvelope, server_secret: Option<&str>) -> Self {
        match (envelope.get(fields::SECRET_KEY), server_secret) {
            (Some(presented), Some(expected))
                if !expected.is_empty() && secrets_match(presented, expected) =>
            {
                Self::ServerTrusted
            }
            _ => Self::ClientUntrusted,
        }
    }
}

/// Compare two secrets without short-circuiting on the first differing byte.
fn secrets_match(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
