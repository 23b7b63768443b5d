//! Schema-version upgrades for persisted player documents.
//!
//! Each running build understands exactly one schema version,
//! [`StateMigrations::current_version`]. Documents written by older builds
//! carry a lower `version` and are walked forward one version at a time
//! before any command sees them. The table is sparse: a version with no
//! registered migration is bumped without transforming anything.
//!
//! A document with no `version` key at all predates versioning. It is
//! stamped with the current version and no migration runs, since no
//! transform was ever written against its shape.
//!
//! Migrations must tolerate data they never produced and must be safe to
//! re-run; a retried invocation may replay the whole pass against a
//! document that was never persisted.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::StateError;
use crate::server_state::ServerState;

/// In-place transform from one schema version to the next.
pub type Migration = Box<dyn Fn(&mut ServerState) -> Result<(), StateError> + Send + Sync>;

/// Ordered table of migrations keyed by the version they upgrade from.
pub struct StateMigrations {
    current_version: u64,
    migrations: BTreeMap<u64, Migration>,
}

impl StateMigrations {
    /// Create a table for a build that understands `current_version`.
    pub fn new(current_version: u64) -> Self {
        Self {
            current_version,
            migrations: BTreeMap::new(),
        }
    }

    /// Register the transform that upgrades `from_version` to `from_version + 1`.
    ///
    /// Registering the same source version twice replaces the earlier
    /// transform.
    #[must_use]
    pub fn with_migration<F>(mut self, from_version: u64, migration: F) -> Self
    where
        F: Fn(&mut ServerState) -> Result<(), StateError> + Send + Sync + 'static,
    {
        if from_version >= self.current_version {
            tracing::warn!(
                from_version,
                current_version = self.current_version,
                "Migration registered at or beyond the current version will never run"
            );
        }
        self.migrations.insert(from_version, Box::new(migration));
        self
    }

    /// The schema version this build understands.
    pub const fn current_version(&self) -> u64 {
        self.current_version
    }

    /// Whether a transform is registered for `from_version`.
    pub fn has_migration(&self, from_version: u64) -> bool {
        self.migrations.contains_key(&from_version)
    }

    /// Bring `state` up to [`current_version`](Self::current_version).
    ///
    /// Returns the number of version bumps performed. Zero means the
    /// document was already current, newer than this build, or unversioned.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidVersion`] if the stored version is not
    /// an integer, or the error of the first migration that fails. A failed
    /// pass leaves `state` partially upgraded in memory only; the caller
    /// must not persist it.
    pub fn run_migrations(&self, state: &mut ServerState) -> Result<u64, StateError> {
        let Some(mut version) = state.version()? else {
            state.set_version(self.current_version);
            tracing::debug!(
                version = self.current_version,
                "Stamped unversioned player state"
            );
            return Ok(0);
        };

        if version > self.current_version {
            tracing::warn!(
                stored_version = version,
                current_version = self.current_version,
                "Player state is newer than this build; leaving it untouched"
            );
            return Ok(0);
        }

        let mut bumps: u64 = 0;
        while version < self.current_version {
            if let Some(migration) = self.migrations.get(&version) {
                migration(state)?;
                tracing::debug!(from_version = version, "Applied state migration");
            }
            version = version.saturating_add(1);
            bumps = bumps.saturating_add(1);
            state.set_version(version);
        }

        Ok(bumps)
    }
}

impl fmt::Debug for StateMigrations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMigrations")
            .field("current_version", &self.current_version)
            .field("registered", &self.migrations.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use keystone_types::{Model, fields};
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Wallet {
        coins: u64,
        #[serde(default)]
        premium: u64,
    }

    impl Model for Wallet {
        const TYPE_ID: &'static str = "Wallet";
    }

    /// Version 0 stored premium currency inside `coins`; version 1 splits it.
    fn split_premium(state: &mut ServerState) -> Result<(), StateError> {
        let mut wallet = state.deserialize_model::<Wallet>()?;
        if wallet.premium == 0 && wallet.coins >= 1000 {
            wallet.premium = wallet.coins / 1000;
            wallet.coins %= 1000;
            state.update_model(&wallet)?;
        }
        Ok(())
    }

    fn counting(counter: Arc<AtomicU32>) -> impl Fn(&mut ServerState) -> Result<(), StateError> {
        move |_state: &mut ServerState| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn unversioned_state_is_stamped_without_migrating() {
        let calls = Arc::new(AtomicU32::new(0));
        let migrations = StateMigrations::new(5).with_migration(0, counting(Arc::clone(&calls)));

        let mut state = ServerState::new();
        assert_eq!(migrations.run_migrations(&mut state).unwrap(), 0);
        assert_eq!(state.version().unwrap(), Some(5));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(state.only_updated_state().contains_key(fields::VERSION));
    }

    #[test]
    fn version_zero_runs_registered_migration() {
        let migrations = StateMigrations::new(1).with_migration(0, split_premium);

        let mut state = ServerState::new();
        state.set_version(0);
        state.update_model(&Wallet { coins: 2500, premium: 0 }).unwrap();
        state.clear_updates();

        assert_eq!(migrations.run_migrations(&mut state).unwrap(), 1);
        assert_eq!(state.version().unwrap(), Some(1));
        assert_eq!(
            state.deserialize_model::<Wallet>().unwrap(),
            Wallet { coins: 500, premium: 2 }
        );
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let calls = Arc::new(AtomicU32::new(0));
        let migrations = StateMigrations::new(3)
            .with_migration(0, counting(Arc::clone(&calls)))
            .with_migration(2, counting(Arc::clone(&calls)));

        let mut state = ServerState::new();
        state.set_version(0);
        assert_eq!(migrations.run_migrations(&mut state).unwrap(), 3);
        assert_eq!(migrations.run_migrations(&mut state).unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn gaps_are_plain_bumps() {
        let calls = Arc::new(AtomicU32::new(0));
        let migrations = StateMigrations::new(4).with_migration(2, counting(Arc::clone(&calls)));

        let mut state = ServerState::new();
        state.set_version(1);
        assert_eq!(migrations.run_migrations(&mut state).unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!migrations.has_migration(1));
        assert!(migrations.has_migration(2));
    }

    #[test]
    fn newer_state_is_left_alone() {
        let migrations = StateMigrations::new(2);
        let mut state = ServerState::new();
        state.set_version(7);
        state.clear_updates();

        assert_eq!(migrations.run_migrations(&mut state).unwrap(), 0);
        assert_eq!(state.version().unwrap(), Some(7));
        assert!(!state.has_updates());
    }

    #[test]
    fn failing_migration_stops_the_pass() {
        let migrations = StateMigrations::new(3).with_migration(1, |_state: &mut ServerState| {
            Err(StateError::Migration {
                from_version: 1,
                reason: "corrupt inventory".into(),
            })
        });

        let mut state = ServerState::new();
        state.set_version(0);
        let err = migrations.run_migrations(&mut state).unwrap_err();
        assert!(matches!(err, StateError::Migration { from_version: 1, .. }));
        assert_eq!(state.version().unwrap(), Some(1));
    }
}
