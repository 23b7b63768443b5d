//! Sandbox binary for the Keystone command pipeline.
//!
//! Replays a scripted session for one player through a real
//! [`CommandExecutor`], with a client stand-in that predicts every command
//! locally and reconciles against the server's deltas.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `keystone-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Load the request script (first argument, or the bundled scenario)
//! 4. Connect the document store (Dragonfly if configured, else in memory)
//! 5. Load the player: setup, migrations, initialization commands
//! 6. Replay every request, predicting and reconciling on the client side
//! 7. Log the session summary

mod client;
mod game;
mod script;

use std::path::{Path, PathBuf};

use chrono::Utc;
use keystone_commands::CommandEnvelope;
use keystone_server::{CommandExecutor, ServerConfig};
use keystone_state::{DragonflyStateStore, InMemoryStateStore, PlayerStateStore};
use keystone_types::{PlayerId, StateDelta, fields};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::client::ClientMirror;
use crate::script::Script;

/// Default configuration file, relative to the working directory.
const CONFIG_PATH: &str = "keystone-config.yaml";

/// Application entry point for the sandbox.
///
/// # Errors
///
/// Returns an error if configuration, the script, or the store cannot be
/// loaded, or if the player cannot be prepared.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let config_path = Path::new(CONFIG_PATH);
    let config = if config_path.exists() {
        ServerConfig::from_file(config_path)?
    } else {
        let mut config = ServerConfig::default();
        config.apply_env_overrides()?;
        config
    };

    // 2. Initialize structured logging. RUST_LOG wins over the config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        environment = %config.server.environment,
        min_client_version = %config.server.min_client_version,
        development_mode = config.server.development_mode,
        configuration_version = config.game.configuration_version,
        from_file = config_path.exists(),
        "Configuration loaded"
    );
    info!(
        build_number = config.server.build_number,
        build_commit = config.server.build_commit,
        "keystone-sandbox build"
    );

    // 3. Load the script.
    let script_path = std::env::args_os().nth(1).map(PathBuf::from);
    let script = Script::load(script_path.as_deref())?;
    info!(
        player_id = script.player_id,
        requests = script.requests.len(),
        "Script loaded"
    );

    // 4. Connect the store and replay.
    match config.infrastructure.dragonfly_url.as_deref() {
        Some(url) => {
            let store = DragonflyStateStore::connect(url).await?;
            let executor =
                CommandExecutor::new(store, game::registry(), game::migrations(), &config);
            replay(&executor, &config, &script).await
        }
        None => {
            info!("No Dragonfly URL configured, keeping player documents in memory");
            let executor = CommandExecutor::new(
                InMemoryStateStore::new(),
                game::registry(),
                game::migrations(),
                &config,
            );
            replay(&executor, &config, &script).await
        }
    }
}

/// Run one scripted session.
async fn replay<S: PlayerStateStore>(
    executor: &CommandExecutor<S>,
    config: &ServerConfig,
    script: &Script,
) -> anyhow::Result<()> {
    let player = PlayerId::new(script.player_id.clone());

    // 5. Load the player.
    let login_state = executor
        .load_player(&player, script.initial_state.clone())
        .await?;
    info!(player_id = %player, keys = login_state.len(), "Player loaded");
    let mut client = ClientMirror::new(
        player.clone(),
        &login_state,
        config.game.configuration_version,
    );

    // 6. Replay.
    let mut clock = Utc::now().timestamp_millis();
    let (mut accepted, mut rejected, mut desync_events) = (0_u32, 0_u32, 0_u32);

    for request in &script.requests {
        let timestamp = clock.saturating_add(request.timestamp_offset);
        if request.timestamp_offset > 0 {
            clock = timestamp;
        }
        let data = request.envelope(script, timestamp, config.secret_key());

        for (key, value) in &request.tamper {
            client.tamper(key, value);
        }
        if !request.skip_prediction {
            client.predict(
                executor.registry(),
                &request.command,
                &CommandEnvelope::new(data.clone()),
            );
        }

        match executor.execute(&player, &request.command, data).await {
            Ok(response) => {
                accepted = accepted.saturating_add(1);
                if let Some(result) = &response.result {
                    info!(command = request.command, ?result, "Command result");
                }
                if let Some(version) = response.data.get(fields::CONFIGURATION_VERSION) {
                    info!(configuration_version = version, "Client should refresh game configuration");
                }
                let delta = StateDelta::read_from(&response.data)?;
                if !client.reconcile(&delta)?.is_empty() {
                    desync_events = desync_events.saturating_add(1);
                }
            }
            Err(err) => {
                rejected = rejected.saturating_add(1);
                client.rollback();
                let payload = err.to_error_data();
                warn!(
                    command = request.command,
                    kind = payload.get(fields::ERROR_KIND).map(String::as_str),
                    message = payload.get(fields::LOGIC_EXCEPTION).map(String::as_str),
                    "Request rejected"
                );
            }
        }
    }

    // 7. Summary.
    let drift = client.session_report()?;
    let stored = executor.store().get_player_state(&player).await?;
    info!(
        accepted,
        rejected,
        desync_events,
        final_drift = ?drift,
        stored_keys = stored.len(),
        "Session finished"
    );
    Ok(())
}
