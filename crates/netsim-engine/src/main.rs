//! Engine binary for Netsim.
//!
//! Wires the kernel to the outside world: it loads configuration, creates
//! or restores a session, serves it over the observer API and drives it
//! in real time until the game ends or the process is interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`NETSIM_CONFIG`, default `netsim-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Restore the save at `NETSIM_SAVE` if present, else start fresh
//! 4. Start the observer API server
//! 5. Run the driver loop until game over or Ctrl-C
//! 6. Write the save file

mod driver;
mod error;
mod persistence;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use netsim_core::{LoggingConfig, Session, SimulationConfig};
use netsim_observer::server::ServerConfig;
use netsim_observer::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::driver::StopReason;
use crate::error::EngineError;

/// Config file used when `NETSIM_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "netsim-config.yaml";

/// Save file used when `NETSIM_SAVE` is unset.
const DEFAULT_SAVE_PATH: &str = "netsim-save.json";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, session setup, the observer or the
/// final save fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = env_path("NETSIM_CONFIG", DEFAULT_CONFIG_PATH);
    let config = load_config(&config_path)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        config = %config_path.display(),
        username = config.session.username,
        seed = config.session.seed,
        speed = config.clock.default_speed,
        "netsim-engine starting"
    );

    // 3. Create or restore the session.
    let save_path = env_path("NETSIM_SAVE", DEFAULT_SAVE_PATH);
    let server_config = ServerConfig::from(&config.observer);
    let session = match persistence::read_save(&save_path)? {
        Some(save) => {
            info!(save = %save_path.display(), "restoring saved session");
            Session::restore(config, save)?
        }
        None => Session::new(config)?,
    };
    info!(
        virtual_now = %session.now(),
        missions_offered = session.pool().len(),
        "session ready"
    );

    // 4. Start the observer API server.
    let app_state = Arc::new(AppState::new(session));
    let observer = netsim_observer::startup::spawn_observer(server_config, Arc::clone(&app_state))
        .map_err(|e| EngineError::Observer {
            message: format!("{e}"),
        })?;

    // 5. Drive the session.
    let reason = driver::run(&app_state.session, driver::TICK, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    })
    .await;
    observer.abort();

    // 6. Save.
    let save = app_state.session.lock().await.save();
    persistence::write_save(&save_path, &save)?;

    match reason {
        StopReason::GameOver(cause) => info!(?cause, save = %save_path.display(), "game over"),
        StopReason::Shutdown => info!(save = %save_path.display(), "session saved"),
    }
    info!("netsim-engine shutdown complete");

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured
/// level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Load the configuration file, falling back to defaults when it does not
/// exist.
fn load_config(path: &Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        return Ok(SimulationConfig::from_file(path)?);
    }
    let mut config = SimulationConfig::default();
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var_os(var).map_or_else(|| PathBuf::from(default), PathBuf::from)
}
