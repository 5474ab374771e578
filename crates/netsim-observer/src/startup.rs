//! Observer server startup helper for embedding in the engine.
//!
//! Provides [`spawn_observer`] which launches the Observer HTTP server on
//! a background Tokio task, so the API runs concurrently with the driver
//! loop that advances the session.
//!
//! # Usage
//!
//! ```rust,ignore
//! use netsim_observer::server::ServerConfig;
//! use netsim_observer::startup::spawn_observer;
//! use netsim_observer::state::AppState;
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::new(session));
//! let handle = spawn_observer(ServerConfig::default(), state)?;
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the Observer server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the Observer HTTP server on a background Tokio task.
///
/// Returns a [`JoinHandle`] so the caller can abort the server during
/// shutdown. Bind failures after spawning are logged, not returned.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the configured address does not
/// parse. This is checked before the background task is spawned.
pub fn spawn_observer(
    config: ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let addr = config.socket_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::start_server(&config, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%addr, "Observer server spawned on background task");

    Ok(handle)
}
