//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and shutdown.

use std::path::PathBuf;

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: netsim_core::ConfigError,
    },

    /// The session could not be created or restored.
    #[error("session error: {source}")]
    Session {
        /// The underlying session error.
        #[from]
        source: netsim_core::SessionError,
    },

    /// A save file could not be encoded or decoded.
    #[error("save error: {source}")]
    Save {
        /// The underlying save error.
        #[from]
        source: netsim_core::SaveError,
    },

    /// A save file could not be read or written.
    #[error("save file {path}: {source}")]
    SaveFile {
        /// The file involved.
        path: PathBuf,
        /// The I/O failure.
        source: std::io::Error,
    },

    /// Observer API server failed to start.
    #[error("observer error: {message}")]
    Observer {
        /// Description of the observer failure.
        message: String,
    },
}
