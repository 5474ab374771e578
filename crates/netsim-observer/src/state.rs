//! Shared application state for the Observer API server.
//!
//! The engine's driver loop and the HTTP handlers share one [`Session`]
//! behind an async mutex. Handlers hold the lock only for the duration of
//! a single session call plus serialization, so the driver loop never
//! waits on a slow client.

use std::sync::Arc;

use netsim_core::Session;
use tokio::sync::Mutex;

/// A session shared between the driver loop and the observer.
pub type SharedSession = Arc<Mutex<Session>>;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// The running session.
    pub session: SharedSession,
}

impl AppState {
    /// Wrap a freshly built session.
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Share a session the caller already holds a handle to.
    pub const fn from_shared(session: SharedSession) -> Self {
        Self { session }
    }
}
