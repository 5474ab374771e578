//! Observer API server for Netsim.
//!
//! Serves a running [`netsim_core::Session`] over HTTP so a browser UI can
//! read snapshots and trigger player actions. The engine spawns it next to
//! the driver loop; both share the session through [`state::AppState`].
//!
//! # Modules
//!
//! - [`router`] -- Route table with CORS and request tracing.
//! - [`handlers`] -- Read-only snapshot endpoints.
//! - [`actions`] -- Endpoints that call session operations.
//! - [`state`] -- Shared session handle.
//! - [`error`] -- Error type and its HTTP mapping.
//! - [`server`] -- Bind and serve.
//! - [`startup`] -- Background task helper for the engine.

pub mod actions;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
