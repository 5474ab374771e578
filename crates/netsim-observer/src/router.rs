//! Axum router construction for the Observer API.
//!
//! Assembles the read and action routes into a single [`Router`] with
//! CORS enabled for the browser UI and request tracing.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::actions;
use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the Observer server.
///
/// Read routes live in [`handlers`], state-changing routes in
/// [`actions`]; both module docs carry the endpoint tables.
///
/// CORS is configured to allow any origin so a locally served UI can
/// reach the API.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // Session snapshot
        .route("/api/state", get(handlers::get_state))
        .route("/api/events", get(handlers::list_events))
        // Networks and devices
        .route("/api/networks", get(handlers::list_networks))
        .route("/api/networks/{id}", get(handlers::get_network))
        .route("/api/networks/{id}/connect", post(actions::connect_network))
        .route("/api/networks/{id}/disconnect", post(actions::disconnect_network))
        .route("/api/devices/{ip}", get(handlers::get_device))
        .route("/api/devices/{ip}/connect", post(actions::connect_device))
        .route("/api/devices/{ip}/investigate", post(actions::investigate_device))
        // Missions
        .route("/api/missions", get(handlers::list_missions))
        .route("/api/missions/active", get(handlers::get_active_mission))
        .route("/api/missions/active/abandon", post(actions::abandon_mission))
        .route("/api/missions/history", get(handlers::mission_history))
        .route("/api/missions/{id}/accept", post(actions::accept_mission))
        // Bandwidth operations
        .route("/api/bandwidth", get(handlers::get_bandwidth))
        .route("/api/operations", post(actions::begin_operation))
        .route("/api/operations/{id}/complete", post(actions::complete_operation))
        // Inbox and bank
        .route("/api/inbox", get(handlers::get_inbox))
        .route("/api/inbox/{id}/read", post(actions::read_message))
        .route("/api/bank/deposit", post(actions::deposit))
        // Clock
        .route("/api/clock/speed", post(actions::set_speed))
        .route("/api/clock/pause", post(actions::pause))
        .route("/api/clock/resume", post(actions::resume))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
