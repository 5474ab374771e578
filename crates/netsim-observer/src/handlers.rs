//! Read-only REST endpoint handlers for the Observer server.
//!
//! Every handler locks the shared session, reads through its documented
//! accessors and serializes the result. None of them mutate state.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/state` | Clock, bank, reputation and countdowns |
//! | `GET` | `/api/networks` | Known networks |
//! | `GET` | `/api/networks/{id}` | One network with its devices |
//! | `GET` | `/api/devices/{ip}` | One device with its file system |
//! | `GET` | `/api/missions` | Missions offered on the board |
//! | `GET` | `/api/missions/active` | The mission in progress |
//! | `GET` | `/api/missions/history` | Finished missions |
//! | `GET` | `/api/inbox` | Delivered messages |
//! | `GET` | `/api/bandwidth` | Active transfers and their progress |
//! | `GET` | `/api/events` | Recent journal entries |

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use axum::Json;
use netsim_types::{DeviceIp, NetworkId};
use uuid::Uuid;

use crate::error::ObserverError;
use crate::state::AppState;

/// Journal entries returned when no limit is given.
const DEFAULT_EVENT_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /api/events` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct EventsQuery {
    /// Maximum number of entries to return, newest last (default 50).
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing the session status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.session.lock().await;
    let now = session.now().format("%Y-%m-%d %H:%M:%S");
    let speed = session.clock().speed();
    let clock_status = if session.clock().is_paused() { "PAUSED" } else { "RUNNING" };
    let balance = session.economy().bank().total_balance();
    let tier = session.economy().reputation();
    let offered = session.pool().len();
    let active = session
        .active_mission()
        .map_or_else(|| String::from("none"), |active| active.mission.title.clone());
    let status = session
        .game_over()
        .map_or_else(|| clock_status.to_owned(), |reason| format!("GAME OVER ({reason:?})"));

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Netsim Observer</title>
    <style>
        body {{
            background: #0b0f0c;
            color: #b5e8b0;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #5ff05a; margin-bottom: 0.25rem; }}
        .metric {{
            display: inline-block;
            border: 1px solid #2c4a2a;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #7a9c77; font-size: 0.85rem; }}
        .metric .value {{ color: #5ff05a; font-size: 1.3rem; font-weight: bold; }}
        a {{ color: #5ff05a; }}
        ul {{ list-style: none; padding: 0; }}
        li::before {{ content: "GET "; color: #f0c85a; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>Netsim Observer</h1>
    <p>Status: <strong>{status}</strong></p>
    <div>
        <div class="metric"><div class="label">Virtual time</div><div class="value">{now}</div></div>
        <div class="metric"><div class="label">Speed</div><div class="value">{speed}x</div></div>
        <div class="metric"><div class="label">Balance</div><div class="value">{balance}</div></div>
        <div class="metric"><div class="label">Reputation</div><div class="value">{tier}</div></div>
        <div class="metric"><div class="label">Offered</div><div class="value">{offered}</div></div>
    </div>
    <p>Active mission: {active}</p>
    <ul>
        <li><a href="/api/state">/api/state</a></li>
        <li><a href="/api/networks">/api/networks</a></li>
        <li><a href="/api/missions">/api/missions</a></li>
        <li><a href="/api/inbox">/api/inbox</a></li>
        <li><a href="/api/bandwidth">/api/bandwidth</a></li>
        <li><a href="/api/events">/api/events</a></li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/state
// ---------------------------------------------------------------------------

/// Return the player-facing summary of the session.
pub async fn get_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.session.lock().await;
    let clock = session.clock();
    let economy = session.economy();
    let tier = economy.reputation();
    let unread = session.inbox().iter().filter(|message| !message.read).count();

    Json(serde_json::json!({
        "username": session.config().session.username,
        "mail_id": session.config().session.mail_id(),
        "now": session.now(),
        "speed": clock.speed(),
        "allowed_speeds": clock.allowed_speeds(),
        "paused": clock.is_paused(),
        "balance": economy.bank().total_balance(),
        "accounts": economy.bank().accounts(),
        "reputation": {
            "tier": tier.value(),
            "name": tier.name(),
        },
        "bankruptcy_countdown": economy.bankruptcy_countdown(),
        "termination_countdown": economy.termination_countdown(),
        "adapter_mbps": session.inventory().adapter_mbps,
        "capabilities": session.inventory().capabilities,
        "active_mission": session.active_mission().map(|active| active.mission.id),
        "missions_offered": session.pool().len(),
        "unread_messages": unread,
        "operations": session.bandwidth().active_count(),
        "game_over": session.game_over(),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/networks
// ---------------------------------------------------------------------------

/// List every network the registry knows, with connection status.
pub async fn list_networks(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.session.lock().await;
    let registry = session.registry();
    let networks: Vec<serde_json::Value> = registry
        .get_known_networks()
        .into_iter()
        .map(|network| {
            serde_json::json!({
                "network_id": network.network_id,
                "name": network.name,
                "address": network.address,
                "bandwidth_mbps": network.bandwidth_mbps,
                "accessible": network.accessible,
                "revoked_reason": network.revoked_reason,
                "connected": session.connections().contains(&network.network_id),
                "device_count": registry.get_devices_by_network(&network.network_id).len(),
            })
        })
        .collect();

    Json(serde_json::json!({
        "count": networks.len(),
        "networks": networks,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/networks/{id}
// ---------------------------------------------------------------------------

/// Return one network with its devices and audit log.
pub async fn get_network(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let network_id = NetworkId::new(id);
    let session = state.session.lock().await;
    let network = session
        .registry()
        .get_network(&network_id)
        .ok_or_else(|| ObserverError::NotFound(format!("network {network_id}")))?;
    let devices = session.registry().get_devices_by_network(&network_id);

    Ok(Json(serde_json::json!({
        "network": network,
        "connected": session.connections().contains(&network_id),
        "devices": devices,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/devices/{ip}
// ---------------------------------------------------------------------------

/// Return one device and the file system it exposes, if any.
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let ip = DeviceIp::new(ip);
    let session = state.session.lock().await;
    let device = session
        .registry()
        .get_device(&ip)
        .ok_or_else(|| ObserverError::NotFound(format!("device {ip}")))?;
    let file_system = session.registry().file_system_for_device(&ip);

    Ok(Json(serde_json::json!({
        "device": device,
        "file_system": file_system,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/missions
// ---------------------------------------------------------------------------

/// List the missions currently offered, in board order.
pub async fn list_missions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.session.lock().await;
    let missions = session.pool().visible_missions();

    Json(serde_json::json!({
        "count": missions.len(),
        "missions": missions,
    }))
}

/// Return the mission in progress.
pub async fn get_active_mission(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let session = state.session.lock().await;
    let active = session
        .active_mission()
        .ok_or_else(|| ObserverError::NotFound(String::from("no mission is in progress")))?;
    Ok(Json(serde_json::to_value(active)?))
}

/// List finished missions, oldest first.
pub async fn mission_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.session.lock().await;
    Json(serde_json::json!({
        "missions": session.mission_history(),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/inbox
// ---------------------------------------------------------------------------

/// List delivered messages plus the number still queued.
pub async fn get_inbox(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.session.lock().await;
    let inbox = session.inbox();

    Json(serde_json::json!({
        "count": inbox.len(),
        "unread": inbox.iter().filter(|message| !message.read).count(),
        "queued": session.message_queue().len(),
        "messages": inbox,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/bandwidth
// ---------------------------------------------------------------------------

/// Return adapter usage and every active operation with its progress and
/// estimated completion at the current share.
pub async fn get_bandwidth(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.session.lock().await;
    let now = session.now();
    let bandwidth = session.bandwidth();
    let operations: Vec<serde_json::Value> = bandwidth
        .operations()
        .map(|operation| {
            serde_json::json!({
                "operation": operation,
                "progress": bandwidth.progress(operation.id, now),
                "estimated_completion": bandwidth.estimated_completion(operation.id, now),
            })
        })
        .collect();

    Json(serde_json::json!({
        "adapter_mbps": bandwidth.adapter_mbps(),
        "usage_percent": bandwidth.usage_percent(),
        "operations": operations,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/events
// ---------------------------------------------------------------------------

/// Return the most recent journal entries, oldest first.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_EVENT_LIMIT);
    let session = state.session.lock().await;
    let skip = session.journal().count().saturating_sub(limit);
    let recent: Vec<_> = session.journal().skip(skip).collect();

    Json(serde_json::json!({
        "count": recent.len(),
        "events": recent,
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a UUID from a path segment.
pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, ObserverError> {
    s.parse::<Uuid>()
        .map_err(|e| ObserverError::InvalidUuid(format!("{s}: {e}")))
}
