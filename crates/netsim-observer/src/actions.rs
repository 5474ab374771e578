//! Player action handlers.
//!
//! Each endpoint forwards to exactly one [`netsim_core::Session`]
//! operation and reports the result. Session errors become HTTP statuses
//! through [`ObserverError`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/missions/{id}/accept` | Accept an offered mission |
//! | `POST` | `/api/missions/active/abandon` | Give up on the active mission |
//! | `POST` | `/api/networks/{id}/connect` | Connect to an accessible network |
//! | `POST` | `/api/networks/{id}/disconnect` | Drop a connection |
//! | `POST` | `/api/devices/{ip}/connect` | Open a device's file system |
//! | `POST` | `/api/devices/{ip}/investigate` | Read a device's logs |
//! | `POST` | `/api/operations` | Start a scan, file operation or download |
//! | `POST` | `/api/operations/{id}/complete` | Finish an operation now |
//! | `POST` | `/api/inbox/{id}/read` | Mark a message read |
//! | `POST` | `/api/bank/deposit` | Pay credits into the primary account |
//! | `POST` | `/api/clock/speed` | Change the speed multiplier |
//! | `POST` | `/api/clock/pause` | Pause virtual time |
//! | `POST` | `/api/clock/resume` | Resume virtual time |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use netsim_core::Finalization;
use netsim_types::{
    Capability, DeviceIp, FileOperationKind, FileSystemId, MessageId, MissionId, NetworkId,
    OperationId,
};
use rust_decimal::Decimal;

use crate::error::ObserverError;
use crate::handlers::parse_uuid;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/operations`.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BeginOperationRequest {
    /// Scan a connected network for devices.
    Scan {
        /// Network to scan.
        network_id: NetworkId,
    },
    /// Repair, copy, delete, secure-delete or recover files.
    File {
        /// What to do with the files.
        operation: FileOperationKind,
        /// File system holding the files.
        file_system_id: FileSystemId,
        /// File names.
        files: Vec<String>,
        /// Target file system for copies.
        #[serde(default)]
        destination: Option<FileSystemId>,
    },
    /// Download and install software.
    Download {
        /// Capability the software provides.
        capability: Capability,
    },
}

/// Request body for `POST /api/bank/deposit`.
#[derive(Debug, serde::Deserialize)]
pub struct DepositRequest {
    /// Credits to pay in; must be positive.
    pub amount: Decimal,
    /// Statement line (default `"Deposit"`).
    pub description: Option<String>,
}

/// Request body for `POST /api/clock/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New speed multiplier; must be one of the allowed speeds.
    pub speed: u32,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct ActionResponse {
    /// Whether the call changed anything.
    ok: bool,
    /// Human-readable message.
    message: String,
}

impl ActionResponse {
    fn new(ok: bool, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            ok,
            message: message.into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Missions
// ---------------------------------------------------------------------------

/// Accept an offered mission and return it as the active mission.
pub async fn accept_mission(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let mission_id = MissionId::from(parse_uuid(&id_str)?);
    let mut session = state.session.lock().await;
    let active = session.accept_mission(mission_id)?;
    Ok(Json(serde_json::to_value(active)?))
}

/// Abandon the active mission. It fails as incomplete.
pub async fn abandon_mission(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let mut session = state.session.lock().await;
    let finalization = session.abandon_mission()?;
    let (ok, message) = match finalization {
        Finalization::Applied(outcome) => (true, format!("Mission finalized: {outcome:?}")),
        Finalization::AlreadyFinalized => (false, String::from("Mission was already finalized")),
    };
    Ok(ActionResponse::new(ok, message))
}

// ---------------------------------------------------------------------------
// Networks and devices
// ---------------------------------------------------------------------------

/// Connect to a network the player has access to.
pub async fn connect_network(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let network_id = NetworkId::new(id);
    let mut session = state.session.lock().await;
    session.connect_network(&network_id)?;
    Ok(ActionResponse::new(true, format!("Connected to {network_id}")))
}

/// Drop the connection to a network.
pub async fn disconnect_network(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let network_id = NetworkId::new(id);
    let mut session = state.session.lock().await;
    if session.disconnect_network(&network_id) {
        ActionResponse::new(true, format!("Disconnected from {network_id}"))
    } else {
        ActionResponse::new(false, format!("Not connected to {network_id}"))
    }
}

/// Open the file system of a reachable device.
pub async fn connect_device(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let ip = DeviceIp::new(ip);
    let mut session = state.session.lock().await;
    let file_system_id = session.connect_file_system(&ip)?;
    let file_system = session.registry().get_file_system(&file_system_id);
    Ok(Json(serde_json::json!({
        "file_system_id": file_system_id,
        "file_system": file_system,
    })))
}

/// Read a device's audit log. Needs investigation tooling.
pub async fn investigate_device(
    State(state): State<Arc<AppState>>,
    Path(ip): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let ip = DeviceIp::new(ip);
    let mut session = state.session.lock().await;
    let logs = session.investigate_logs(&ip)?;
    Ok(Json(serde_json::json!({
        "device_ip": ip,
        "logs": logs,
    })))
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Register a bandwidth operation.
///
/// Responds `201 Created` with the operation id and its completion
/// estimate at the share current at registration.
pub async fn begin_operation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BeginOperationRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let mut session = state.session.lock().await;
    let registration = match body {
        BeginOperationRequest::Scan { network_id } => session.scan_network(&network_id)?,
        BeginOperationRequest::File {
            operation,
            file_system_id,
            files,
            destination,
        } => session.begin_file_operation(operation, &file_system_id, files, destination)?,
        BeginOperationRequest::Download { capability } => {
            session.begin_software_download(capability)?
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "operation_id": registration.id,
            "estimated_secs": registration.estimated_secs,
            "estimated_completion": registration.estimated_completion,
        })),
    ))
}

/// Complete an operation immediately and apply its effect.
pub async fn complete_operation(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let operation_id = OperationId::from(parse_uuid(&id_str)?);
    let mut session = state.session.lock().await;
    let operation = session.complete_operation(operation_id)?;
    Ok(Json(serde_json::to_value(operation)?))
}

// ---------------------------------------------------------------------------
// Inbox and bank
// ---------------------------------------------------------------------------

/// Mark a delivered message as read.
pub async fn read_message(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let message_id = MessageId::from(parse_uuid(&id_str)?);
    let mut session = state.session.lock().await;
    if !session.mark_message_read(message_id) {
        return Err(ObserverError::NotFound(format!("message {message_id}")));
    }
    Ok(ActionResponse::new(true, "Message read"))
}

/// Pay credits into the primary account and return the new balance.
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DepositRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let description = body.description.unwrap_or_else(|| String::from("Deposit"));
    let mut session = state.session.lock().await;
    let balance = session.deposit(body.amount, description)?;
    Ok(Json(serde_json::json!({
        "balance": balance,
        "bankruptcy_countdown": session.economy().bankruptcy_countdown(),
    })))
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Change the speed multiplier. Pending timers keep their virtual instant.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let mut session = state.session.lock().await;
    session.set_speed(body.speed)?;
    Ok(ActionResponse::new(true, format!("Speed set to {}x", body.speed)))
}

/// Pause virtual time.
pub async fn pause(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut session = state.session.lock().await;
    if session.pause() {
        ActionResponse::new(true, "Simulation paused")
    } else {
        ActionResponse::new(false, "Simulation already paused")
    }
}

/// Resume virtual time.
pub async fn resume(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut session = state.session.lock().await;
    if session.resume() {
        ActionResponse::new(true, "Simulation resumed")
    } else {
        ActionResponse::new(false, "Simulation is not paused")
    }
}
