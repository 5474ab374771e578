//! Core entity structs for the kernel's data model.
//!
//! Networks, devices and file systems (the registry), bandwidth operations,
//! missions with their objectives and consequences, countdowns, messages,
//! and bank records. These are plain data: the behaviour lives in the
//! crates that own each entity.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    Difficulty, FailureCause, FileOperationKind, MissionType, ObjectiveStatus, ObjectiveType,
    OperationStatus, OperationType,
};
use crate::ids::{
    AccountId, ArcId, ClientId, DeviceIp, FileSystemId, MessageId, MissionId, NetworkId,
    OperationId, TransactionId,
};

/// Bytes per megabyte used for all size conversions.
pub const BYTES_PER_MB: u64 = 1_000_000;

// ---------------------------------------------------------------------------
// Registry entities
// ---------------------------------------------------------------------------

/// One audit-log line on a network or device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LogEntry {
    /// What happened (e.g. `"file_deleted"`, `"access_revoked"`).
    pub action: String,
    /// Who did it (player username, client, or `"system"`).
    pub actor: String,
    /// Free-form detail.
    pub note: String,
    /// Virtual time of the entry.
    pub timestamp: DateTime<Utc>,
}

/// A network known to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Network {
    /// Registry key.
    pub network_id: NetworkId,
    /// Display name.
    pub name: String,
    /// CIDR-like address block (e.g. `"10.4.12.0/24"`).
    pub address: String,
    /// Remote bandwidth rating in Mbps.
    pub bandwidth_mbps: f64,
    /// Whether the player currently holds credentials.
    pub accessible: bool,
    /// Why access was revoked, while it is revoked.
    pub revoked_reason: Option<String>,
    /// Append-only audit log.
    pub logs: Vec<LogEntry>,
}

/// A device on a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Device {
    /// Unique address; the registry key.
    pub ip: DeviceIp,
    /// Host name shown in scans.
    pub hostname: String,
    /// Owning network.
    pub network_id: NetworkId,
    /// Stored access flag, cascaded from the network on revoke/grant.
    pub accessible: bool,
    /// The device's file system, if it exposes one.
    pub file_system_id: Option<FileSystemId>,
    /// Append-only audit log.
    pub logs: Vec<LogEntry>,
}

/// One file in a file system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FileEntry {
    /// File name, unique within its file system.
    pub name: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Whether the contents are corrupted.
    pub corrupted: bool,
    /// Whether the file is deleted (recoverable unless `secure_deleted`).
    pub deleted: bool,
    /// Virtual time of the most recent delete.
    pub deleted_at: Option<DateTime<Utc>>,
    /// One-way flag: once set the file can never be recovered.
    pub secure_deleted: bool,
}

impl FileEntry {
    /// Create an intact file.
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            corrupted: false,
            deleted: false,
            deleted_at: None,
            secure_deleted: false,
        }
    }

    /// Size in megabytes.
    #[allow(clippy::cast_precision_loss)]
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_MB as f64
    }

    /// Present, readable and not corrupted.
    pub const fn is_intact(&self) -> bool {
        !self.deleted && !self.corrupted
    }
}

/// A device's file system: an ordered list of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FileSystem {
    /// Registry key.
    pub id: FileSystemId,
    /// Device hosting this file system.
    pub device_ip: DeviceIp,
    /// Files in display order.
    pub files: Vec<FileEntry>,
}

impl FileSystem {
    /// Look up a file by name.
    pub fn file(&self, name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Look up a file by name for mutation.
    pub fn file_mut(&mut self, name: &str) -> Option<&mut FileEntry> {
        self.files.iter_mut().find(|f| f.name == name)
    }
}

/// A device as described by a mission before it is merged into the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DeviceBlueprint {
    /// Device address.
    pub ip: DeviceIp,
    /// Host name.
    pub hostname: String,
    /// The device's file system.
    pub file_system: FileSystem,
    /// Pre-seeded audit log (investigation trails).
    pub logs: Vec<LogEntry>,
}

/// A network bundled with a mission, merged into the registry on acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NetworkBlueprint {
    /// Registry key of the network.
    pub network_id: NetworkId,
    /// Display name.
    pub name: String,
    /// CIDR-like address block.
    pub address: String,
    /// Remote bandwidth rating in Mbps.
    pub bandwidth_mbps: f64,
    /// Devices on the network.
    pub devices: Vec<DeviceBlueprint>,
}

// ---------------------------------------------------------------------------
// Bandwidth
// ---------------------------------------------------------------------------

/// What a file-backed bandwidth operation does once it completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FileTask {
    /// The file operation to apply.
    pub kind: FileOperationKind,
    /// File system the files live on.
    pub file_system_id: FileSystemId,
    /// Names of the files affected.
    pub files: Vec<String>,
    /// Destination file system for copies.
    pub destination: Option<FileSystemId>,
}

/// An operation contending for throughput. Removed on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BandwidthOperation {
    /// Unique id.
    pub id: OperationId,
    /// Kind of operation.
    pub operation_type: OperationType,
    /// Total size in megabytes (before the duration multiplier).
    pub size_mb: f64,
    /// Lifecycle status.
    pub status: OperationStatus,
    /// Virtual time the operation was registered.
    pub started_at: DateTime<Utc>,
    /// Network the transfer runs over.
    pub network_id: NetworkId,
    /// Work still to do, in effective megabytes (multiplier applied).
    pub remaining_mb: f64,
    /// Effective throughput of the connection: `min(adapter, network)` in Mbps.
    pub effective_mbps: f64,
    /// Current share of the effective throughput, in Mbps.
    pub share_mbps: f64,
    /// Virtual time up to which progress has been settled.
    pub settled_at: DateTime<Utc>,
    /// Caller label shown in the UI.
    pub label: String,
    /// File effect applied on completion, if any.
    pub task: Option<FileTask>,
}

// ---------------------------------------------------------------------------
// Missions
// ---------------------------------------------------------------------------

/// One step of a mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Objective {
    /// Id unique within the mission (e.g. `"obj-3"`).
    pub id: String,
    /// Kind of step.
    pub objective_type: ObjectiveType,
    /// Completion state.
    pub status: ObjectiveStatus,
    /// Player-facing description.
    pub description: String,
    /// Network the step targets.
    pub network_id: Option<NetworkId>,
    /// Device the step targets.
    pub device_ip: Option<DeviceIp>,
    /// File operation for `FileOperation` steps.
    pub operation: Option<FileOperationKind>,
    /// Files the step targets.
    pub target_files: Vec<String>,
    /// Destination device for copy steps.
    pub destination: Option<DeviceIp>,
}

impl Objective {
    /// Create a pending objective with no targets.
    pub fn new(id: impl Into<String>, objective_type: ObjectiveType, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            objective_type,
            status: ObjectiveStatus::Pending,
            description: description.into(),
            network_id: None,
            device_ip: None,
            operation: None,
            target_files: Vec::new(),
            destination: None,
        }
    }

    /// Whether the objective is complete.
    pub fn is_complete(&self) -> bool {
        self.status == ObjectiveStatus::Complete
    }
}

/// Subject/body pair with `{placeholder}` substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MessageTemplate {
    /// Subject line template.
    pub subject: String,
    /// Body template.
    pub body: String,
}

impl MessageTemplate {
    /// Create a template.
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Substitute `{key}` placeholders, returning `(subject, body)`.
    pub fn render(&self, vars: &[(&str, &str)]) -> (String, String) {
        let mut subject = self.subject.clone();
        let mut body = self.body.clone();
        for (key, value) in vars {
            let token = format!("{{{key}}}");
            subject = subject.replace(&token, value);
            body = body.replace(&token, value);
        }
        (subject, body)
    }
}

/// Applied when a mission succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SuccessConsequence {
    /// Credits paid (normally the payout).
    #[ts(as = "String")]
    pub credits: Decimal,
    /// Reputation tier change.
    pub reputation: i8,
    /// Thank-you message.
    pub message: MessageTemplate,
}

/// Applied when a mission fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FailureConsequence {
    /// Credits charged (zero or negative).
    #[ts(as = "String")]
    pub credits: Decimal,
    /// Reputation tier change (zero or negative).
    pub reputation: i8,
    /// Message variants keyed by failure cause.
    pub messages: BTreeMap<FailureCause, MessageTemplate>,
}

impl FailureConsequence {
    /// The message for `cause`, falling back to the `Incomplete` variant.
    pub fn message_for(&self, cause: FailureCause) -> Option<&MessageTemplate> {
        self.messages
            .get(&cause)
            .or_else(|| self.messages.get(&FailureCause::Incomplete))
    }
}

/// Success and failure consequences of a mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Consequences {
    /// Applied on success.
    pub success: SuccessConsequence,
    /// Applied on failure.
    pub failure: FailureConsequence,
}

/// A generated mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Mission {
    /// Unique id.
    pub id: MissionId,
    /// Client offering the mission.
    pub client_id: ClientId,
    /// Client display name (copied for message rendering).
    pub client_name: String,
    /// Template family.
    pub mission_type: MissionType,
    /// Title shown on the mission board.
    pub title: String,
    /// Difficulty rating.
    pub difficulty: Difficulty,
    /// Credits paid on success.
    #[ts(as = "String")]
    pub payout: Decimal,
    /// Ordered steps; the last one is always a verification step.
    pub objectives: Vec<Objective>,
    /// Networks merged into the registry on acceptance.
    pub networks: Vec<NetworkBlueprint>,
    /// Success/failure consequences.
    pub consequences: Consequences,
    /// Arc this mission belongs to.
    pub arc_id: Option<ArcId>,
    /// Arc display name.
    pub arc_name: Option<String>,
    /// Mission that must be completed before this one is offered.
    pub requires_completed_mission: Option<MissionId>,
    /// Virtual creation time.
    pub created_at: DateTime<Utc>,
    /// Virtual time after which an unaccepted mission is dropped.
    pub expires_at: Option<DateTime<Utc>>,
    /// Minutes allowed after acceptance, if time-limited.
    pub time_limit_minutes: Option<u32>,
    /// Lowest reputation tier the client accepts.
    pub min_reputation: u8,
}

impl Mission {
    /// Whether the mission belongs to an arc.
    pub const fn is_arc(&self) -> bool {
        self.arc_id.is_some()
    }

    /// Whether the mission has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Look up an objective by id.
    pub fn objective(&self, id: &str) -> Option<&Objective> {
        self.objectives.iter().find(|o| o.id == id)
    }

    /// Whether every objective is complete.
    pub fn all_objectives_complete(&self) -> bool {
        self.objectives.iter().all(Objective::is_complete)
    }
}

// ---------------------------------------------------------------------------
// Countdowns, messages, bank
// ---------------------------------------------------------------------------

/// A virtual-time countdown toward a game-ending outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Countdown {
    /// Virtual start time.
    pub start: DateTime<Utc>,
    /// Virtual expiry time.
    pub end: DateTime<Utc>,
    /// Whole seconds left, rounded up; recomputed on every tick.
    pub remaining_secs: u64,
}

impl Countdown {
    /// Start a countdown of `duration` at `start`.
    pub fn new(start: DateTime<Utc>, duration: TimeDelta) -> Self {
        let end = start.checked_add_signed(duration).unwrap_or(start);
        let mut countdown = Self {
            start,
            end,
            remaining_secs: 0,
        };
        countdown.tick(start);
        countdown
    }

    /// Recompute `remaining_secs` at `now` and return it.
    pub fn tick(&mut self, now: DateTime<Utc>) -> u64 {
        let left_ms = self.end.signed_duration_since(now).num_milliseconds();
        let left_ms = u64::try_from(left_ms).unwrap_or(0);
        self.remaining_secs = left_ms.div_ceil(1000);
        self.remaining_secs
    }

    /// Whether the countdown has run out.
    pub const fn is_expired(&self) -> bool {
        self.remaining_secs == 0
    }
}

/// An inbox message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Message {
    /// Unique id.
    pub id: MessageId,
    /// Sender display name.
    pub from: String,
    /// Subject line.
    pub subject: String,
    /// Body text.
    pub body: String,
    /// Virtual delivery time; `None` while still queued.
    pub received_at: Option<DateTime<Utc>>,
    /// Whether the player has opened it.
    pub read: bool,
}

impl Message {
    /// Create an undelivered, unread message.
    pub fn new(from: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            from: from.into(),
            subject: subject.into(),
            body: body.into(),
            received_at: None,
            read: false,
        }
    }
}

/// A bank account held by the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BankAccount {
    /// Account key.
    pub id: AccountId,
    /// Bank display name.
    pub bank_name: String,
    /// Current balance in credits; may be negative.
    #[ts(as = "String")]
    pub balance: Decimal,
}

/// One entry of the append-only transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Transaction {
    /// Unique id.
    pub id: TransactionId,
    /// Account affected.
    pub account_id: AccountId,
    /// Signed amount.
    #[ts(as = "String")]
    pub amount: Decimal,
    /// Human-readable description.
    pub description: String,
    /// Virtual time of the transaction.
    pub timestamp: DateTime<Utc>,
    /// Account balance after the transaction.
    #[ts(as = "String")]
    pub balance_after: Decimal,
}
