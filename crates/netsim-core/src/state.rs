//! Persistent records owned by the session.
//!
//! These are plain data: the session mutates them, the save state carries
//! them, and the observer serializes them for the UI.

use chrono::{DateTime, Utc};
use netsim_types::{
    Capability, ClientId, FailureCause, Mission, MissionId, MissionOutcome, NetworkId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The mission the player is working on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveMission {
    /// The accepted mission, objectives updated in place.
    pub mission: Mission,
    /// Virtual acceptance time.
    pub accepted_at: DateTime<Utc>,
    /// Time-limit expiry, if the mission has one.
    pub deadline: Option<DateTime<Utc>>,
}

/// A finished mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionRecord {
    /// The mission.
    pub mission_id: MissionId,
    /// Its title.
    pub title: String,
    /// Commissioning client.
    pub client_id: ClientId,
    /// How it ended.
    pub outcome: MissionOutcome,
    /// Virtual finalization time.
    pub finished_at: DateTime<Utc>,
    /// Credits posted.
    pub credits: Decimal,
    /// Reputation delta applied.
    pub reputation_delta: i8,
}

/// What a bandwidth operation does when it completes, beyond its file task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "purpose", rename_all = "snake_case")]
pub enum OperationPurpose {
    /// A network scan.
    Scan {
        /// Network being scanned.
        network_id: NetworkId,
    },
    /// A file operation; the effect travels in the operation's task.
    File,
    /// A software download that installs a capability.
    Install {
        /// Capability unlocked on completion.
        capability: Capability,
    },
    /// A caller-defined transfer with no side effect.
    Transfer,
}

/// A failure scripted to hit a mission at a virtual instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedFailure {
    /// Target mission.
    pub mission_id: MissionId,
    /// Why it fails.
    pub cause: FailureCause,
    /// Virtual instant the failure fires.
    pub due_at: DateTime<Utc>,
}

/// Hardware and software inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    /// Local network adapter speed in Mbps.
    pub adapter_mbps: f64,
    /// Installed capabilities.
    pub capabilities: std::collections::BTreeSet<Capability>,
}

impl Inventory {
    /// Whether `capability` is installed.
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
