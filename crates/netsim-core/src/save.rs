//! Persisted session state.
//!
//! [`SaveState`] carries every logical field a session needs to resume:
//! identity, the virtual clock, inventory, bank and countdowns, inbox and
//! queued messages, the registry, in-flight bandwidth operations, the
//! mission pool, finalized missions and fired one-shot events. Pending
//! timers are not stored; the session re-derives them on restore.
//!
//! JSON is only a carrier here. The format version guards against loading
//! a save written by an incompatible kernel.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use netsim_economy::{EconomySnapshot, MessageQueue};
use netsim_missions::MissionPool;
use netsim_network::NetworkRegistry;
use netsim_types::{
    BandwidthOperation, GameOverReason, Message, MissionId, NetworkId, OperationId,
};
use serde::{Deserialize, Serialize};

use crate::state::{ActiveMission, Inventory, MissionRecord, OperationPurpose, ScriptedFailure};

/// Current save format version.
pub const SAVE_VERSION: u32 = 1;

/// Errors that can occur when encoding or decoding a save.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// The JSON could not be encoded or decoded.
    #[error("save serialization failed: {source}")]
    Json {
        /// The underlying `serde_json` error.
        #[from]
        source: serde_json::Error,
    },

    /// The save was written by an incompatible version.
    #[error("unsupported save version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the save.
        found: u32,
        /// Version this kernel writes.
        expected: u32,
    },
}

/// Clock position at save time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockState {
    /// Virtual instant.
    pub now: DateTime<Utc>,
    /// Speed multiplier.
    pub speed: u32,
    /// Whether the clock was paused.
    pub paused: bool,
}

/// A complete, resumable session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    /// Format version.
    pub version: u32,
    /// Player username.
    pub username: String,
    /// Player mail address.
    pub mail_id: String,
    /// Session seed.
    pub seed: u64,
    /// Virtual clock.
    pub clock: ClockState,
    /// Hardware and software.
    pub inventory: Inventory,
    /// Bank, tier, countdowns and notice latch.
    pub economy: EconomySnapshot,
    /// Delivered messages, oldest first.
    pub inbox: Vec<Message>,
    /// Messages waiting for their delivery slot.
    pub message_queue: MessageQueue,
    /// Networks, devices and file systems.
    pub registry: NetworkRegistry,
    /// Networks the player is connected to.
    pub connections: BTreeSet<NetworkId>,
    /// In-flight bandwidth operations.
    pub operations: Vec<BandwidthOperation>,
    /// Completion side effects per operation.
    pub operation_purposes: BTreeMap<OperationId, OperationPurpose>,
    /// Offered missions, pending arcs, cooldowns.
    pub pool: MissionPool,
    /// Mission in progress.
    pub active_mission: Option<ActiveMission>,
    /// Finished missions, oldest first.
    pub mission_history: Vec<MissionRecord>,
    /// Missions whose consequences were applied.
    pub finalized_missions: BTreeSet<MissionId>,
    /// Scripted failures still pending.
    pub scripted_failures: Vec<ScriptedFailure>,
    /// One-shot story events already fired.
    pub fired_events: BTreeSet<String>,
    /// Why the session ended, if it did.
    pub game_over: Option<GameOverReason>,
}

impl SaveState {
    /// Encode as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Json`] if encoding fails.
    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from JSON, rejecting unknown versions.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::UnsupportedVersion`] for another format version
    /// and [`SaveError::Json`] for malformed input.
    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        #[derive(Deserialize)]
        struct VersionProbe {
            version: u32,
        }

        let probe: VersionProbe = serde_json::from_str(json)?;
        if probe.version != SAVE_VERSION {
            return Err(SaveError::UnsupportedVersion {
                found: probe.version,
                expected: SAVE_VERSION,
            });
        }
        Ok(serde_json::from_str(json)?)
    }
}
