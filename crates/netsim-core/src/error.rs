//! Error types for session operations.

use netsim_economy::EconomyError;
use netsim_network::NetworkError;
use netsim_types::{
    Capability, DeviceIp, FileSystemId, GameOverReason, MissionId, NetworkId, OperationId,
};

use crate::clock::ClockError;
use crate::config::ConfigError;
use crate::save::SaveError;

/// Errors returned by [`crate::Session`] operations.
///
/// Every variant describes caller misuse or a state the caller must check
/// first; none of them leaves the session half-updated.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session has ended.
    #[error("the game is over ({0:?})")]
    GameOver(GameOverReason),

    /// Clock operation failed.
    #[error("clock error: {0}")]
    Clock(#[from] ClockError),

    /// Configuration could not be used.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Bandwidth registration failed.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// A bank operation failed.
    #[error("economy error: {0}")]
    Economy(#[from] EconomyError),

    /// A save could not be encoded, decoded or restored.
    #[error("save error: {0}")]
    Save(#[from] SaveError),

    /// The mission is not currently offered.
    #[error("mission {0} is not offered in the pool")]
    MissionNotOffered(MissionId),

    /// Another mission is already in progress.
    #[error("mission {0} is already in progress")]
    MissionAlreadyActive(MissionId),

    /// No mission is in progress.
    #[error("no mission is in progress")]
    NoActiveMission,

    /// The mission is neither active nor finalized.
    #[error("mission {0} is not the active mission")]
    MissionNotActive(MissionId),

    /// The player's tier is too low for the client.
    #[error("reputation tier {current} is below the required tier {required}")]
    InsufficientReputation {
        /// Tier the client requires.
        required: u8,
        /// Player's tier.
        current: u8,
    },

    /// An arc mission's predecessor has not been completed.
    #[error("mission {mission_id} requires mission {requires} to be completed first")]
    PrerequisiteIncomplete {
        /// The gated mission.
        mission_id: MissionId,
        /// Its prerequisite.
        requires: MissionId,
    },

    /// No network with this id is known.
    #[error("unknown network: {0}")]
    UnknownNetwork(NetworkId),

    /// No device with this address is known.
    #[error("unknown device: {0}")]
    UnknownDevice(DeviceIp),

    /// No file system with this id is known.
    #[error("unknown file system: {0}")]
    UnknownFileSystem(FileSystemId),

    /// The device exposes no file system.
    #[error("device {0} has no file system")]
    NoFileSystem(DeviceIp),

    /// The file does not exist on the file system.
    #[error("file '{name}' not found on {file_system_id}")]
    UnknownFile {
        /// File system searched.
        file_system_id: FileSystemId,
        /// Missing file name.
        name: String,
    },

    /// No active bandwidth operation has this id.
    #[error("unknown operation: {0}")]
    UnknownOperation(OperationId),

    /// Access to the network is revoked or was never granted.
    #[error("access to network {0} is denied")]
    AccessDenied(NetworkId),

    /// The player is not connected to the network.
    #[error("not connected to network {0}")]
    NotConnected(NetworkId),

    /// The operation needs software the player has not installed.
    #[error("missing capability: {0:?}")]
    MissingCapability(Capability),

    /// A copy needs a destination file system.
    #[error("copy operations need a destination file system")]
    MissingDestination,
}
