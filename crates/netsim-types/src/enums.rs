//! Enumeration types shared across the kernel.
//!
//! Mission, objective, file-operation, bandwidth-operation, outcome and
//! progression enums. Every enum serializes in the casing the browser UI
//! expects (`camelCase` variants for failure causes, `kebab-case` for
//! capabilities, `snake_case` elsewhere).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Missions
// ---------------------------------------------------------------------------

/// The template family a generated mission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MissionType {
    /// Repair corrupted files on a client device.
    Repair,
    /// Copy files from a client device to a backup server.
    Backup,
    /// Move files between two client devices.
    Transfer,
    /// Recover files that were deleted (but not securely).
    Restoration,
    /// Securely wipe files the client wants gone for good.
    SecureDeletion,
    /// Trace an intrusion through device logs, then restore what was taken.
    Investigation,
}

impl MissionType {
    /// Every mission type, in generation-table order.
    pub const ALL: [Self; 6] = [
        Self::Repair,
        Self::Backup,
        Self::Transfer,
        Self::Restoration,
        Self::SecureDeletion,
        Self::Investigation,
    ];

    /// Mission types available without any progression unlock.
    pub const STANDARD: [Self; 5] = [
        Self::Repair,
        Self::Backup,
        Self::Transfer,
        Self::Restoration,
        Self::SecureDeletion,
    ];

    /// Whether this is an investigation-type template.
    pub const fn is_investigation(self) -> bool {
        matches!(self, Self::Investigation)
    }

    /// Short human label used in mission titles.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Repair => "File Repair",
            Self::Backup => "Data Backup",
            Self::Transfer => "File Transfer",
            Self::Restoration => "Data Restoration",
            Self::SecureDeletion => "Secure Deletion",
            Self::Investigation => "Breach Investigation",
        }
    }
}

/// Difficulty rating of a mission; scales payout and file counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Difficulty {
    /// Few files, one device.
    Easy,
    /// Moderate file counts.
    Medium,
    /// Large file sets and tighter time limits.
    Hard,
}

impl Difficulty {
    /// Payout multiplier applied to the client's base rate.
    pub const fn payout_multiplier(self) -> u32 {
        match self {
            Self::Easy => 1,
            Self::Medium => 2,
            Self::Hard => 3,
        }
    }

    /// Inclusive range of target files generated for this difficulty.
    pub const fn file_count_range(self) -> (u32, u32) {
        match self {
            Self::Easy => (2, 4),
            Self::Medium => (4, 7),
            Self::Hard => (7, 12),
        }
    }
}

/// The kind of step an objective asks the player to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ObjectiveType {
    /// Connect to the client network.
    NetworkConnection,
    /// Scan the network to discover its devices.
    NetworkScan,
    /// Open a device's file system.
    FileSystemConnection,
    /// Perform a file operation on the target files.
    FileOperation,
    /// Review a device's audit log (requires investigation tooling).
    LogInvestigation,
    /// Final sign-off; completes once every other objective is complete.
    Verification,
}

/// Completion state of an objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ObjectiveStatus {
    /// Not yet satisfied.
    Pending,
    /// Satisfied; never reverts.
    Complete,
}

/// A file lifecycle operation the player can run against a file system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum FileOperationKind {
    /// Clear the `corrupted` flag.
    Repair,
    /// Copy files to another file system.
    Copy,
    /// Mark files deleted (reversible).
    Delete,
    /// Mark files deleted and securely wiped (irreversible).
    SecureDelete,
    /// Undo a non-secure delete.
    Recover,
}

impl FileOperationKind {
    /// The bandwidth operation type this file operation consumes.
    pub const fn operation_type(self) -> OperationType {
        match self {
            Self::Repair => OperationType::Repair,
            Self::Copy => OperationType::FileTransfer,
            Self::Delete => OperationType::Delete,
            Self::SecureDelete => OperationType::SecureDelete,
            Self::Recover => OperationType::Recovery,
        }
    }
}

/// Why a mission failed. Each cause selects its own failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum FailureCause {
    /// Objectives were left pending (abandoned or out of time).
    Incomplete,
    /// Files the client needed were deleted.
    FilesDeleted,
    /// The client revoked network access mid-mission.
    AccessRevoked,
}

impl FailureCause {
    /// Every failure cause, in message-table order.
    pub const ALL: [Self; 3] = [Self::Incomplete, Self::FilesDeleted, Self::AccessRevoked];
}

/// Final result of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case", tag = "result", content = "cause")]
#[ts(export, export_to = "bindings/")]
pub enum MissionOutcome {
    /// Every objective completed.
    Success,
    /// The mission failed for the given reason.
    Failure(FailureCause),
}

// ---------------------------------------------------------------------------
// Bandwidth
// ---------------------------------------------------------------------------

/// The kind of bandwidth-consuming operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OperationType {
    /// Software download from the portal.
    Download,
    /// Software installation.
    Install,
    /// Network scan.
    Scan,
    /// Deleted-file recovery.
    Recovery,
    /// File repair.
    Repair,
    /// File copy between file systems.
    FileTransfer,
    /// Normal (reversible) delete.
    Delete,
    /// Secure (irreversible) delete.
    SecureDelete,
}

impl OperationType {
    /// Duration multiplier relative to an equivalent normal operation.
    ///
    /// Secure deletion overwrites the data several times and takes five
    /// times as long.
    pub const fn duration_multiplier(self) -> u32 {
        match self {
            Self::SecureDelete => 5,
            Self::Download
            | Self::Install
            | Self::Scan
            | Self::Recovery
            | Self::Repair
            | Self::FileTransfer
            | Self::Delete => 1,
        }
    }
}

/// Lifecycle state of a bandwidth operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum OperationStatus {
    /// Contending for throughput.
    Active,
    /// Finished; about to be removed from the active set.
    Complete,
}

// ---------------------------------------------------------------------------
// Progression and game over
// ---------------------------------------------------------------------------

/// A progression capability unlocked by installing software.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum Capability {
    /// Log viewer and recovery suite; enables investigation missions.
    InvestigationTooling,
}

/// Industry sector of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Industry {
    /// Banks and credit unions.
    Banking,
    /// Clinics and hospitals.
    Healthcare,
    /// Municipal and federal agencies.
    Government,
    /// Schools and universities.
    Education,
    /// Shops and chains.
    Retail,
    /// Power, water, and telecom.
    Utilities,
    /// Law firms.
    Legal,
    /// Newspapers and broadcasters.
    Media,
}

/// Why the game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum GameOverReason {
    /// The bankruptcy countdown expired while still in deep debt.
    Bankruptcy,
    /// The termination countdown expired while at the lowest reputation tier.
    Termination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_secure_delete_is_slower() {
        assert_eq!(OperationType::SecureDelete.duration_multiplier(), 5);
        assert_eq!(OperationType::Delete.duration_multiplier(), 1);
        assert_eq!(OperationType::Download.duration_multiplier(), 1);
    }

    #[test]
    fn failure_cause_uses_camel_case_names() {
        let json = serde_json::to_string(&FailureCause::FilesDeleted).ok();
        assert_eq!(json.as_deref(), Some("\"filesDeleted\""));
    }

    #[test]
    fn capability_uses_kebab_case_name() {
        let json = serde_json::to_string(&Capability::InvestigationTooling).ok();
        assert_eq!(json.as_deref(), Some("\"investigation-tooling\""));
    }

    #[test]
    fn standard_types_exclude_investigation() {
        assert!(MissionType::STANDARD.iter().all(|t| !t.is_investigation()));
        assert!(MissionType::ALL.iter().any(|t| t.is_investigation()));
    }
}
