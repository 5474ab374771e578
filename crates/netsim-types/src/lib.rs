//! Shared type definitions for the Netsim kernel.
//!
//! This crate is the single source of truth for the data model shared by
//! the registry, bandwidth allocator, mission pool, economy and session
//! crates. Types flow downstream to `TypeScript` via `ts-rs` for the
//! browser desktop UI, which only ever reads these shapes.
//!
//! # Modules
//!
//! - [`ids`] -- Typed identifiers (UUID v7 ids and string catalog keys)
//! - [`enums`] -- Mission, objective, operation, outcome and progression enums
//! - [`structs`] -- Registry entities, missions, countdowns, messages, bank records

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    Capability, Difficulty, FailureCause, FileOperationKind, GameOverReason, Industry,
    MissionOutcome, MissionType, ObjectiveStatus, ObjectiveType, OperationStatus, OperationType,
};
pub use ids::{
    AccountId, ArcId, ClientId, DeviceIp, FileSystemId, MessageId, MissionId, NetworkId,
    OperationId, TransactionId,
};
pub use structs::{
    BYTES_PER_MB, BandwidthOperation, BankAccount, Consequences, Countdown, Device,
    DeviceBlueprint, FailureConsequence, FileEntry, FileSystem, FileTask, LogEntry, Message,
    MessageTemplate, Mission, Network, NetworkBlueprint, Objective, SuccessConsequence,
    Transaction,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the UI collaborator.

    #[test]
    fn export_bindings() {
        // ts-rs writes a `.ts` file per type into `bindings/` when
        // `export_all` is called.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::MissionId::export_all();
        let _ = crate::ids::ArcId::export_all();
        let _ = crate::ids::OperationId::export_all();
        let _ = crate::ids::MessageId::export_all();
        let _ = crate::ids::TransactionId::export_all();
        let _ = crate::ids::NetworkId::export_all();
        let _ = crate::ids::DeviceIp::export_all();
        let _ = crate::ids::FileSystemId::export_all();
        let _ = crate::ids::ClientId::export_all();
        let _ = crate::ids::AccountId::export_all();

        // Enums
        let _ = crate::enums::MissionType::export_all();
        let _ = crate::enums::Difficulty::export_all();
        let _ = crate::enums::ObjectiveType::export_all();
        let _ = crate::enums::ObjectiveStatus::export_all();
        let _ = crate::enums::FileOperationKind::export_all();
        let _ = crate::enums::FailureCause::export_all();
        let _ = crate::enums::MissionOutcome::export_all();
        let _ = crate::enums::OperationType::export_all();
        let _ = crate::enums::OperationStatus::export_all();
        let _ = crate::enums::Capability::export_all();
        let _ = crate::enums::Industry::export_all();
        let _ = crate::enums::GameOverReason::export_all();

        // Structs
        let _ = crate::structs::LogEntry::export_all();
        let _ = crate::structs::Network::export_all();
        let _ = crate::structs::Device::export_all();
        let _ = crate::structs::FileEntry::export_all();
        let _ = crate::structs::FileSystem::export_all();
        let _ = crate::structs::DeviceBlueprint::export_all();
        let _ = crate::structs::NetworkBlueprint::export_all();
        let _ = crate::structs::FileTask::export_all();
        let _ = crate::structs::BandwidthOperation::export_all();
        let _ = crate::structs::Objective::export_all();
        let _ = crate::structs::MessageTemplate::export_all();
        let _ = crate::structs::SuccessConsequence::export_all();
        let _ = crate::structs::FailureConsequence::export_all();
        let _ = crate::structs::Consequences::export_all();
        let _ = crate::structs::Mission::export_all();
        let _ = crate::structs::Countdown::export_all();
        let _ = crate::structs::Message::export_all();
        let _ = crate::structs::BankAccount::export_all();
        let _ = crate::structs::Transaction::export_all();
    }
}
