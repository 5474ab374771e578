//! Procedural mission synthesis.
//!
//! A generated mission bundles everything the kernel needs to run it:
//!
//! - an objective list appropriate to the mission type, always ending in a
//!   verification objective;
//! - one synthetic network whose devices and files match the objectives
//!   (corrupted files for repair, deleted files for restoration, an empty
//!   backup target for backup and transfer, tampered logs for
//!   investigation);
//! - a payout scaled by difficulty;
//! - success and failure consequences, with a failure message per
//!   [`FailureCause`].

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use netsim_types::{
    BYTES_PER_MB, ClientId, Consequences, DeviceBlueprint, DeviceIp, Difficulty,
    FailureCause, FailureConsequence, FileEntry, FileOperationKind, FileSystem, FileSystemId,
    LogEntry, MessageTemplate, Mission, MissionId, MissionType, NetworkBlueprint, NetworkId,
    Objective, ObjectiveType, SuccessConsequence,
};
use rand::Rng;
use rust_decimal::Decimal;
use tracing::debug;

use crate::clients::{Client, ClientRegistry};
use crate::error::MissionError;

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// File stems; a file system never holds more files than this list.
const FILE_STEMS: [&str; 14] = [
    "customer_records",
    "ledger",
    "payroll",
    "inventory",
    "contracts",
    "client_index",
    "audit_trail",
    "quarterly_report",
    "mailbox_archive",
    "config_backup",
    "transactions",
    "schedule",
    "vendor_list",
    "board_minutes",
];

/// File extensions.
const FILE_EXTENSIONS: [&str; 4] = [".db", ".xlsx", ".pdf", ".dat"];

/// Offered link speeds in Mbps.
const NETWORK_SPEEDS: [f64; 5] = [50.0, 100.0, 250.0, 500.0, 1000.0];

/// Untargeted files added next to the targets.
const DECOY_FILES: usize = 2;

/// Objective ids, stable across mission types.
pub mod objective_ids {
    /// Connect to the client network.
    pub const CONNECT: &str = "connect-network";
    /// Scan the client network.
    pub const SCAN: &str = "scan-network";
    /// Open the target file system.
    pub const FILE_SYSTEM: &str = "connect-file-system";
    /// Perform the file operation.
    pub const FILE_OPERATION: &str = "file-operation";
    /// Review the device logs.
    pub const LOGS: &str = "investigate-logs";
    /// Final verification.
    pub const VERIFY: &str = "verify";
}

// ---------------------------------------------------------------------------
// Template selection
// ---------------------------------------------------------------------------

/// Mission type plus difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionTemplate {
    /// What the client wants done.
    pub mission_type: MissionType,
    /// How hard it is.
    pub difficulty: Difficulty,
}

/// Pick a mission template.
///
/// `force_investigation` always yields an investigation; otherwise an
/// investigation is chosen with `investigation_chance`, and a standard type
/// uniformly at random. Difficulty leans harder for higher-tier clients.
pub fn choose_template(
    client: &Client,
    investigation_chance: f64,
    force_investigation: bool,
    rng: &mut impl Rng,
) -> MissionTemplate {
    let investigation = force_investigation
        || (investigation_chance > 0.0 && rng.random_bool(investigation_chance.min(1.0)));
    let mission_type = if investigation {
        MissionType::Investigation
    } else {
        let idx = rng.random_range(0..MissionType::STANDARD.len());
        MissionType::STANDARD
            .get(idx)
            .copied()
            .unwrap_or(MissionType::Repair)
    };

    let roll: u8 = rng.random_range(0..10);
    let difficulty = match client.min_reputation {
        0..=2 if roll < 7 => Difficulty::Easy,
        0..=2 => Difficulty::Medium,
        3..=6 if roll < 3 => Difficulty::Easy,
        3..=6 if roll < 8 => Difficulty::Medium,
        3..=6 => Difficulty::Hard,
        _ if roll < 4 => Difficulty::Medium,
        _ => Difficulty::Hard,
    };

    MissionTemplate {
        mission_type,
        difficulty,
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generate a mission for the client with catalog key `client_id`.
///
/// # Errors
///
/// Returns [`MissionError::UnknownClient`] if the id is not in the catalog.
pub fn generate_mission_for(
    registry: &ClientRegistry,
    client_id: &ClientId,
    template: MissionTemplate,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<Mission, MissionError> {
    let client = registry
        .get(client_id)
        .ok_or_else(|| MissionError::UnknownClient(client_id.clone()))?;
    Ok(generate_mission(&client, template, now, rng))
}

/// Synthesize a complete mission for `client`.
///
/// Expiry is left unset; the pool stamps it for non-arc missions.
pub fn generate_mission(
    client: &Client,
    template: MissionTemplate,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Mission {
    let id = MissionId::new();
    let MissionTemplate {
        mission_type,
        difficulty,
    } = template;

    let tag: u32 = rng.random();
    let network_id = NetworkId::new(format!("{}-{tag:08x}", client.id));
    let octet_b: u8 = rng.random_range(1..=254);
    let octet_c: u8 = rng.random_range(1..=254);
    let subnet = format!("10.{octet_b}.{octet_c}");
    let bandwidth_mbps = NETWORK_SPEEDS
        .get(rng.random_range(0..NETWORK_SPEEDS.len()))
        .copied()
        .unwrap_or(100.0);

    let (min_files, max_files) = difficulty.file_count_range();
    let target_count = usize::try_from(rng.random_range(min_files..=max_files)).unwrap_or(2);
    let files = synthesize_files(target_count, rng);
    let target_names: Vec<String> = files
        .iter()
        .take(target_count)
        .map(|f| f.name.clone())
        .collect();

    let server_ip = DeviceIp::new(format!("{subnet}.10"));
    let server_fs = FileSystemId::new(format!("{network_id}-fs-01"));
    let mut server = DeviceBlueprint {
        ip: server_ip.clone(),
        hostname: format!("{}-srv-01", client.id),
        file_system: FileSystem {
            id: server_fs,
            device_ip: server_ip.clone(),
            files,
        },
        logs: vec![LogEntry {
            action: "boot".to_owned(),
            actor: "system".to_owned(),
            note: "scheduled restart".to_owned(),
            timestamp: shift(now, TimeDelta::hours(-6)),
        }],
    };

    let mut devices = Vec::new();
    let mut destination = None;
    let operation = match mission_type {
        MissionType::Repair => {
            mark_targets(&mut server.file_system, target_count, |file| {
                file.corrupted = true;
            });
            Some(FileOperationKind::Repair)
        }
        MissionType::Restoration => {
            mark_targets(&mut server.file_system, target_count, |file| {
                file.deleted = true;
                file.deleted_at = Some(shift(now, TimeDelta::hours(-2)));
            });
            Some(FileOperationKind::Recover)
        }
        MissionType::SecureDeletion => Some(FileOperationKind::SecureDelete),
        MissionType::Backup | MissionType::Transfer => {
            let (host, octet) = if mission_type == MissionType::Backup {
                ("bak", 20)
            } else {
                ("archive", 30)
            };
            let ip = DeviceIp::new(format!("{subnet}.{octet}"));
            destination = Some(ip.clone());
            devices.push(DeviceBlueprint {
                ip: ip.clone(),
                hostname: format!("{}-{host}-01", client.id),
                file_system: FileSystem {
                    id: FileSystemId::new(format!("{network_id}-fs-02")),
                    device_ip: ip,
                    files: Vec::new(),
                },
                logs: Vec::new(),
            });
            Some(FileOperationKind::Copy)
        }
        MissionType::Investigation => {
            server.logs.extend(tampered_logs(now, rng));
            None
        }
    };
    devices.insert(0, server);

    let mut objectives = vec![
        Objective {
            network_id: Some(network_id.clone()),
            ..Objective::new(
                objective_ids::CONNECT,
                ObjectiveType::NetworkConnection,
                format!("Connect to the {} network", client.name),
            )
        },
        Objective {
            network_id: Some(network_id.clone()),
            ..Objective::new(
                objective_ids::SCAN,
                ObjectiveType::NetworkScan,
                "Scan the network for devices",
            )
        },
    ];
    if let Some(kind) = operation {
        objectives.push(Objective {
            device_ip: Some(server_ip.clone()),
            network_id: Some(network_id.clone()),
            ..Objective::new(
                objective_ids::FILE_SYSTEM,
                ObjectiveType::FileSystemConnection,
                format!("Open the file system on {server_ip}"),
            )
        });
        objectives.push(Objective {
            device_ip: Some(server_ip.clone()),
            network_id: Some(network_id.clone()),
            operation: Some(kind),
            target_files: target_names.clone(),
            destination: destination.clone(),
            ..Objective::new(
                objective_ids::FILE_OPERATION,
                ObjectiveType::FileOperation,
                operation_description(kind, target_names.len()),
            )
        });
    } else {
        objectives.push(Objective {
            device_ip: Some(server_ip.clone()),
            network_id: Some(network_id.clone()),
            ..Objective::new(
                objective_ids::LOGS,
                ObjectiveType::LogInvestigation,
                format!("Review the access logs on {server_ip}"),
            )
        });
    }
    objectives.push(Objective::new(
        objective_ids::VERIFY,
        ObjectiveType::Verification,
        "Verify the work with the client",
    ));

    let payout = payout_for(mission_type, difficulty, target_names.len());
    let consequences = consequences_for(client, payout);
    let time_limit_minutes = (difficulty == Difficulty::Hard).then(|| rng.random_range(20..=40));
    let title = format!("{} for {}", mission_type.label(), client.name);

    debug!(
        mission_id = %id,
        client = %client.id,
        ?mission_type,
        ?difficulty,
        payout = %payout,
        "mission generated"
    );

    Mission {
        id,
        client_id: client.id.clone(),
        client_name: client.name.clone(),
        mission_type,
        title,
        difficulty,
        payout,
        objectives,
        networks: vec![NetworkBlueprint {
            network_id,
            name: format!("{} LAN", client.name),
            address: format!("{subnet}.0/24"),
            bandwidth_mbps,
            devices,
        }],
        consequences,
        arc_id: None,
        arc_name: None,
        requires_completed_mission: None,
        created_at: now,
        expires_at: None,
        time_limit_minutes,
        min_reputation: client.min_reputation,
    }
}

/// `target_count` targets followed by decoys, with unique names.
fn synthesize_files(target_count: usize, rng: &mut impl Rng) -> Vec<FileEntry> {
    let total = target_count.saturating_add(DECOY_FILES).min(FILE_STEMS.len());
    let offset = rng.random_range(0..FILE_STEMS.len());
    (0..total)
        .filter_map(|i| {
            let slot = offset.wrapping_add(i).checked_rem(FILE_STEMS.len())?;
            let stem = FILE_STEMS.get(slot)?;
            let ext = FILE_EXTENSIONS.get(rng.random_range(0..FILE_EXTENSIONS.len()))?;
            let size_mb: u64 = rng.random_range(1..=50);
            Some(FileEntry::new(
                format!("{stem}{ext}"),
                size_mb.saturating_mul(BYTES_PER_MB),
            ))
        })
        .collect()
}

/// `at + delta`, saturating to `at` on overflow.
fn shift(at: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    at.checked_add_signed(delta).unwrap_or(at)
}

/// Apply `mark` to the first `count` files.
fn mark_targets(fs: &mut FileSystem, count: usize, mark: impl Fn(&mut FileEntry)) {
    fs.files.iter_mut().take(count).for_each(mark);
}

/// Suspicious entries seeded on an investigation device.
fn tampered_logs(now: DateTime<Utc>, rng: &mut impl Rng) -> Vec<LogEntry> {
    let hours_ago: i64 = rng.random_range(1..=12);
    let at = shift(now, TimeDelta::hours(-hours_ago));
    vec![
        LogEntry {
            action: "login".to_owned(),
            actor: "admin".to_owned(),
            note: "login from unrecognized address 203.0.113.7".to_owned(),
            timestamp: at,
        },
        LogEntry {
            action: "file_delete".to_owned(),
            actor: "admin".to_owned(),
            note: "bulk delete of archived records".to_owned(),
            timestamp: shift(at, TimeDelta::minutes(4)),
        },
        LogEntry {
            action: "log_clear".to_owned(),
            actor: "admin".to_owned(),
            note: "security log cleared".to_owned(),
            timestamp: shift(at, TimeDelta::minutes(6)),
        },
    ]
}

fn operation_description(kind: FileOperationKind, count: usize) -> String {
    let verb = match kind {
        FileOperationKind::Repair => "Repair",
        FileOperationKind::Copy => "Copy",
        FileOperationKind::Delete => "Delete",
        FileOperationKind::SecureDelete => "Securely delete",
        FileOperationKind::Recover => "Recover",
    };
    format!("{verb} {count} target file(s)")
}

/// Base payout per mission type plus a per-file bonus, times the
/// difficulty multiplier.
pub fn payout_for(mission_type: MissionType, difficulty: Difficulty, files: usize) -> Decimal {
    let base: u32 = match mission_type {
        MissionType::Repair => 1200,
        MissionType::Backup => 1000,
        MissionType::Transfer => 900,
        MissionType::Restoration => 1500,
        MissionType::SecureDeletion => 1300,
        MissionType::Investigation => 2000,
    };
    let per_file = u32::try_from(files).unwrap_or(0).saturating_mul(50);
    let units = base
        .saturating_add(per_file)
        .saturating_mul(difficulty.payout_multiplier());
    Decimal::from(units)
}

/// Success pays `payout` and +1 reputation; failure costs a quarter of it
/// and -1 reputation, with a message per failure cause.
fn consequences_for(client: &Client, payout: Decimal) -> Consequences {
    let penalty = payout
        .checked_div(Decimal::from(4))
        .map(|p| p.round_dp(0))
        .and_then(|p| Decimal::ZERO.checked_sub(p))
        .unwrap_or(Decimal::ZERO);

    let mut messages = BTreeMap::new();
    messages.insert(
        FailureCause::Incomplete,
        MessageTemplate::new(
            "Contract not completed",
            "{contact} at {client}: the work on \"{mission}\" was not finished. \
             We will be looking elsewhere.",
        ),
    );
    messages.insert(
        FailureCause::FilesDeleted,
        MessageTemplate::new(
            "You destroyed our data",
            "{contact} at {client}: files we needed were deleted during \"{mission}\". \
             Expect to hear from our lawyers.",
        ),
    );
    messages.insert(
        FailureCause::AccessRevoked,
        MessageTemplate::new(
            "Access withdrawn",
            "{contact} at {client}: we have revoked your access and cancelled \"{mission}\".",
        ),
    );

    Consequences {
        success: SuccessConsequence {
            credits: payout,
            reputation: 1,
            message: MessageTemplate::new(
                "Payment sent",
                format!(
                    "{{contact}} at {{client}}: thank you for completing \"{{mission}}\". \
                     {payout} credits have been transferred to your account."
                ),
            ),
        },
        failure: FailureConsequence {
            credits: penalty,
            reputation: -1,
            messages,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 25, 9, 0, 0).single().unwrap()
    }

    fn client() -> Client {
        ClientRegistry::standard().all()[0].clone()
    }

    fn generate(mission_type: MissionType, difficulty: Difficulty, seed: u64) -> Mission {
        let mut rng = SmallRng::seed_from_u64(seed);
        generate_mission(
            &client(),
            MissionTemplate {
                mission_type,
                difficulty,
            },
            now(),
            &mut rng,
        )
    }

    #[test]
    fn every_type_ends_in_verification() {
        for (i, mission_type) in MissionType::ALL.into_iter().enumerate() {
            let mission = generate(mission_type, Difficulty::Medium, i as u64);
            let last = mission.objectives.last().unwrap();
            assert_eq!(last.objective_type, ObjectiveType::Verification);
            assert_eq!(mission.networks.len(), 1);
        }
    }

    #[test]
    fn repair_missions_carry_corrupted_targets() {
        let mission = generate(MissionType::Repair, Difficulty::Easy, 11);
        let op = mission.objective(objective_ids::FILE_OPERATION).unwrap();
        let fs = &mission.networks[0].devices[0].file_system;
        assert!(!op.target_files.is_empty());
        for name in &op.target_files {
            assert!(fs.file(name).unwrap().corrupted);
        }
        // Decoys stay intact.
        assert_eq!(
            fs.files.iter().filter(|f| f.is_intact()).count(),
            fs.files.len() - op.target_files.len()
        );
    }

    #[test]
    fn restoration_targets_are_recoverably_deleted() {
        let mission = generate(MissionType::Restoration, Difficulty::Easy, 5);
        let op = mission.objective(objective_ids::FILE_OPERATION).unwrap();
        let fs = &mission.networks[0].devices[0].file_system;
        for name in &op.target_files {
            let file = fs.file(name).unwrap();
            assert!(file.deleted && !file.secure_deleted);
        }
    }

    #[test]
    fn backup_missions_have_an_empty_destination() {
        let mission = generate(MissionType::Backup, Difficulty::Easy, 9);
        let op = mission.objective(objective_ids::FILE_OPERATION).unwrap();
        let dest = op.destination.clone().unwrap();
        let dest_device = mission.networks[0]
            .devices
            .iter()
            .find(|d| d.ip == dest)
            .unwrap();
        assert!(dest_device.file_system.files.is_empty());
    }

    #[test]
    fn investigation_uses_log_objective() {
        let mission = generate(MissionType::Investigation, Difficulty::Hard, 2);
        assert!(mission.objective(objective_ids::LOGS).is_some());
        assert!(mission.objective(objective_ids::FILE_OPERATION).is_none());
        assert!(mission.networks[0].devices[0].logs.len() > 1);
        assert!(mission.time_limit_minutes.is_some());
    }

    #[test]
    fn payout_scales_with_difficulty() {
        let easy = payout_for(MissionType::Repair, Difficulty::Easy, 2);
        let hard = payout_for(MissionType::Repair, Difficulty::Hard, 2);
        assert_eq!(easy, Decimal::from(1300));
        assert_eq!(hard, Decimal::from(3900));
    }

    #[test]
    fn failure_messages_cover_every_cause() {
        let mission = generate(MissionType::SecureDeletion, Difficulty::Medium, 4);
        for cause in FailureCause::ALL {
            assert!(mission.consequences.failure.message_for(cause).is_some());
        }
        assert!(mission.consequences.failure.credits < Decimal::ZERO);
        assert_eq!(mission.consequences.success.credits, mission.payout);
    }

    #[test]
    fn forced_investigation_wins_over_chance() {
        let mut rng = SmallRng::seed_from_u64(1);
        let template = choose_template(&client(), 0.0, true, &mut rng);
        assert_eq!(template.mission_type, MissionType::Investigation);
        for _ in 0..50 {
            let template = choose_template(&client(), 0.0, false, &mut rng);
            assert!(!template.mission_type.is_investigation());
        }
    }

    #[test]
    fn unknown_client_is_an_error() {
        let mut rng = SmallRng::seed_from_u64(1);
        let result = generate_mission_for(
            &ClientRegistry::standard(),
            &ClientId::new("nobody"),
            MissionTemplate {
                mission_type: MissionType::Repair,
                difficulty: Difficulty::Easy,
            },
            now(),
            &mut rng,
        );
        assert!(matches!(result, Err(MissionError::UnknownClient(_))));
    }
}
