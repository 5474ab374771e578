//! The canonical store of networks, devices and file systems.
//!
//! [`NetworkRegistry`] is the registry every other subsystem reads and
//! writes. It is constructed once per session and passed by reference; no
//! global instance exists.
//!
//! # Invariants
//!
//! - Upserts are idempotent: registering an entity with an existing key
//!   overwrites it, otherwise inserts it.
//! - Revoking a network cascades `accessible = false` to every device on it.
//!   File contents and logs are never touched by access control.
//! - `secure_deleted` is one-way. A plain delete is reversible by
//!   [`NetworkRegistry::recover_file`]; a secure delete is not.
//! - Read accessors never mutate.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use netsim_types::{
    Device, DeviceIp, FileEntry, FileSystem, FileSystemId, LogEntry, Network, NetworkBlueprint,
    NetworkId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Result of a file lifecycle operation.
///
/// Only [`FileChange::Applied`] means the registry was mutated; the other
/// variants are harmless no-ops reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChange {
    /// The file was changed.
    Applied,
    /// The file was already in the requested state.
    Unchanged,
    /// The file system or file does not exist.
    Missing,
    /// The change is impossible because the file was securely deleted.
    Irreversible,
}

impl FileChange {
    /// Whether the registry was mutated.
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Counts reported by [`NetworkRegistry::merge_blueprints`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Networks inserted or updated.
    pub networks: usize,
    /// Devices inserted or updated.
    pub devices: usize,
    /// File systems inserted or replaced.
    pub file_systems: usize,
}

/// Registry of every network, device and file system known to the player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkRegistry {
    /// Networks keyed by id.
    networks: BTreeMap<NetworkId, Network>,
    /// Devices keyed by IP.
    devices: BTreeMap<DeviceIp, Device>,
    /// File systems keyed by id.
    file_systems: BTreeMap<FileSystemId, FileSystem>,
}

impl NetworkRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            networks: BTreeMap::new(),
            devices: BTreeMap::new(),
            file_systems: BTreeMap::new(),
        }
    }

    // -------------------------------------------------------------------
    // Upserts
    // -------------------------------------------------------------------

    /// Insert or overwrite a network. Returns the previous value.
    pub fn register_network(&mut self, network: Network) -> Option<Network> {
        debug!(network_id = %network.network_id, "network registered");
        self.networks.insert(network.network_id.clone(), network)
    }

    /// Insert or overwrite a device. Returns the previous value.
    pub fn register_device(&mut self, device: Device) -> Option<Device> {
        debug!(ip = %device.ip, network_id = %device.network_id, "device registered");
        self.devices.insert(device.ip.clone(), device)
    }

    /// Insert or overwrite a file system. Returns the previous value.
    pub fn register_file_system(&mut self, file_system: FileSystem) -> Option<FileSystem> {
        debug!(file_system_id = %file_system.id, "file system registered");
        self.file_systems
            .insert(file_system.id.clone(), file_system)
    }

    /// Merge mission network blueprints into the registry.
    ///
    /// Networks are upserted and granted (the mission bundles credentials).
    /// An existing network keeps its audit log. Devices are upserted with
    /// `accessible = true`, keeping any existing log entries and appending
    /// the blueprint's seeded entries. File systems are replaced by id if
    /// present and inserted otherwise.
    pub fn merge_blueprints(&mut self, blueprints: &[NetworkBlueprint]) -> MergeSummary {
        let mut summary = MergeSummary::default();

        for blueprint in blueprints {
            let logs = self
                .networks
                .get(&blueprint.network_id)
                .map(|existing| existing.logs.clone())
                .unwrap_or_default();
            self.networks.insert(
                blueprint.network_id.clone(),
                Network {
                    network_id: blueprint.network_id.clone(),
                    name: blueprint.name.clone(),
                    address: blueprint.address.clone(),
                    bandwidth_mbps: blueprint.bandwidth_mbps,
                    accessible: true,
                    revoked_reason: None,
                    logs,
                },
            );
            summary.networks = summary.networks.saturating_add(1);

            for device_bp in &blueprint.devices {
                let mut logs = self
                    .devices
                    .get(&device_bp.ip)
                    .map(|existing| existing.logs.clone())
                    .unwrap_or_default();
                logs.extend(device_bp.logs.iter().cloned());

                self.devices.insert(
                    device_bp.ip.clone(),
                    Device {
                        ip: device_bp.ip.clone(),
                        hostname: device_bp.hostname.clone(),
                        network_id: blueprint.network_id.clone(),
                        accessible: true,
                        file_system_id: Some(device_bp.file_system.id.clone()),
                        logs,
                    },
                );
                summary.devices = summary.devices.saturating_add(1);

                self.file_systems.insert(
                    device_bp.file_system.id.clone(),
                    device_bp.file_system.clone(),
                );
                summary.file_systems = summary.file_systems.saturating_add(1);
            }
        }

        info!(
            networks = summary.networks,
            devices = summary.devices,
            file_systems = summary.file_systems,
            "mission networks merged into registry"
        );
        summary
    }

    // -------------------------------------------------------------------
    // Read accessors
    // -------------------------------------------------------------------

    /// Look up a network.
    pub fn get_network(&self, id: &NetworkId) -> Option<&Network> {
        self.networks.get(id)
    }

    /// Look up a device.
    pub fn get_device(&self, ip: &DeviceIp) -> Option<&Device> {
        self.devices.get(ip)
    }

    /// Look up a file system.
    pub fn get_file_system(&self, id: &FileSystemId) -> Option<&FileSystem> {
        self.file_systems.get(id)
    }

    /// The file system mounted on a device.
    pub fn file_system_for_device(&self, ip: &DeviceIp) -> Option<&FileSystem> {
        self.devices
            .get(ip)
            .and_then(|device| device.file_system_id.as_ref())
            .and_then(|fs_id| self.file_systems.get(fs_id))
    }

    /// Every device on a network, ordered by IP.
    pub fn get_devices_by_network(&self, id: &NetworkId) -> Vec<&Device> {
        self.devices
            .values()
            .filter(|device| &device.network_id == id)
            .collect()
    }

    /// Every known network, ordered by id.
    pub fn get_known_networks(&self) -> Vec<&Network> {
        self.networks.values().collect()
    }

    /// Number of registered networks.
    pub fn network_count(&self) -> usize {
        self.networks.len()
    }

    /// Number of registered devices.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    // -------------------------------------------------------------------
    // Access control
    // -------------------------------------------------------------------

    /// Revoke access to a network and cascade to its devices.
    ///
    /// Returns the number of devices cascaded, or `None` if the network is
    /// unknown. A network with no devices is revoked and returns `Some(0)`.
    pub fn revoke_network_access(
        &mut self,
        id: &NetworkId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Option<usize> {
        let network = self.networks.get_mut(id)?;
        network.accessible = false;
        network.revoked_reason = Some(reason.to_owned());
        network.logs.push(LogEntry {
            action: "access_revoked".to_owned(),
            actor: "system".to_owned(),
            note: reason.to_owned(),
            timestamp: now,
        });

        let cascaded = self.set_device_access(id, false);
        info!(network_id = %id, reason, devices = cascaded, "network access revoked");
        Some(cascaded)
    }

    /// Restore access to a network and its devices, clearing the reason.
    ///
    /// Returns the number of devices cascaded, or `None` if the network is
    /// unknown.
    pub fn grant_network_access(&mut self, id: &NetworkId, now: DateTime<Utc>) -> Option<usize> {
        let network = self.networks.get_mut(id)?;
        network.accessible = true;
        network.revoked_reason = None;
        network.logs.push(LogEntry {
            action: "access_granted".to_owned(),
            actor: "system".to_owned(),
            note: String::new(),
            timestamp: now,
        });

        let cascaded = self.set_device_access(id, true);
        info!(network_id = %id, devices = cascaded, "network access granted");
        Some(cascaded)
    }

    /// Set the stored access flag of every device on `id`.
    fn set_device_access(&mut self, id: &NetworkId, accessible: bool) -> usize {
        let mut count: usize = 0;
        for device in self.devices.values_mut().filter(|d| &d.network_id == id) {
            device.accessible = accessible;
            count = count.saturating_add(1);
        }
        count
    }

    // -------------------------------------------------------------------
    // Audit logs
    // -------------------------------------------------------------------

    /// Append an entry to a device's log. Returns `false` for unknown devices.
    pub fn add_device_log(&mut self, ip: &DeviceIp, entry: LogEntry) -> bool {
        self.devices.get_mut(ip).is_some_and(|device| {
            device.logs.push(entry);
            true
        })
    }

    /// Append an entry to a network's log. Returns `false` for unknown networks.
    pub fn add_network_log(&mut self, id: &NetworkId, entry: LogEntry) -> bool {
        self.networks.get_mut(id).is_some_and(|network| {
            network.logs.push(entry);
            true
        })
    }

    // -------------------------------------------------------------------
    // File lifecycle
    // -------------------------------------------------------------------

    /// Mark a file deleted. Deleting a deleted file is a no-op.
    pub fn delete_file(&mut self, fs: &FileSystemId, name: &str, now: DateTime<Utc>) -> FileChange {
        self.with_file(fs, name, |file| {
            if file.deleted {
                return FileChange::Unchanged;
            }
            file.deleted = true;
            file.deleted_at = Some(now);
            FileChange::Applied
        })
    }

    /// Mark a file deleted and securely wiped. Irreversible.
    pub fn secure_delete_file(
        &mut self,
        fs: &FileSystemId,
        name: &str,
        now: DateTime<Utc>,
    ) -> FileChange {
        self.with_file(fs, name, |file| {
            if file.secure_deleted {
                return FileChange::Unchanged;
            }
            file.deleted = true;
            file.secure_deleted = true;
            if file.deleted_at.is_none() {
                file.deleted_at = Some(now);
            }
            FileChange::Applied
        })
    }

    /// Undo a plain delete. Securely deleted files stay deleted.
    pub fn recover_file(&mut self, fs: &FileSystemId, name: &str) -> FileChange {
        self.with_file(fs, name, |file| {
            if file.secure_deleted {
                return FileChange::Irreversible;
            }
            if !file.deleted {
                return FileChange::Unchanged;
            }
            file.deleted = false;
            file.deleted_at = None;
            FileChange::Applied
        })
    }

    /// Clear a file's corruption. Deleted files cannot be repaired.
    pub fn repair_file(&mut self, fs: &FileSystemId, name: &str) -> FileChange {
        self.with_file(fs, name, |file| {
            if file.secure_deleted {
                return FileChange::Irreversible;
            }
            if file.deleted || !file.corrupted {
                return FileChange::Unchanged;
            }
            file.corrupted = false;
            FileChange::Applied
        })
    }

    /// Copy a readable file into another file system.
    ///
    /// A file with the same name at the destination is replaced, otherwise
    /// the copy is appended. Deleted sources cannot be copied.
    pub fn copy_file(&mut self, from: &FileSystemId, name: &str, to: &FileSystemId) -> FileChange {
        let Some(source) = self.file_systems.get(from).and_then(|fs| fs.file(name)) else {
            return FileChange::Missing;
        };
        if source.secure_deleted {
            return FileChange::Irreversible;
        }
        if source.deleted {
            return FileChange::Unchanged;
        }
        let copy = FileEntry {
            deleted_at: None,
            ..source.clone()
        };

        let Some(dest) = self.file_systems.get_mut(to) else {
            return FileChange::Missing;
        };
        if let Some(existing) = dest.file_mut(name) {
            *existing = copy;
        } else {
            dest.files.push(copy);
        }
        FileChange::Applied
    }

    /// Run `apply` against a file, reporting `Missing` when it does not exist.
    fn with_file(
        &mut self,
        fs: &FileSystemId,
        name: &str,
        apply: impl FnOnce(&mut FileEntry) -> FileChange,
    ) -> FileChange {
        self.file_systems
            .get_mut(fs)
            .and_then(|file_system| file_system.file_mut(name))
            .map_or(FileChange::Missing, apply)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;
    use netsim_types::DeviceBlueprint;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 25, 9, 0, 0).single().unwrap()
    }

    fn network(id: &str) -> Network {
        Network {
            network_id: NetworkId::new(id),
            name: format!("{id} LAN"),
            address: "10.1.1.0/24".to_owned(),
            bandwidth_mbps: 50.0,
            accessible: true,
            revoked_reason: None,
            logs: Vec::new(),
        }
    }

    fn file_system(id: &str, ip: &str) -> FileSystem {
        FileSystem {
            id: FileSystemId::new(id),
            device_ip: DeviceIp::new(ip),
            files: vec![
                FileEntry::new("payroll.xls", 2_000_000),
                FileEntry::new("contracts.pdf", 4_000_000),
            ],
        }
    }

    fn device(ip: &str, net: &str, fs: &str) -> Device {
        Device {
            ip: DeviceIp::new(ip),
            hostname: format!("host-{ip}"),
            network_id: NetworkId::new(net),
            accessible: true,
            file_system_id: Some(FileSystemId::new(fs)),
            logs: Vec::new(),
        }
    }

    fn populated() -> NetworkRegistry {
        let mut registry = NetworkRegistry::new();
        registry.register_network(network("net-a"));
        registry.register_network(network("net-b"));
        registry.register_device(device("10.1.1.2", "net-a", "fs-1"));
        registry.register_device(device("10.1.1.3", "net-a", "fs-2"));
        registry.register_device(device("10.2.2.2", "net-b", "fs-3"));
        registry.register_file_system(file_system("fs-1", "10.1.1.2"));
        registry.register_file_system(file_system("fs-2", "10.1.1.3"));
        registry.register_file_system(file_system("fs-3", "10.2.2.2"));
        registry
    }

    #[test]
    fn upsert_overwrites_existing_entry() {
        let mut registry = NetworkRegistry::new();
        assert!(registry.register_network(network("net-a")).is_none());

        let mut renamed = network("net-a");
        renamed.name = "Renamed".to_owned();
        let previous = registry.register_network(renamed);

        assert!(previous.is_some());
        assert_eq!(registry.network_count(), 1);
        assert_eq!(
            registry.get_network(&NetworkId::new("net-a")).unwrap().name,
            "Renamed"
        );
    }

    #[test]
    fn revoke_cascades_to_devices_only_on_that_network() {
        let mut registry = populated();
        let cascaded = registry.revoke_network_access(&NetworkId::new("net-a"), "contract ended", now());
        assert_eq!(cascaded, Some(2));

        let net = registry.get_network(&NetworkId::new("net-a")).unwrap();
        assert!(!net.accessible);
        assert_eq!(net.revoked_reason.as_deref(), Some("contract ended"));

        for device in registry.get_devices_by_network(&NetworkId::new("net-a")) {
            assert!(!device.accessible);
        }
        assert!(registry.get_device(&DeviceIp::new("10.2.2.2")).unwrap().accessible);
    }

    #[test]
    fn revoke_leaves_files_intact() {
        let mut registry = populated();
        let before = registry.get_file_system(&FileSystemId::new("fs-1")).unwrap().clone();
        registry.revoke_network_access(&NetworkId::new("net-a"), "breach", now());
        let after = registry.get_file_system(&FileSystemId::new("fs-1")).unwrap();

        assert_eq!(before.files.len(), after.files.len());
        let names_before: Vec<_> = before.files.iter().map(|f| &f.name).collect();
        let names_after: Vec<_> = after.files.iter().map(|f| &f.name).collect();
        assert_eq!(names_before, names_after);
    }

    #[test]
    fn revoke_network_without_devices_is_harmless() {
        let mut registry = NetworkRegistry::new();
        registry.register_network(network("net-empty"));
        assert_eq!(
            registry.revoke_network_access(&NetworkId::new("net-empty"), "idle", now()),
            Some(0)
        );
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let mut registry = populated();
        assert!(registry.get_network(&NetworkId::new("nope")).is_none());
        assert!(registry.revoke_network_access(&NetworkId::new("nope"), "x", now()).is_none());
        assert!(registry.grant_network_access(&NetworkId::new("nope"), now()).is_none());
        assert!(!registry.add_device_log(
            &DeviceIp::new("1.2.3.4"),
            LogEntry {
                action: "x".to_owned(),
                actor: "y".to_owned(),
                note: String::new(),
                timestamp: now(),
            }
        ));
        assert_eq!(
            registry.delete_file(&FileSystemId::new("nope"), "a", now()),
            FileChange::Missing
        );
    }

    #[test]
    fn grant_reverses_revoke() {
        let mut registry = populated();
        let id = NetworkId::new("net-a");
        registry.revoke_network_access(&id, "paused", now());
        registry.grant_network_access(&id, now());

        let net = registry.get_network(&id).unwrap();
        assert!(net.accessible);
        assert!(net.revoked_reason.is_none());
        assert!(registry.get_devices_by_network(&id).iter().all(|d| d.accessible));
        assert_eq!(net.logs.len(), 2);
    }

    #[test]
    fn delete_is_reversible_but_secure_delete_is_not() {
        let mut registry = populated();
        let fs = FileSystemId::new("fs-1");

        assert_eq!(registry.delete_file(&fs, "payroll.xls", now()), FileChange::Applied);
        assert_eq!(registry.delete_file(&fs, "payroll.xls", now()), FileChange::Unchanged);
        assert_eq!(registry.recover_file(&fs, "payroll.xls"), FileChange::Applied);
        assert!(!registry.get_file_system(&fs).unwrap().file("payroll.xls").unwrap().deleted);

        assert_eq!(registry.secure_delete_file(&fs, "contracts.pdf", now()), FileChange::Applied);
        assert_eq!(registry.recover_file(&fs, "contracts.pdf"), FileChange::Irreversible);
        let file = registry.get_file_system(&fs).unwrap().file("contracts.pdf").unwrap();
        assert!(file.deleted);
        assert!(file.secure_deleted);
    }

    #[test]
    fn repair_clears_corruption() {
        let mut registry = populated();
        let fs = FileSystemId::new("fs-2");
        let mut corrupted = registry.get_file_system(&fs).unwrap().clone();
        corrupted.files[0].corrupted = true;
        registry.register_file_system(corrupted);

        assert_eq!(registry.repair_file(&fs, "payroll.xls"), FileChange::Applied);
        assert_eq!(registry.repair_file(&fs, "payroll.xls"), FileChange::Unchanged);
    }

    #[test]
    fn copy_replaces_or_appends() {
        let mut registry = populated();
        let from = FileSystemId::new("fs-1");
        let to = FileSystemId::new("fs-3");
        let mut dest = registry.get_file_system(&to).unwrap().clone();
        dest.files.retain(|f| f.name != "payroll.xls");
        registry.register_file_system(dest);

        assert_eq!(registry.copy_file(&from, "payroll.xls", &to), FileChange::Applied);
        assert_eq!(registry.copy_file(&from, "contracts.pdf", &to), FileChange::Applied);
        let dest = registry.get_file_system(&to).unwrap();
        assert_eq!(dest.files.len(), 2);
        assert!(dest.file("payroll.xls").is_some());
    }

    #[test]
    fn merge_replaces_file_systems_by_id_and_grants_network() {
        let mut registry = populated();
        registry.revoke_network_access(&NetworkId::new("net-a"), "old contract", now());

        let mut replacement = file_system("fs-1", "10.1.1.2");
        replacement.files = vec![FileEntry::new("new.txt", 10)];
        let blueprint = NetworkBlueprint {
            network_id: NetworkId::new("net-a"),
            name: "net-a LAN".to_owned(),
            address: "10.1.1.0/24".to_owned(),
            bandwidth_mbps: 75.0,
            devices: vec![
                DeviceBlueprint {
                    ip: DeviceIp::new("10.1.1.2"),
                    hostname: "fileserver".to_owned(),
                    file_system: replacement,
                    logs: Vec::new(),
                },
                DeviceBlueprint {
                    ip: DeviceIp::new("10.1.1.9"),
                    hostname: "backup".to_owned(),
                    file_system: file_system("fs-9", "10.1.1.9"),
                    logs: Vec::new(),
                },
            ],
        };

        let summary = registry.merge_blueprints(&[blueprint]);
        assert_eq!(summary.networks, 1);
        assert_eq!(summary.devices, 2);
        assert_eq!(summary.file_systems, 2);

        let net = registry.get_network(&NetworkId::new("net-a")).unwrap();
        assert!(net.accessible);
        assert_eq!(net.logs.len(), 1);
        assert_eq!(
            registry.get_file_system(&FileSystemId::new("fs-1")).unwrap().files.len(),
            1
        );
        assert!(registry.get_file_system(&FileSystemId::new("fs-9")).is_some());
        assert_eq!(registry.get_devices_by_network(&NetworkId::new("net-a")).len(), 3);
    }

    #[test]
    fn registry_roundtrips_through_json() {
        let registry = populated();
        let json = serde_json::to_string(&registry).unwrap();
        let restored: NetworkRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(registry, restored);
    }
}
