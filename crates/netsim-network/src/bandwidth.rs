//! Shared-bandwidth allocator.
//!
//! Every bandwidth-consuming operation (downloads, installs, scans, file
//! repair/copy/delete, recovery, secure delete) runs over a connection whose
//! effective throughput is `min(local adapter, network rating)`. When `N`
//! operations are active each receives `effective / N`, recomputed whenever
//! the active set changes.
//!
//! # Share recomputation policy
//!
//! Only the *remaining* work is repriced. Before the active set changes,
//! every in-flight operation settles its progress at its old share up to
//! "now"; the new share then applies to what is left. Progress already made
//! is never rewritten.
//!
//! # Units
//!
//! Sizes are megabytes, throughput is megabits per second. Time for `S` MB
//! at `B` Mbps is `S / (B / 8)` seconds, multiplied by the operation type's
//! duration multiplier (5 for secure delete).

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use netsim_types::{
    BandwidthOperation, FileTask, NetworkId, OperationId, OperationStatus, OperationType,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::NetworkError;
use crate::registry::NetworkRegistry;

/// Concurrent operations at which the usage gauge reads 100%.
pub const USAGE_DISPLAY_CAP: usize = 4;

/// Bits per byte.
const BITS_PER_BYTE: f64 = 8.0;

/// Effective throughput of a connection: the slower of the two ends.
pub const fn effective_throughput(adapter_mbps: f64, network_mbps: f64) -> f64 {
    adapter_mbps.min(network_mbps)
}

/// Seconds needed to move `size_mb` at `share_mbps` for `operation_type`.
///
/// Returns `None` when the share is not positive.
pub fn estimate_seconds(size_mb: f64, share_mbps: f64, operation_type: OperationType) -> Option<f64> {
    if share_mbps <= 0.0 || !share_mbps.is_finite() {
        return None;
    }
    let base = size_mb / (share_mbps / BITS_PER_BYTE);
    Some(base * f64::from(operation_type.duration_multiplier()))
}

/// A request to start a bandwidth operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    /// Kind of operation.
    pub operation_type: OperationType,
    /// Size in megabytes.
    pub size_mb: f64,
    /// Network the transfer runs over.
    pub network_id: NetworkId,
    /// UI label.
    pub label: String,
    /// File effect to apply on completion.
    pub task: Option<FileTask>,
}

/// Returned by [`BandwidthAllocator::register_operation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Registration {
    /// Id of the new operation.
    pub id: OperationId,
    /// Seconds to completion at the share current at registration.
    pub estimated_secs: f64,
    /// Virtual completion instant at that share.
    pub estimated_completion: DateTime<Utc>,
}

/// Allocator tracking the set of active operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandwidthAllocator {
    /// Local network adapter speed in Mbps.
    adapter_mbps: f64,
    /// Active operations keyed by id (UUID v7, so registration order).
    operations: BTreeMap<OperationId, BandwidthOperation>,
}

impl BandwidthAllocator {
    /// Create an allocator for a local adapter of `adapter_mbps`.
    pub const fn new(adapter_mbps: f64) -> Self {
        Self {
            adapter_mbps,
            operations: BTreeMap::new(),
        }
    }

    /// Rebuild an allocator from persisted operations.
    pub fn restore(adapter_mbps: f64, operations: Vec<BandwidthOperation>) -> Self {
        let mut allocator = Self::new(adapter_mbps);
        for op in operations {
            allocator.operations.insert(op.id, op);
        }
        allocator.recompute_shares();
        allocator
    }

    /// Local adapter speed in Mbps.
    pub const fn adapter_mbps(&self) -> f64 {
        self.adapter_mbps
    }

    /// Install a new adapter (hardware upgrade). Remaining work is repriced.
    ///
    /// Operations whose network has since left the registry keep their old
    /// connection rating.
    pub fn set_adapter_speed(
        &mut self,
        registry: &NetworkRegistry,
        adapter_mbps: f64,
        now: DateTime<Utc>,
    ) {
        self.settle(now);
        self.adapter_mbps = adapter_mbps;
        for op in self.operations.values_mut() {
            if let Some(network) = registry.get_network(&op.network_id) {
                op.effective_mbps = effective_throughput(adapter_mbps, network.bandwidth_mbps);
            }
        }
        self.recompute_shares();
        info!(adapter_mbps, "network adapter speed changed");
    }

    /// Start an operation and return its completion estimate at the
    /// current share.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::UnknownNetwork`] if the network is not in the
    /// registry, [`NetworkError::InvalidSize`] for a negative or non-finite
    /// size, and [`NetworkError::NoThroughput`] when the connection has no
    /// throughput.
    pub fn register_operation(
        &mut self,
        registry: &NetworkRegistry,
        request: OperationRequest,
        now: DateTime<Utc>,
    ) -> Result<Registration, NetworkError> {
        let network = registry
            .get_network(&request.network_id)
            .ok_or_else(|| NetworkError::UnknownNetwork(request.network_id.clone()))?;
        if !request.size_mb.is_finite() || request.size_mb < 0.0 {
            return Err(NetworkError::InvalidSize {
                size_mb: request.size_mb,
            });
        }
        let effective = effective_throughput(self.adapter_mbps, network.bandwidth_mbps);
        if effective <= 0.0 {
            return Err(NetworkError::NoThroughput {
                network_id: request.network_id,
            });
        }

        self.settle(now);

        let id = OperationId::new();
        let multiplier = f64::from(request.operation_type.duration_multiplier());
        self.operations.insert(
            id,
            BandwidthOperation {
                id,
                operation_type: request.operation_type,
                size_mb: request.size_mb,
                status: OperationStatus::Active,
                started_at: now,
                network_id: request.network_id,
                remaining_mb: request.size_mb * multiplier,
                effective_mbps: effective,
                share_mbps: effective,
                settled_at: now,
                label: request.label,
                task: request.task,
            },
        );
        self.recompute_shares();

        let share = self.operations.get(&id).map_or(effective, |op| op.share_mbps);
        let estimated_secs =
            estimate_seconds(request.size_mb, share, request.operation_type).unwrap_or(0.0);
        let estimated_completion = add_seconds(now, estimated_secs);

        info!(
            operation_id = %id,
            operation_type = ?request.operation_type,
            size_mb = request.size_mb,
            share_mbps = share,
            estimated_secs,
            active = self.operations.len(),
            "bandwidth operation registered"
        );

        Ok(Registration {
            id,
            estimated_secs,
            estimated_completion,
        })
    }

    /// Remove an operation, freeing its share for the others.
    ///
    /// Returns the finished operation (status `Complete`), or `None` if the
    /// id is unknown.
    pub fn complete_operation(
        &mut self,
        id: OperationId,
        now: DateTime<Utc>,
    ) -> Option<BandwidthOperation> {
        if !self.operations.contains_key(&id) {
            return None;
        }
        self.settle(now);
        let mut op = self.operations.remove(&id)?;
        op.status = OperationStatus::Complete;
        op.remaining_mb = 0.0;
        self.recompute_shares();
        info!(
            operation_id = %id,
            active = self.operations.len(),
            "bandwidth operation completed"
        );
        Some(op)
    }

    /// Look up an active operation.
    pub fn get(&self, id: OperationId) -> Option<&BandwidthOperation> {
        self.operations.get(&id)
    }

    /// Active operations in registration order.
    pub fn operations(&self) -> impl Iterator<Item = &BandwidthOperation> {
        self.operations.values()
    }

    /// Number of active operations.
    pub fn active_count(&self) -> usize {
        self.operations.len()
    }

    /// Current per-operation throughput in MB/s.
    pub fn share_mb_per_sec(&self, id: OperationId) -> Option<f64> {
        self.operations
            .get(&id)
            .map(|op| op.share_mbps / BITS_PER_BYTE)
    }

    /// Virtual instant at which `id` finishes if the active set stays as is.
    pub fn estimated_completion(&self, id: OperationId, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let op = self.operations.get(&id)?;
        let remaining = remaining_at(op, now);
        let rate = op.share_mbps / BITS_PER_BYTE;
        if rate <= 0.0 {
            return None;
        }
        Some(add_seconds(now, remaining / rate))
    }

    /// Fraction of `id` completed at `now`, in `[0, 1]`.
    pub fn progress(&self, id: OperationId, now: DateTime<Utc>) -> Option<f64> {
        let op = self.operations.get(&id)?;
        let total = op.size_mb * f64::from(op.operation_type.duration_multiplier());
        if total <= 0.0 {
            return Some(1.0);
        }
        let done = total - remaining_at(op, now);
        Some((done / total).clamp(0.0, 1.0))
    }

    /// Usage gauge for the UI: 25% per operation, capped at 100%.
    ///
    /// The cap is display-only; shares are always divided by the real count.
    pub fn usage_percent(&self) -> u32 {
        let shown = self.operations.len().min(USAGE_DISPLAY_CAP);
        // shown <= 4, so the product fits comfortably.
        u32::try_from(shown).unwrap_or(0).saturating_mul(25)
    }

    /// Bring every operation's progress up to `now` at its current share.
    fn settle(&mut self, now: DateTime<Utc>) {
        for op in self.operations.values_mut() {
            op.remaining_mb = remaining_at(op, now);
            if now > op.settled_at {
                op.settled_at = now;
            }
        }
    }

    /// Divide each connection's throughput by the active count.
    #[allow(clippy::cast_precision_loss)]
    fn recompute_shares(&mut self) {
        let count = self.operations.len();
        if count == 0 {
            return;
        }
        let divisor = count as f64;
        for op in self.operations.values_mut() {
            op.share_mbps = op.effective_mbps / divisor;
        }
        debug!(active = count, "bandwidth shares recomputed");
    }
}

/// Remaining effective megabytes of `op` at `now`, without mutating it.
#[allow(clippy::cast_precision_loss)]
fn remaining_at(op: &BandwidthOperation, now: DateTime<Utc>) -> f64 {
    let elapsed_ms = now.signed_duration_since(op.settled_at).num_milliseconds().max(0);
    let elapsed_secs = elapsed_ms as f64 / 1000.0;
    let progressed = op.share_mbps / BITS_PER_BYTE * elapsed_secs;
    (op.remaining_mb - progressed).max(0.0)
}

/// `now + secs`, rounded up to the next millisecond.
#[allow(clippy::cast_possible_truncation)]
pub fn add_seconds(now: DateTime<Utc>, secs: f64) -> DateTime<Utc> {
    let ms = (secs.max(0.0) * 1000.0).ceil();
    let ms = if ms.is_finite() && ms < 9.0e15 { ms as i64 } else { i64::MAX / 4 };
    now.checked_add_signed(TimeDelta::milliseconds(ms))
        .unwrap_or(now)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use netsim_types::Network;

    use super::*;

    const EPS: f64 = 1e-9;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 25, 9, 0, 0).single().unwrap()
    }

    fn registry_with(mbps: f64) -> NetworkRegistry {
        let mut registry = NetworkRegistry::new();
        registry.register_network(Network {
            network_id: NetworkId::new("net"),
            name: "Client LAN".to_owned(),
            address: "10.0.0.0/24".to_owned(),
            bandwidth_mbps: mbps,
            accessible: true,
            revoked_reason: None,
            logs: Vec::new(),
        });
        registry
    }

    fn request(operation_type: OperationType, size_mb: f64) -> OperationRequest {
        OperationRequest {
            operation_type,
            size_mb,
            network_id: NetworkId::new("net"),
            label: "test".to_owned(),
            task: None,
        }
    }

    #[test]
    fn effective_is_the_bottleneck() {
        assert!((effective_throughput(1000.0, 250.0) - 250.0).abs() < EPS);
        assert!((effective_throughput(50.0, 250.0) - 50.0).abs() < EPS);
    }

    #[test]
    fn single_operation_gets_full_throughput() {
        let registry = registry_with(250.0);
        let mut alloc = BandwidthAllocator::new(1000.0);
        let reg = alloc
            .register_operation(&registry, request(OperationType::Download, 25.0), now())
            .unwrap();

        assert!((alloc.share_mb_per_sec(reg.id).unwrap() - 31.25).abs() < EPS);
        assert!((reg.estimated_secs - 0.8).abs() < EPS);
    }

    #[test]
    fn two_operations_split_throughput_evenly() {
        let registry = registry_with(250.0);
        let mut alloc = BandwidthAllocator::new(1000.0);
        let a = alloc
            .register_operation(&registry, request(OperationType::Download, 25.0), now())
            .unwrap();
        let b = alloc
            .register_operation(&registry, request(OperationType::Download, 25.0), now())
            .unwrap();

        let share_a = alloc.share_mb_per_sec(a.id).unwrap();
        let share_b = alloc.share_mb_per_sec(b.id).unwrap();
        assert!((share_a - 15.625).abs() < EPS);
        assert!((share_b - 15.625).abs() < EPS);
        assert!((share_a + share_b - 31.25).abs() < EPS);
    }

    #[test]
    fn completing_one_frees_capacity_for_the_rest() {
        let registry = registry_with(250.0);
        let mut alloc = BandwidthAllocator::new(1000.0);
        let a = alloc
            .register_operation(&registry, request(OperationType::Download, 25.0), now())
            .unwrap();
        let b = alloc
            .register_operation(&registry, request(OperationType::Download, 25.0), now())
            .unwrap();

        let done = alloc.complete_operation(a.id, now()).unwrap();
        assert_eq!(done.status, OperationStatus::Complete);
        assert!((alloc.share_mb_per_sec(b.id).unwrap() - 31.25).abs() < EPS);
        assert!(alloc.complete_operation(a.id, now()).is_none());
    }

    #[test]
    fn recompute_keeps_elapsed_progress() {
        let registry = registry_with(80.0);
        let mut alloc = BandwidthAllocator::new(1000.0);
        // 100 MB at 10 MB/s.
        let a = alloc
            .register_operation(&registry, request(OperationType::Download, 100.0), now())
            .unwrap();
        let later = now() + TimeDelta::seconds(5);
        assert!((alloc.progress(a.id, later).unwrap() - 0.5).abs() < EPS);

        // A second operation halves the share; the first half stays done.
        alloc
            .register_operation(&registry, request(OperationType::Scan, 10.0), later)
            .unwrap();
        assert!((alloc.progress(a.id, later).unwrap() - 0.5).abs() < EPS);
        // 50 MB left at 5 MB/s.
        let eta = alloc.estimated_completion(a.id, later).unwrap();
        assert_eq!(eta, later + TimeDelta::seconds(10));
    }

    #[test]
    fn secure_delete_takes_five_times_longer() {
        let normal = estimate_seconds(10.0, 80.0, OperationType::Delete).unwrap();
        let secure = estimate_seconds(10.0, 80.0, OperationType::SecureDelete).unwrap();
        assert!((normal - 1.0).abs() < EPS);
        assert!((secure - 5.0).abs() < EPS);
    }

    #[test]
    fn usage_caps_at_four_operations() {
        let registry = registry_with(100.0);
        let mut alloc = BandwidthAllocator::new(100.0);
        for _ in 0..6 {
            alloc
                .register_operation(&registry, request(OperationType::Download, 1.0), now())
                .unwrap();
        }
        assert_eq!(alloc.usage_percent(), 100);
        // Shares still divide by the real count.
        let first = alloc.operations().next().unwrap();
        assert!((first.share_mbps - 100.0 / 6.0).abs() < EPS);
    }

    #[test]
    fn adapter_upgrade_reprices_remaining_work() {
        let registry = registry_with(250.0);
        let mut alloc = BandwidthAllocator::new(80.0);
        let a = alloc
            .register_operation(&registry, request(OperationType::Download, 20.0), now())
            .unwrap();
        assert!((alloc.share_mb_per_sec(a.id).unwrap() - 10.0).abs() < EPS);

        let later = now() + TimeDelta::seconds(1);
        alloc.set_adapter_speed(&registry, 1000.0, later);
        assert!((alloc.share_mb_per_sec(a.id).unwrap() - 31.25).abs() < EPS);
        assert!((alloc.progress(a.id, later).unwrap() - 0.5).abs() < EPS);
    }

    #[test]
    fn unknown_network_is_rejected() {
        let registry = NetworkRegistry::new();
        let mut alloc = BandwidthAllocator::new(100.0);
        let result = alloc.register_operation(&registry, request(OperationType::Download, 1.0), now());
        assert!(matches!(result, Err(NetworkError::UnknownNetwork(_))));
    }

    #[test]
    fn negative_size_is_rejected() {
        let registry = registry_with(100.0);
        let mut alloc = BandwidthAllocator::new(100.0);
        let result =
            alloc.register_operation(&registry, request(OperationType::Download, -1.0), now());
        assert!(matches!(result, Err(NetworkError::InvalidSize { .. })));
    }
}
