//! Error types for the `netsim-network` crate.
//!
//! Registry lookups never fail: unknown ids yield `None` and defensive
//! operations (revoking an empty network, deleting a deleted file) are
//! no-ops. Errors are reserved for bandwidth registrations that cannot be
//! priced.

use netsim_types::NetworkId;

/// Errors that can occur when registering a bandwidth operation.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// The operation targets a network the registry does not know.
    #[error("unknown network: {0}")]
    UnknownNetwork(NetworkId),

    /// Operation size must be a finite, non-negative number of megabytes.
    #[error("invalid operation size: {size_mb} MB")]
    InvalidSize {
        /// The rejected size.
        size_mb: f64,
    },

    /// The connection has no usable throughput (adapter or network rated 0).
    #[error("no throughput available on network {network_id}")]
    NoThroughput {
        /// The network with zero effective throughput.
        network_id: NetworkId,
    },
}
