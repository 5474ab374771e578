//! Network, device and file registry plus the shared-bandwidth allocator.
//!
//! The registry is the canonical store every other kernel subsystem reads
//! and writes; the allocator prices bandwidth-consuming operations against
//! the network ratings it holds.
//!
//! # Modules
//!
//! - [`registry`] -- [`NetworkRegistry`] with idempotent upserts, cascading
//!   access control, audit logs, and the file lifecycle (delete, secure
//!   delete, recover, repair, copy).
//! - [`bandwidth`] -- [`BandwidthAllocator`] dividing effective throughput
//!   evenly among active operations.
//! - [`error`] -- Error types for operation registration.

pub mod bandwidth;
pub mod error;
pub mod registry;

pub use bandwidth::{
    BandwidthAllocator, OperationRequest, Registration, USAGE_DISPLAY_CAP, effective_throughput,
    estimate_seconds,
};
pub use error::NetworkError;
pub use registry::{FileChange, MergeSummary, NetworkRegistry};
