//! Error types for the `netsim-missions` crate.

use netsim_types::{ArcId, ClientId, MissionId};

/// Errors that can occur when building arcs or mutating the pool.
#[derive(Debug, thiserror::Error)]
pub enum MissionError {
    /// The client id is not in the catalog.
    #[error("unknown client: {0}")]
    UnknownClient(ClientId),

    /// The mission is not currently offered in the pool.
    #[error("mission {0} is not in the pool")]
    NotInPool(MissionId),

    /// The arc id has no pending bucket.
    #[error("unknown arc: {0}")]
    UnknownArc(ArcId),

    /// A storyline must have at least one role.
    #[error("storyline '{name}' has no roles")]
    EmptyStoryline {
        /// Storyline name.
        name: String,
    },

    /// Arc generation needs exactly one client per storyline role.
    #[error("storyline '{name}' has {roles} roles but {clients} clients were supplied")]
    ClientCountMismatch {
        /// Storyline name.
        name: String,
        /// Number of roles in the storyline.
        roles: usize,
        /// Number of clients supplied.
        clients: usize,
    },
}
