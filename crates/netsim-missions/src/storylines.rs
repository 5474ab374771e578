//! Multi-mission storylines.
//!
//! A storyline is an ordered list of client roles. Generating an arc from it
//! produces one mission per role, each gated on the previous one.

use netsim_types::{Industry, MissionType};
use rand::Rng;

use crate::clients::{Client, ClientRegistry};

/// One step of a storyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryRole {
    /// Industry the commissioning client should come from.
    pub industry: Industry,
    /// Mission type for this step.
    pub mission_type: MissionType,
}

/// A named sequence of roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Storyline {
    /// Arc name reported on completion.
    pub name: &'static str,
    /// Ordered roles.
    pub roles: &'static [StoryRole],
}

/// Built-in storylines.
pub const STORYLINES: [Storyline; 3] = [
    Storyline {
        name: "The Ransomware Trail",
        roles: &[
            StoryRole {
                industry: Industry::Healthcare,
                mission_type: MissionType::Restoration,
            },
            StoryRole {
                industry: Industry::Healthcare,
                mission_type: MissionType::Backup,
            },
            StoryRole {
                industry: Industry::Government,
                mission_type: MissionType::SecureDeletion,
            },
        ],
    },
    Storyline {
        name: "Merger Cleanup",
        roles: &[
            StoryRole {
                industry: Industry::Banking,
                mission_type: MissionType::Transfer,
            },
            StoryRole {
                industry: Industry::Legal,
                mission_type: MissionType::SecureDeletion,
            },
        ],
    },
    Storyline {
        name: "Flood Season",
        roles: &[
            StoryRole {
                industry: Industry::Utilities,
                mission_type: MissionType::Repair,
            },
            StoryRole {
                industry: Industry::Education,
                mission_type: MissionType::Restoration,
            },
            StoryRole {
                industry: Industry::Media,
                mission_type: MissionType::Backup,
            },
        ],
    },
];

/// Pick one accessible client per role.
///
/// Prefers a client from the role's industry not already used in this arc,
/// then any unused accessible client, then any accessible client. Returns
/// `None` if the player qualifies for no client at all.
pub fn select_clients(
    storyline: &Storyline,
    registry: &ClientRegistry,
    reputation: u8,
    rng: &mut impl Rng,
) -> Option<Vec<Client>> {
    let accessible = registry.get_accessible_clients(reputation);
    if accessible.is_empty() {
        return None;
    }

    let mut chosen: Vec<Client> = Vec::with_capacity(storyline.roles.len());
    for role in storyline.roles {
        let unused: Vec<&Client> = accessible
            .iter()
            .copied()
            .filter(|c| !chosen.iter().any(|used| used.id == c.id))
            .collect();
        let same_industry: Vec<&Client> = unused
            .iter()
            .copied()
            .filter(|c| c.industry == role.industry)
            .collect();

        let candidates = if !same_industry.is_empty() {
            same_industry
        } else if !unused.is_empty() {
            unused
        } else {
            accessible.clone()
        };
        let idx = rng.random_range(0..candidates.len());
        let client = candidates.get(idx).copied()?;
        chosen.push(client.clone());
    }
    Some(chosen)
}
