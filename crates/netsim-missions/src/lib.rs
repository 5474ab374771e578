//! Mission supply for the Netsim kernel.
//!
//! A static client catalog feeds a procedural generator that builds each
//! mission together with the networks it targets. The [`MissionPool`] keeps a
//! bounded, progression-gated set of offers on the board and can thread
//! several missions into a storyline arc that reveals one step at a time.
//!
//! # Modules
//!
//! - [`clients`] -- The reputation-gated client catalog and the walk-in
//!   fallback.
//! - [`config`] -- Pool sizing, expiry and arc tunables.
//! - [`generator`] -- Templates, payouts, consequences and network
//!   synthesis for single missions.
//! - [`storylines`] -- Built-in storylines and client selection for arcs.
//! - [`pool`] -- [`MissionPool`]: refresh, expiry, removal and arc
//!   progression.
//! - [`error`] -- Error types for catalog lookups and arc construction.

pub mod clients;
pub mod config;
pub mod error;
pub mod generator;
pub mod pool;
pub mod storylines;

pub use clients::{Client, ClientRegistry, WALK_IN_ID, walk_in};
pub use config::{PoolConfig, PoolTarget};
pub use error::MissionError;
pub use generator::{
    MissionTemplate, choose_template, generate_mission, generate_mission_for, objective_ids,
    payout_for,
};
pub use pool::{ArcProgress, MissionPool, Progression, RefreshReport};
pub use storylines::{STORYLINES, StoryRole, Storyline, select_clients};
