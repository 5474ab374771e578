//! Simulation core for the Netsim kernel.
//!
//! This crate owns the notion of time and ties the domain crates together.
//! A [`Session`] holds the registry, bandwidth allocator, mission pool and
//! economy, and sequences every state change against a single
//! [`VirtualClock`]. Deferred work goes through the virtual-time
//! [`Scheduler`]; observers subscribe to typed [`GameEvent`]s on the
//! [`EventBus`].
//!
//! # Modules
//!
//! - [`clock`] -- Virtual clock with pause and allow-listed speed
//!   multipliers.
//! - [`scheduler`] -- Timers keyed by virtual due instant.
//! - [`events`] -- Typed publish/subscribe with isolated handler failures.
//! - [`config`] -- YAML configuration with environment overrides.
//! - [`session`] -- The orchestrator: missions, operations, finalization
//!   and the time driver.
//! - [`state`] -- Plain records owned by the session.
//! - [`save`] -- Versioned, resumable save state.
//! - [`error`] -- Session error types.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod save;
pub mod scheduler;
pub mod session;
pub mod state;

pub use clock::{ClockError, VirtualClock};
pub use config::{
    ClockConfig, ConfigError, EconomyConfig, HardwareConfig, LoggingConfig, ObserverConfig,
    ReputationConfig, SessionConfig, SimulationConfig,
};
pub use error::SessionError;
pub use events::{
    CountdownKind, EmitReport, EventBus, EventKind, GameEvent, Handler, HandlerError,
    HandlerFailure, MAX_CASCADE, Outbox, SubscriptionId,
};
pub use save::{ClockState, SAVE_VERSION, SaveError, SaveState};
pub use scheduler::{FiredTimer, Scheduler, TimerHandle};
pub use session::{
    AdvanceReport, Finalization, HOME_NETWORK_ID, JOURNAL_CAPACITY, JournalEntry,
    ScheduledAction, Session,
};
pub use state::{ActiveMission, Inventory, MissionRecord, OperationPurpose, ScriptedFailure};
