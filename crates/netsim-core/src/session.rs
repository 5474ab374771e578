//! The session orchestrator.
//!
//! A [`Session`] owns every piece of kernel state and is the only place
//! where state changes are sequenced: the virtual clock, the timer queue,
//! the event bus, the registry and bandwidth allocator, the mission pool,
//! the economy and the inbox. Callers drive it in two ways:
//!
//! - player actions (`accept_mission`, `scan_network`, `deposit`, ...),
//!   which validate, mutate, and emit [`GameEvent`]s;
//! - time, through [`Session::advance_real`] or
//!   [`Session::advance_virtual`], which fires due timers at their exact
//!   virtual instants and then runs the economy tick.
//!
//! # Invariants
//!
//! - At most one mission is active.
//! - A mission's consequences are applied exactly once. Finalization is
//!   keyed by mission id; every later attempt reports
//!   [`Finalization::AlreadyFinalized`] and changes nothing.
//! - Virtual time never moves while paused or after game over.
//! - Timers are derived state. A save stores what they point at (in-flight
//!   operations, queued messages, deadlines) and restore rebuilds them.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use netsim_economy::{
    Bank, CountdownTransition, Economy, EconomyTick, MessageQueue, Notice, ReputationTier,
};
use netsim_missions::{ArcProgress, ClientRegistry, MissionPool, Progression, RefreshReport};
use netsim_network::{BandwidthAllocator, NetworkRegistry, OperationRequest, Registration};
use netsim_types::{
    AccountId, BandwidthOperation, Capability, DeviceBlueprint, DeviceIp, FailureCause, FileEntry,
    FileOperationKind, FileSystem, FileSystemId, FileTask, GameOverReason, LogEntry, Message,
    MessageId, MissionId, MissionOutcome, NetworkBlueprint, NetworkId, Objective,
    ObjectiveStatus, ObjectiveType, OperationId, OperationType,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::VirtualClock;
use crate::config::SimulationConfig;
use crate::error::SessionError;
use crate::events::{CountdownKind, EventBus, GameEvent};
use crate::save::{ClockState, SAVE_VERSION, SaveError, SaveState};
use crate::scheduler::{FiredTimer, Scheduler, TimerHandle};
use crate::state::{
    ActiveMission, Inventory, MissionRecord, OperationPurpose, ScriptedFailure,
};

/// Number of events kept in the journal.
pub const JOURNAL_CAPACITY: usize = 200;

/// The player's own network.
pub const HOME_NETWORK_ID: &str = "home";

/// Megabytes of probe traffic per device when scanning a network.
const SCAN_MB_PER_DEVICE: f64 = 5.0;

/// Size of a software download.
const SOFTWARE_DOWNLOAD_MB: f64 = 120.0;

/// Sender of kernel-generated mail.
const HR_SENDER: &str = "SourceNet Human Resources";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Work deferred to a virtual instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledAction {
    /// Move a queued message into the inbox.
    DeliverMessage(MessageId),
    /// Finish a bandwidth operation.
    CompleteOperation(OperationId),
    /// The active mission's time limit ran out.
    MissionTimeout(MissionId),
    /// A scripted failure comes due.
    ScriptedFailure {
        /// Mission to fail.
        mission_id: MissionId,
        /// Failure cause to apply.
        cause: FailureCause,
    },
}

/// An emitted event with the virtual instant it happened at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalEntry {
    /// Virtual instant of emission.
    pub at: DateTime<Utc>,
    /// The event.
    pub event: GameEvent,
}

/// Result of [`Session::finalize_mission`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finalization {
    /// Consequences were applied with this outcome.
    Applied(MissionOutcome),
    /// The mission was already finalized; nothing changed.
    AlreadyFinalized,
}

/// What one call to [`Session::advance_virtual`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvanceReport {
    /// Virtual time that passed.
    pub elapsed: TimeDelta,
    /// Timers that fired.
    pub timers_fired: usize,
    /// Overdraft interest posted (zero or negative).
    pub interest: Decimal,
    /// Economic notices that fired.
    pub notices: Vec<Notice>,
    /// Pool refresh, if one ran.
    pub refresh: Option<RefreshReport>,
    /// Set once the session has ended.
    pub game_over: Option<GameOverReason>,
}

impl AdvanceReport {
    const fn idle(game_over: Option<GameOverReason>) -> Self {
        Self {
            elapsed: TimeDelta::zero(),
            timers_fired: 0,
            interest: Decimal::ZERO,
            notices: Vec::new(),
            refresh: None,
            game_over,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One player's running simulation.
#[derive(Debug)]
pub struct Session {
    config: SimulationConfig,
    clock: VirtualClock,
    scheduler: Scheduler<ScheduledAction>,
    events: EventBus,
    journal: VecDeque<JournalEntry>,

    registry: NetworkRegistry,
    bandwidth: BandwidthAllocator,
    connections: BTreeSet<NetworkId>,
    purposes: BTreeMap<OperationId, OperationPurpose>,
    operation_timers: BTreeMap<OperationId, TimerHandle>,

    clients: ClientRegistry,
    pool: MissionPool,
    active: Option<ActiveMission>,
    mission_timer: Option<TimerHandle>,
    history: Vec<MissionRecord>,
    finalized: BTreeSet<MissionId>,
    scripted: BTreeMap<TimerHandle, ScriptedFailure>,

    economy: Economy,
    messages: MessageQueue,
    inbox: Vec<Message>,

    inventory: Inventory,
    fired_events: BTreeSet<String>,
    rng: SmallRng,
    game_over: Option<GameOverReason>,
}

impl Session {
    /// Start a new game.
    ///
    /// Opens the primary bank account, registers the home network, fills
    /// the mission pool and queues the welcome message.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] for an invalid config and
    /// [`SessionError::Clock`] for an unsupported default speed.
    pub fn new(config: SimulationConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let start = config.session.start_time;
        let clock = VirtualClock::new(
            start,
            config.clock.default_speed,
            config.clock.allowed_speeds.clone(),
        )?;

        let mut bank = Bank::new();
        bank.open_account(
            AccountId::new("primary"),
            config.economy.bank_name.clone(),
            config.economy.starting_balance,
        );
        let tier = ReputationTier::new(config.reputation.starting_tier)
            .unwrap_or(ReputationTier::START);
        let economy = Economy::new(config.economy_policy(), bank, tier);

        let mut registry = NetworkRegistry::new();
        registry.merge_blueprints(&[home_network(start)]);

        let inventory = Inventory {
            adapter_mbps: config.hardware.adapter_mbps,
            capabilities: BTreeSet::new(),
        };
        let clients = ClientRegistry::standard();
        let mut rng = SmallRng::seed_from_u64(config.session.seed);
        let progression = Progression {
            reputation: tier.value(),
            investigation_unlocked: false,
        };
        let pool = MissionPool::initialize_pool(&config.missions, &clients, progression, &mut rng, start);

        let mut session = Self {
            scheduler: Scheduler::new(clock.speed()),
            clock,
            events: EventBus::new(),
            journal: VecDeque::new(),
            bandwidth: BandwidthAllocator::new(inventory.adapter_mbps),
            registry,
            connections: BTreeSet::from([NetworkId::new(HOME_NETWORK_ID)]),
            purposes: BTreeMap::new(),
            operation_timers: BTreeMap::new(),
            clients,
            pool,
            active: None,
            mission_timer: None,
            history: Vec::new(),
            finalized: BTreeSet::new(),
            scripted: BTreeMap::new(),
            economy,
            messages: MessageQueue::new(TimeDelta::seconds(i64::from(
                config.economy.message_gap_secs,
            ))),
            inbox: Vec::new(),
            inventory,
            fired_events: BTreeSet::new(),
            rng,
            game_over: None,
            config,
        };

        if session.fire_once("welcome") {
            let username = session.config.session.username.clone();
            let mail_id = session.config.session.mail_id();
            session.enqueue_message(Message::new(
                HR_SENDER,
                "Welcome to SourceNet",
                format!(
                    "Welcome aboard, {username}. Your mail address is {mail_id}. \
                     Contracts are waiting on the mission board; keep your account \
                     out of deep overdraft and your clients happy."
                ),
            ));
        }

        info!(
            username = %session.config.session.username,
            seed = session.config.session.seed,
            start = %start,
            missions = session.pool.len(),
            "session started"
        );
        Ok(session)
    }

    /// Resume a saved game.
    ///
    /// Identity and seed come from the save; tunables come from `config`.
    /// Every pending timer is re-derived from the restored state.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Save`] for a save of another format version
    /// and [`SessionError::Config`] for an invalid config.
    pub fn restore(mut config: SimulationConfig, save: SaveState) -> Result<Self, SessionError> {
        if save.version != SAVE_VERSION {
            return Err(SaveError::UnsupportedVersion {
                found: save.version,
                expected: SAVE_VERSION,
            }
            .into());
        }
        config.validate()?;
        config.session.username = save.username;
        config.session.seed = save.seed;

        let allowed = config.clock.allowed_speeds.clone();
        let mut clock = match VirtualClock::new(save.clock.now, save.clock.speed, allowed.clone()) {
            Ok(clock) => clock,
            Err(error) => {
                warn!(%error, "saved clock speed no longer allowed; using the default");
                VirtualClock::new(save.clock.now, config.clock.default_speed, allowed)?
            }
        };
        if save.clock.paused {
            clock.pause();
        }

        // Fresh stream per resume: the seed alone would replay generation.
        let seed = save
            .seed
            .wrapping_add(save.clock.now.timestamp_millis().unsigned_abs());

        let mut session = Self {
            scheduler: Scheduler::new(clock.speed()),
            clock,
            events: EventBus::new(),
            journal: VecDeque::new(),
            bandwidth: BandwidthAllocator::restore(save.inventory.adapter_mbps, save.operations),
            registry: save.registry,
            connections: save.connections,
            purposes: save.operation_purposes,
            operation_timers: BTreeMap::new(),
            clients: ClientRegistry::standard(),
            pool: save.pool,
            active: save.active_mission,
            mission_timer: None,
            history: save.mission_history,
            finalized: save.finalized_missions,
            scripted: BTreeMap::new(),
            economy: Economy::restore(config.economy_policy(), save.economy),
            messages: save.message_queue,
            inbox: save.inbox,
            inventory: save.inventory,
            fired_events: save.fired_events,
            rng: SmallRng::seed_from_u64(seed),
            game_over: save.game_over,
            config,
        };

        let queued: Vec<(MessageId, DateTime<Utc>)> = session
            .messages
            .pending()
            .into_iter()
            .map(|queued| (queued.message.id, queued.deliver_at))
            .collect();
        for (id, deliver_at) in queued {
            session
                .scheduler
                .schedule_at(ScheduledAction::DeliverMessage(id), deliver_at);
        }
        session.reschedule_operation_timers();
        if let Some((id, deadline)) = session
            .active
            .as_ref()
            .and_then(|active| active.deadline.map(|d| (active.mission.id, d)))
        {
            session.mission_timer = Some(
                session
                    .scheduler
                    .schedule_at(ScheduledAction::MissionTimeout(id), deadline),
            );
        }
        for failure in save.scripted_failures {
            let handle = session.scheduler.schedule_at(
                ScheduledAction::ScriptedFailure {
                    mission_id: failure.mission_id,
                    cause: failure.cause,
                },
                failure.due_at,
            );
            session.scripted.insert(handle, failure);
        }

        info!(
            username = %session.config.session.username,
            now = %session.clock.now(),
            timers = session.scheduler.len(),
            "session restored"
        );
        Ok(session)
    }

    /// Capture everything needed to resume this session.
    pub fn save(&self) -> SaveState {
        SaveState {
            version: SAVE_VERSION,
            username: self.config.session.username.clone(),
            mail_id: self.config.session.mail_id(),
            seed: self.config.session.seed,
            clock: ClockState {
                now: self.clock.now(),
                speed: self.clock.speed(),
                paused: self.clock.is_paused(),
            },
            inventory: self.inventory.clone(),
            economy: self.economy.snapshot(),
            inbox: self.inbox.clone(),
            message_queue: self.messages.clone(),
            registry: self.registry.clone(),
            connections: self.connections.clone(),
            operations: self.bandwidth.operations().cloned().collect(),
            operation_purposes: self.purposes.clone(),
            pool: self.pool.clone(),
            active_mission: self.active.clone(),
            mission_history: self.history.clone(),
            finalized_missions: self.finalized.clone(),
            scripted_failures: self.scripted.values().copied().collect(),
            fired_events: self.fired_events.clone(),
            game_over: self.game_over,
        }
    }

    // -------------------------------------------------------------------
    // Time
    // -------------------------------------------------------------------

    /// Advance by `real` wall-clock time at the current speed.
    ///
    /// # Errors
    ///
    /// Propagates [`Session::advance_virtual`] errors.
    pub fn advance_real(&mut self, real: Duration) -> Result<AdvanceReport, SessionError> {
        let delta = self.clock.virtual_delta(real);
        self.advance_virtual(delta)
    }

    /// Advance virtual time by `delta`.
    ///
    /// Time moves in steps. Each step ends at the next due timer or the next
    /// economic checkpoint (interest boundary or countdown deadline),
    /// whichever comes first, and the economy is settled at the end of every
    /// step. The outcome is therefore the same whether the window is covered
    /// in one call or many. Nothing happens while paused or after game over,
    /// and the clock stops at the instant the game ends.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Economy`] if interest cannot be posted.
    pub fn advance_virtual(&mut self, delta: TimeDelta) -> Result<AdvanceReport, SessionError> {
        let mut report = AdvanceReport::idle(self.game_over);
        if self.game_over.is_some() || self.clock.is_paused() || delta <= TimeDelta::zero() {
            return Ok(report);
        }

        let start = self.clock.now();
        let target = start.checked_add_signed(delta).unwrap_or(start);
        self.settle_into(&mut report)?;
        while self.game_over.is_none() {
            let now = self.clock.now();
            let checkpoint = self
                .economy
                .next_checkpoint(now)
                .filter(|at| *at < target)
                .unwrap_or(target);
            if let Some(fired) = self.scheduler.pop_due(checkpoint) {
                self.clock.advance_to(fired.due_at);
                report.timers_fired = report.timers_fired.saturating_add(1);
                self.handle_timer(fired);
            } else {
                self.clock.advance_to(checkpoint);
            }
            self.settle_into(&mut report)?;
            let drained = self.scheduler.next_due().is_none_or(|due| due > target);
            if self.clock.now() >= target && drained {
                break;
            }
        }

        report.game_over = self.game_over;
        if self.game_over.is_none() {
            report.refresh = self.refresh_pool_if_needed();
        }
        report.elapsed = self.clock.now().signed_duration_since(start);
        Ok(report)
    }

    /// Change the speed multiplier. Timers keep their virtual instants.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Clock`] for a speed outside the allow-list.
    pub fn set_speed(&mut self, speed: u32) -> Result<(), SessionError> {
        let previous = self.clock.set_speed(speed)?;
        let delays = self.scheduler.reschedule_for_speed(self.clock.now(), speed);
        if previous != speed {
            debug!(timers = delays.len(), "pending timers repriced for new speed");
            self.emit(GameEvent::ClockChanged {
                speed,
                paused: self.clock.is_paused(),
            });
        }
        Ok(())
    }

    /// Freeze virtual time. Returns `false` if already paused.
    pub fn pause(&mut self) -> bool {
        let changed = self.clock.pause();
        if changed {
            self.emit(GameEvent::ClockChanged {
                speed: self.clock.speed(),
                paused: true,
            });
        }
        changed
    }

    /// Unfreeze virtual time. Returns `false` if already running.
    pub fn resume(&mut self) -> bool {
        let changed = self.clock.resume();
        if changed {
            self.emit(GameEvent::ClockChanged {
                speed: self.clock.speed(),
                paused: false,
            });
        }
        changed
    }

    /// Real time the driver may sleep before the next timer is due.
    pub fn next_real_delay(&self) -> Option<Duration> {
        if self.clock.is_paused() || self.game_over.is_some() {
            return None;
        }
        self.scheduler.next_real_delay(self.clock.now())
    }

    // -------------------------------------------------------------------
    // Missions
    // -------------------------------------------------------------------

    /// Accept an offered mission.
    ///
    /// The mission leaves the pool, its networks are merged into the
    /// registry with access granted, and its time limit (if any) starts.
    ///
    /// # Errors
    ///
    /// Fails if the game is over, another mission is active, the mission is
    /// not offered, the player's tier is too low, or a prerequisite mission
    /// has not been completed.
    pub fn accept_mission(&mut self, id: MissionId) -> Result<&ActiveMission, SessionError> {
        self.ensure_running()?;
        if let Some(active) = &self.active {
            return Err(SessionError::MissionAlreadyActive(active.mission.id));
        }
        let mission = self
            .pool
            .get(id)
            .filter(|_| self.pool.is_visible(id))
            .ok_or(SessionError::MissionNotOffered(id))?;
        let current = self.economy.reputation().value();
        if current < mission.min_reputation {
            return Err(SessionError::InsufficientReputation {
                required: mission.min_reputation,
                current,
            });
        }
        if let Some(requires) = mission.requires_completed_mission {
            if !self.pool.completed_missions().contains(&requires) {
                return Err(SessionError::PrerequisiteIncomplete {
                    mission_id: id,
                    requires,
                });
            }
        }

        let mission = self
            .pool
            .remove_mission_from_pool(id)
            .ok_or(SessionError::MissionNotOffered(id))?;
        let now = self.clock.now();
        self.registry.merge_blueprints(&mission.networks);

        let deadline = mission
            .time_limit_minutes
            .and_then(|minutes| now.checked_add_signed(TimeDelta::minutes(i64::from(minutes))));
        if let Some(deadline) = deadline {
            self.mission_timer = Some(
                self.scheduler
                    .schedule_at(ScheduledAction::MissionTimeout(id), deadline),
            );
        }

        info!(
            mission_id = %id,
            client = %mission.client_id,
            title = %mission.title,
            deadline = ?deadline,
            "mission accepted"
        );
        self.emit(GameEvent::MissionAccepted {
            mission_id: id,
            title: mission.title.clone(),
        });
        self.active = Some(ActiveMission {
            mission,
            accepted_at: now,
            deadline,
        });
        self.refresh_pool_if_needed();
        self.active.as_ref().ok_or(SessionError::NoActiveMission)
    }

    /// Give up on the active mission. It fails as incomplete.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActiveMission`] if nothing is in progress.
    pub fn abandon_mission(&mut self) -> Result<Finalization, SessionError> {
        let id = self
            .active
            .as_ref()
            .map(|active| active.mission.id)
            .ok_or(SessionError::NoActiveMission)?;
        info!(mission_id = %id, "mission abandoned");
        self.finalize_mission(id, MissionOutcome::Failure(FailureCause::Incomplete))
    }

    /// Apply a mission's outcome exactly once.
    ///
    /// Posts the payout or penalty, adjusts reputation, queues the client's
    /// message, starts the client cooldown, advances or abandons the arc,
    /// and revokes the mission's networks.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissionNotActive`] if `id` was never active.
    pub fn finalize_mission(
        &mut self,
        id: MissionId,
        outcome: MissionOutcome,
    ) -> Result<Finalization, SessionError> {
        if self.finalized.contains(&id) {
            debug!(mission_id = %id, ?outcome, "duplicate finalization ignored");
            return Ok(Finalization::AlreadyFinalized);
        }
        if !self.active.as_ref().is_some_and(|a| a.mission.id == id) {
            return Err(SessionError::MissionNotActive(id));
        }
        let Some(active) = self.active.take() else {
            return Err(SessionError::NoActiveMission);
        };
        let mission = active.mission;
        let now = self.clock.now();
        self.finalized.insert(id);

        if let Some(handle) = self.mission_timer.take() {
            self.scheduler.cancel(handle);
        }
        let scripted: Vec<TimerHandle> = self
            .scripted
            .iter()
            .filter(|(_, failure)| failure.mission_id == id)
            .map(|(handle, _)| *handle)
            .collect();
        for handle in scripted {
            self.scheduler.cancel(handle);
            self.scripted.remove(&handle);
        }

        let consequences = &mission.consequences;
        let (credits, reputation_delta, template, description) = match outcome {
            MissionOutcome::Success => (
                consequences.success.credits,
                consequences.success.reputation,
                Some(consequences.success.message.clone()),
                format!("Payment: {}", mission.title),
            ),
            MissionOutcome::Failure(cause) => (
                consequences.failure.credits,
                consequences.failure.reputation,
                consequences.failure.message_for(cause).cloned(),
                format!("Penalty: {}", mission.title),
            ),
        };

        if let Err(error) = self.post_credits(credits, description) {
            warn!(mission_id = %id, %error, "mission credits could not be posted");
        }
        let change = self.economy.adjust_reputation(reputation_delta);
        if change.from != change.to {
            self.emit(GameEvent::ReputationChanged {
                from: change.from.value(),
                to: change.to.value(),
                warning: change.warning.map(|w| w.as_str().to_owned()),
            });
        }

        if let Some(template) = template {
            let contact = self
                .clients
                .get(&mission.client_id)
                .map_or_else(|| mission.client_name.clone(), |client| client.contact);
            let (subject, body) = template.render(&[
                ("contact", contact.as_str()),
                ("client", mission.client_name.as_str()),
                ("mission", mission.title.as_str()),
            ]);
            self.enqueue_message(Message::new(mission.client_name.clone(), subject, body));
        }

        self.pool.record_finished(&mission, &self.config.missions, now);
        if let Some(arc_id) = mission.arc_id {
            match outcome {
                MissionOutcome::Success => match self.pool.handle_arc_progression(id, arc_id, now) {
                    ArcProgress::Revealed(revealed) => {
                        self.emit(GameEvent::ArcProgressed { arc_id, revealed });
                    }
                    ArcProgress::Completed { arc_id, name } => {
                        self.emit(GameEvent::ArcCompleted { arc_id, name });
                    }
                    ArcProgress::UnknownArc => {
                        debug!(arc_id = %arc_id, "finished mission's arc is no longer tracked");
                    }
                },
                MissionOutcome::Failure(_) => {
                    let dropped = self.pool.abandon_arc(arc_id);
                    info!(arc_id = %arc_id, dropped, "arc abandoned after failure");
                }
            }
        }

        for blueprint in &mission.networks {
            let accessible = self
                .registry
                .get_network(&blueprint.network_id)
                .is_some_and(|network| network.accessible);
            if accessible {
                self.revoke_network_access(&blueprint.network_id, "Contract concluded");
            }
        }

        info!(
            mission_id = %id,
            ?outcome,
            credits = %credits,
            reputation_delta,
            "mission finalized"
        );
        self.history.push(MissionRecord {
            mission_id: id,
            title: mission.title,
            client_id: mission.client_id,
            outcome,
            finished_at: now,
            credits,
            reputation_delta,
        });
        self.emit(GameEvent::MissionFinished {
            mission_id: id,
            outcome,
            credits,
            reputation_delta,
        });
        self.refresh_pool_if_needed();
        Ok(Finalization::Applied(outcome))
    }

    /// Arrange for the active mission to fail with `cause` after `delay`
    /// of virtual time, unless it finishes first.
    pub fn schedule_scripted_failure(
        &mut self,
        mission_id: MissionId,
        cause: FailureCause,
        delay: TimeDelta,
    ) -> TimerHandle {
        let now = self.clock.now();
        let handle = self.scheduler.schedule(
            ScheduledAction::ScriptedFailure { mission_id, cause },
            delay,
            now,
            self.clock.speed(),
        );
        let due_at = self.scheduler.due_at(handle).unwrap_or(now);
        self.scripted.insert(
            handle,
            ScriptedFailure {
                mission_id,
                cause,
                due_at,
            },
        );
        debug!(mission_id = %mission_id, ?cause, %due_at, "scripted failure armed");
        handle
    }

    // -------------------------------------------------------------------
    // Network actions
    // -------------------------------------------------------------------

    /// Connect to a network the player has access to.
    ///
    /// # Errors
    ///
    /// Fails for an unknown network or one whose access was revoked.
    pub fn connect_network(&mut self, id: &NetworkId) -> Result<(), SessionError> {
        self.ensure_running()?;
        let network = self
            .registry
            .get_network(id)
            .ok_or_else(|| SessionError::UnknownNetwork(id.clone()))?;
        if !network.accessible {
            return Err(SessionError::AccessDenied(id.clone()));
        }
        if self.connections.insert(id.clone()) {
            let entry = self.log_entry("connection", "session opened");
            self.registry.add_network_log(id, entry);
            info!(network_id = %id, "connected to network");
        }
        self.complete_objectives(|objective| {
            objective.objective_type == ObjectiveType::NetworkConnection
                && objective.network_id.as_ref() == Some(id)
        });
        Ok(())
    }

    /// Drop the connection to a network. Returns `false` if not connected.
    pub fn disconnect_network(&mut self, id: &NetworkId) -> bool {
        let removed = self.connections.remove(id);
        if removed {
            info!(network_id = %id, "disconnected from network");
        }
        removed
    }

    /// Start a scan of a connected network. The scan objective completes
    /// when the operation does.
    ///
    /// # Errors
    ///
    /// Fails unless the network exists, is accessible and is connected.
    pub fn scan_network(&mut self, id: &NetworkId) -> Result<Registration, SessionError> {
        self.ensure_running()?;
        self.ensure_connected(id)?;
        let devices = self.registry.get_devices_by_network(id).len().max(1);
        let devices = u32::try_from(devices).unwrap_or(u32::MAX);
        let request = OperationRequest {
            operation_type: OperationType::Scan,
            size_mb: SCAN_MB_PER_DEVICE * f64::from(devices),
            network_id: id.clone(),
            label: format!("Scan {id}"),
            task: None,
        };
        self.start_operation(request, OperationPurpose::Scan { network_id: id.clone() })
    }

    /// Open the file system on a device.
    ///
    /// # Errors
    ///
    /// Fails for an unknown or inaccessible device, a device without a file
    /// system, or a network the player is not connected to.
    pub fn connect_file_system(&mut self, ip: &DeviceIp) -> Result<FileSystemId, SessionError> {
        self.ensure_running()?;
        let (network_id, file_system_id) = self.reachable_device(ip)?;
        let file_system_id = file_system_id.ok_or_else(|| SessionError::NoFileSystem(ip.clone()))?;
        self.complete_objectives(|objective| {
            objective.objective_type == ObjectiveType::FileSystemConnection
                && objective.device_ip.as_ref() == Some(ip)
        });
        debug!(device = %ip, network_id = %network_id, fs = %file_system_id, "file system opened");
        Ok(file_system_id)
    }

    /// Read a device's logs. Needs the investigation tooling.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingCapability`] without the tooling, and
    /// the device reachability errors of [`Session::connect_file_system`].
    pub fn investigate_logs(&mut self, ip: &DeviceIp) -> Result<Vec<LogEntry>, SessionError> {
        self.ensure_running()?;
        if !self.inventory.has(Capability::InvestigationTooling) {
            return Err(SessionError::MissingCapability(Capability::InvestigationTooling));
        }
        self.reachable_device(ip)?;
        let logs = self
            .registry
            .get_device(ip)
            .map(|device| device.logs.clone())
            .unwrap_or_default();
        self.complete_objectives(|objective| {
            objective.objective_type == ObjectiveType::LogInvestigation
                && objective.device_ip.as_ref() == Some(ip)
        });
        Ok(logs)
    }

    /// Start a file operation over the file system's network.
    ///
    /// The transfer size is the sum of the named files' sizes. The effect
    /// lands in the registry when the operation completes.
    ///
    /// # Errors
    ///
    /// Fails for an unknown file system or file, an unreachable device, or
    /// a copy without a (known) destination.
    pub fn begin_file_operation(
        &mut self,
        kind: FileOperationKind,
        file_system_id: &FileSystemId,
        files: Vec<String>,
        destination: Option<FileSystemId>,
    ) -> Result<Registration, SessionError> {
        self.ensure_running()?;
        let file_system = self
            .registry
            .get_file_system(file_system_id)
            .ok_or_else(|| SessionError::UnknownFileSystem(file_system_id.clone()))?;
        let sizes = files
            .iter()
            .map(|name| {
                file_system
                    .file(name)
                    .map(FileEntry::size_mb)
                    .ok_or_else(|| SessionError::UnknownFile {
                        file_system_id: file_system_id.clone(),
                        name: name.clone(),
                    })
            })
            .collect::<Result<Vec<f64>, SessionError>>()?;
        let device_ip = file_system.device_ip.clone();
        let (network_id, _) = self.reachable_device(&device_ip)?;

        if kind == FileOperationKind::Copy {
            let target = destination.as_ref().ok_or(SessionError::MissingDestination)?;
            if self.registry.get_file_system(target).is_none() {
                return Err(SessionError::UnknownFileSystem(target.clone()));
            }
        }

        let request = OperationRequest {
            operation_type: kind.operation_type(),
            size_mb: sizes.iter().sum(),
            network_id,
            label: format!("{kind:?} {} file(s) on {device_ip}", files.len()),
            task: Some(FileTask {
                kind,
                file_system_id: file_system_id.clone(),
                files,
                destination,
            }),
        };
        self.start_operation(request, OperationPurpose::File)
    }

    /// Start an arbitrary bandwidth operation with no completion effect.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Network`] for an unknown network.
    pub fn begin_operation(
        &mut self,
        request: OperationRequest,
    ) -> Result<Registration, SessionError> {
        self.ensure_running()?;
        self.start_operation(request, OperationPurpose::Transfer)
    }

    /// Finish a bandwidth operation now and apply its effect.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownOperation`] if `id` is not active.
    pub fn complete_operation(
        &mut self,
        id: OperationId,
    ) -> Result<BandwidthOperation, SessionError> {
        let now = self.clock.now();
        let operation = self
            .bandwidth
            .complete_operation(id, now)
            .ok_or(SessionError::UnknownOperation(id))?;
        if let Some(handle) = self.operation_timers.remove(&id) {
            self.scheduler.cancel(handle);
        }
        let purpose = self.purposes.remove(&id).unwrap_or(OperationPurpose::Transfer);
        self.reschedule_operation_timers();

        info!(
            operation_id = %id,
            operation_type = ?operation.operation_type,
            label = %operation.label,
            "operation completed"
        );
        self.emit(GameEvent::OperationCompleted {
            operation_id: id,
            operation_type: operation.operation_type,
        });

        match purpose {
            OperationPurpose::Scan { network_id } => {
                let entry = self.log_entry("scan", "network scanned");
                self.registry.add_network_log(&network_id, entry);
                self.complete_objectives(|objective| {
                    objective.objective_type == ObjectiveType::NetworkScan
                        && objective.network_id.as_ref() == Some(&network_id)
                });
            }
            OperationPurpose::File => {
                if let Some(task) = &operation.task {
                    self.apply_file_task(task);
                }
            }
            OperationPurpose::Install { capability } => {
                self.install_software(capability);
            }
            OperationPurpose::Transfer => {}
        }
        Ok(operation)
    }

    /// Revoke access to a network, dropping any connection to it.
    ///
    /// Returns the number of devices cascaded, or `None` for an unknown
    /// network.
    pub fn revoke_network_access(&mut self, id: &NetworkId, reason: &str) -> Option<usize> {
        let devices = self
            .registry
            .revoke_network_access(id, reason, self.clock.now())?;
        self.connections.remove(id);
        self.emit(GameEvent::NetworkRevoked {
            network_id: id.clone(),
            reason: reason.to_owned(),
            devices,
        });
        Some(devices)
    }

    /// Restore access to a network.
    pub fn grant_network_access(&mut self, id: &NetworkId) -> Option<usize> {
        let devices = self.registry.grant_network_access(id, self.clock.now())?;
        self.emit(GameEvent::NetworkGranted {
            network_id: id.clone(),
            devices,
        });
        Some(devices)
    }

    // -------------------------------------------------------------------
    // Economy and inventory
    // -------------------------------------------------------------------

    /// Pay money into the primary account. Countdowns are re-evaluated
    /// immediately.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Economy`] for a non-positive amount or a
    /// bank without accounts.
    pub fn deposit(
        &mut self,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Result<Decimal, SessionError> {
        self.ensure_running()?;
        let now = self.clock.now();
        let description = description.into();
        let account = self
            .economy
            .bank()
            .primary()
            .map(|account| account.id.clone())
            .ok_or(netsim_economy::EconomyError::NoAccounts)?;
        self.economy
            .bank_mut()
            .deposit(&account, amount, description.clone(), now)?;
        let balance = self.economy.bank().total_balance();
        self.emit(GameEvent::CreditsChanged {
            amount,
            balance,
            description,
        });
        self.settle_economy()?;
        Ok(balance)
    }

    /// Install a capability. Returns `false` if it was already installed.
    pub fn install_software(&mut self, capability: Capability) -> bool {
        if !self.inventory.capabilities.insert(capability) {
            return false;
        }
        info!(?capability, "software installed");
        self.emit(GameEvent::SoftwareInstalled { capability });
        self.refresh_pool_if_needed();
        true
    }

    /// Download a capability over the home network; it installs when the
    /// download completes.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Network`] if the home network is missing.
    pub fn begin_software_download(
        &mut self,
        capability: Capability,
    ) -> Result<Registration, SessionError> {
        self.ensure_running()?;
        let request = OperationRequest {
            operation_type: OperationType::Download,
            size_mb: SOFTWARE_DOWNLOAD_MB,
            network_id: NetworkId::new(HOME_NETWORK_ID),
            label: format!("Download {capability:?}"),
            task: None,
        };
        self.start_operation(request, OperationPurpose::Install { capability })
    }

    /// Install a faster (or slower) network adapter. In-flight operations
    /// are repriced and their completion timers moved.
    pub fn upgrade_adapter(&mut self, adapter_mbps: f64) {
        let now = self.clock.now();
        self.bandwidth
            .set_adapter_speed(&self.registry, adapter_mbps, now);
        self.inventory.adapter_mbps = adapter_mbps;
        self.reschedule_operation_timers();
    }

    /// Record a one-shot story event. Returns `true` the first time only.
    pub fn fire_once(&mut self, event_id: &str) -> bool {
        if self.fired_events.contains(event_id) {
            return false;
        }
        self.fired_events.insert(event_id.to_owned());
        debug!(event_id, "one-shot event fired");
        true
    }

    /// Mark an inbox message read. Returns `false` for an unknown id.
    pub fn mark_message_read(&mut self, id: MessageId) -> bool {
        let Some(message) = self.inbox.iter_mut().find(|message| message.id == id) else {
            return false;
        };
        message.read = true;
        true
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    /// Active configuration.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The virtual clock.
    pub const fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    /// Current virtual instant.
    pub const fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Pending timers.
    pub const fn scheduler(&self) -> &Scheduler<ScheduledAction> {
        &self.scheduler
    }

    /// Event bus, for subscribing.
    pub const fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Most recent events, oldest first.
    pub fn journal(&self) -> impl Iterator<Item = &JournalEntry> {
        self.journal.iter()
    }

    /// Networks, devices and file systems.
    pub const fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    /// In-flight bandwidth operations.
    pub const fn bandwidth(&self) -> &BandwidthAllocator {
        &self.bandwidth
    }

    /// Networks the player is connected to.
    pub const fn connections(&self) -> &BTreeSet<NetworkId> {
        &self.connections
    }

    /// Client catalog.
    pub const fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Mission pool.
    pub const fn pool(&self) -> &MissionPool {
        &self.pool
    }

    /// Mission in progress.
    pub const fn active_mission(&self) -> Option<&ActiveMission> {
        self.active.as_ref()
    }

    /// Finished missions, oldest first.
    pub fn mission_history(&self) -> &[MissionRecord] {
        &self.history
    }

    /// Whether `id` has had its consequences applied.
    pub fn is_finalized(&self, id: MissionId) -> bool {
        self.finalized.contains(&id)
    }

    /// Bank, reputation and countdowns.
    pub const fn economy(&self) -> &Economy {
        &self.economy
    }

    /// Delivered messages, oldest first.
    pub fn inbox(&self) -> &[Message] {
        &self.inbox
    }

    /// Messages waiting for delivery.
    pub const fn message_queue(&self) -> &MessageQueue {
        &self.messages
    }

    /// Hardware and software.
    pub const fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Scripted failures still pending.
    pub fn scripted_failures(&self) -> impl Iterator<Item = &ScriptedFailure> {
        self.scripted.values()
    }

    /// Why the session ended, if it did.
    pub const fn game_over(&self) -> Option<GameOverReason> {
        self.game_over
    }

    /// What the pool generator currently unlocks.
    pub fn progression(&self) -> Progression {
        Progression {
            reputation: self.economy.reputation().value(),
            investigation_unlocked: self.inventory.has(Capability::InvestigationTooling),
        }
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn ensure_running(&self) -> Result<(), SessionError> {
        self.game_over.map_or(Ok(()), |reason| Err(SessionError::GameOver(reason)))
    }

    fn ensure_connected(&self, id: &NetworkId) -> Result<(), SessionError> {
        let network = self
            .registry
            .get_network(id)
            .ok_or_else(|| SessionError::UnknownNetwork(id.clone()))?;
        if !network.accessible {
            return Err(SessionError::AccessDenied(id.clone()));
        }
        if !self.connections.contains(id) {
            return Err(SessionError::NotConnected(id.clone()));
        }
        Ok(())
    }

    /// Network and file system of a device the player can reach right now.
    fn reachable_device(
        &self,
        ip: &DeviceIp,
    ) -> Result<(NetworkId, Option<FileSystemId>), SessionError> {
        let device = self
            .registry
            .get_device(ip)
            .ok_or_else(|| SessionError::UnknownDevice(ip.clone()))?;
        self.ensure_connected(&device.network_id)?;
        if !device.accessible {
            return Err(SessionError::AccessDenied(device.network_id.clone()));
        }
        Ok((device.network_id.clone(), device.file_system_id.clone()))
    }

    fn log_entry(&self, action: &str, note: impl Into<String>) -> LogEntry {
        LogEntry {
            action: action.to_owned(),
            actor: self.config.session.username.clone(),
            note: note.into(),
            timestamp: self.clock.now(),
        }
    }

    fn emit(&mut self, event: GameEvent) {
        self.journal.push_back(JournalEntry {
            at: self.clock.now(),
            event: event.clone(),
        });
        while self.journal.len() > JOURNAL_CAPACITY {
            self.journal.pop_front();
        }
        self.events.emit(event);
    }

    fn enqueue_message(&mut self, message: Message) {
        let id = message.id;
        let deliver_at = self.messages.enqueue(message, self.clock.now());
        self.scheduler
            .schedule_at(ScheduledAction::DeliverMessage(id), deliver_at);
    }

    fn post_credits(
        &mut self,
        amount: Decimal,
        description: String,
    ) -> Result<(), netsim_economy::EconomyError> {
        let posted = self
            .economy
            .bank_mut()
            .adjust_primary(amount, description.clone(), self.clock.now())?
            .is_some();
        if posted {
            let balance = self.economy.bank().total_balance();
            self.emit(GameEvent::CreditsChanged {
                amount,
                balance,
                description,
            });
        }
        Ok(())
    }

    fn start_operation(
        &mut self,
        request: OperationRequest,
        purpose: OperationPurpose,
    ) -> Result<Registration, SessionError> {
        let now = self.clock.now();
        let operation_type = request.operation_type;
        let registration = self
            .bandwidth
            .register_operation(&self.registry, request, now)?;
        self.purposes.insert(registration.id, purpose);
        self.reschedule_operation_timers();
        self.emit(GameEvent::OperationStarted {
            operation_id: registration.id,
            operation_type,
            estimated_completion: registration.estimated_completion,
        });
        Ok(registration)
    }

    /// Re-derive every operation's completion timer from current shares.
    ///
    /// Pending timers are moved rather than replaced so operations due at
    /// the same instant keep completing in the order they started.
    fn reschedule_operation_timers(&mut self) {
        let now = self.clock.now();
        let due: Vec<(OperationId, DateTime<Utc>)> = self
            .bandwidth
            .operations()
            .map(|op| (op.id, self.bandwidth.estimated_completion(op.id, now).unwrap_or(now)))
            .collect();
        let mut previous = std::mem::take(&mut self.operation_timers);
        for (id, due_at) in due {
            let handle = match previous.remove(&id) {
                Some(handle) if self.scheduler.reschedule(handle, due_at) => handle,
                _ => self
                    .scheduler
                    .schedule_at(ScheduledAction::CompleteOperation(id), due_at),
            };
            self.operation_timers.insert(id, handle);
        }
        for handle in previous.into_values() {
            self.scheduler.cancel(handle);
        }
    }

    fn handle_timer(&mut self, fired: FiredTimer<ScheduledAction>) {
        match fired.payload {
            ScheduledAction::DeliverMessage(id) => self.deliver_message(id),
            ScheduledAction::CompleteOperation(id) => {
                self.operation_timers.remove(&id);
                if let Err(error) = self.complete_operation(id) {
                    debug!(operation_id = %id, %error, "stale operation timer");
                }
            }
            ScheduledAction::MissionTimeout(id) => {
                self.mission_timer = None;
                info!(mission_id = %id, "mission time limit expired");
                if let Err(error) =
                    self.finalize_mission(id, MissionOutcome::Failure(FailureCause::Incomplete))
                {
                    debug!(mission_id = %id, %error, "stale mission timeout");
                }
            }
            ScheduledAction::ScriptedFailure { mission_id, cause } => {
                self.scripted.remove(&fired.handle);
                self.run_scripted_failure(mission_id, cause);
            }
        }
    }

    fn run_scripted_failure(&mut self, mission_id: MissionId, cause: FailureCause) {
        if cause == FailureCause::AccessRevoked {
            let networks: Vec<NetworkId> = self
                .active
                .as_ref()
                .filter(|active| active.mission.id == mission_id)
                .map(|active| {
                    active
                        .mission
                        .networks
                        .iter()
                        .map(|blueprint| blueprint.network_id.clone())
                        .collect()
                })
                .unwrap_or_default();
            for network_id in &networks {
                self.revoke_network_access(network_id, "Client revoked access");
            }
        }
        match self.finalize_mission(mission_id, MissionOutcome::Failure(cause)) {
            Ok(Finalization::Applied(_)) => {
                info!(mission_id = %mission_id, ?cause, "scripted failure applied");
            }
            Ok(Finalization::AlreadyFinalized) => {}
            Err(error) => debug!(mission_id = %mission_id, %error, "scripted failure skipped"),
        }
    }

    fn deliver_message(&mut self, id: MessageId) {
        let Some(mut message) = self.messages.take(id) else {
            return;
        };
        message.received_at = Some(self.clock.now());
        info!(message_id = %id, from = %message.from, subject = %message.subject, "message delivered");
        self.emit(GameEvent::MessageDelivered {
            message_id: id,
            subject: message.subject.clone(),
        });
        self.inbox.push(message);
    }

    /// Settle the economy and fold the result into `report`.
    fn settle_into(&mut self, report: &mut AdvanceReport) -> Result<(), SessionError> {
        let tick = self.settle_economy()?;
        report.interest = report.interest.saturating_add(tick.interest);
        report.notices.extend(tick.notices);
        Ok(())
    }

    fn settle_economy(&mut self) -> Result<EconomyTick, SessionError> {
        let now = self.clock.now();
        let tick = self.economy.tick(now)?;

        if !tick.interest.is_zero() {
            let balance = self.economy.bank().total_balance();
            self.emit(GameEvent::CreditsChanged {
                amount: tick.interest,
                balance,
                description: "Overdraft interest".to_owned(),
            });
        }
        self.emit_countdown(CountdownKind::Bankruptcy, tick.bankruptcy);
        self.emit_countdown(CountdownKind::Termination, tick.termination);
        for notice in &tick.notices {
            self.enqueue_message(notice.message());
        }
        if let Some(reason) = tick.game_over {
            if self.game_over.is_none() {
                self.game_over = Some(reason);
                warn!(?reason, now = %now, "game over");
                self.emit(GameEvent::GameOver { reason });
            }
        }
        Ok(tick)
    }

    fn emit_countdown(&mut self, countdown: CountdownKind, transition: CountdownTransition) {
        let end = match transition {
            CountdownTransition::Started(active) => Some(active.end),
            CountdownTransition::Cancelled => None,
            CountdownTransition::Idle
            | CountdownTransition::Ticking(_)
            | CountdownTransition::Expired => return,
        };
        self.emit(GameEvent::CountdownChanged { countdown, end });
    }

    fn refresh_pool_if_needed(&mut self) -> Option<RefreshReport> {
        let now = self.clock.now();
        let progression = self.progression();
        let expired = self
            .pool
            .visible_missions()
            .iter()
            .any(|mission| mission.is_expired(now));
        if !expired && !self.pool.should_refresh_pool(&self.config.missions, progression) {
            return None;
        }
        let report = self.pool.refresh_pool(
            &self.config.missions,
            &self.clients,
            progression,
            &mut self.rng,
            now,
        );
        if let Some(arc_id) = report.arc_started {
            info!(arc_id = %arc_id, "story arc offered");
        }
        self.emit(GameEvent::PoolRefreshed {
            generated: report.generated.len(),
            expired: report.expired.len(),
            visible: self.pool.len(),
        });
        Some(report)
    }

    // -------------------------------------------------------------------
    // Objectives
    // -------------------------------------------------------------------

    /// Complete every pending non-verification objective of the active
    /// mission matching `matches`, then check for verification.
    fn complete_objectives(&mut self, matches: impl Fn(&Objective) -> bool) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let mission_id = active.mission.id;
        let mut completed = Vec::new();
        for objective in &mut active.mission.objectives {
            if objective.status == ObjectiveStatus::Pending
                && objective.objective_type != ObjectiveType::Verification
                && matches(objective)
            {
                objective.status = ObjectiveStatus::Complete;
                completed.push(objective.id.clone());
            }
        }
        if completed.is_empty() {
            return;
        }
        for objective_id in completed {
            info!(mission_id = %mission_id, objective = %objective_id, "objective completed");
            self.emit(GameEvent::ObjectiveCompleted {
                mission_id,
                objective_id,
            });
        }
        self.verify_active_mission();
    }

    /// Verification completes on its own once everything else has.
    fn verify_active_mission(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let ready = active
            .mission
            .objectives
            .iter()
            .filter(|o| o.objective_type != ObjectiveType::Verification)
            .all(Objective::is_complete);
        if !ready {
            return;
        }
        let mission_id = active.mission.id;
        let mut verified = Vec::new();
        for objective in &mut active.mission.objectives {
            if objective.objective_type == ObjectiveType::Verification
                && objective.status == ObjectiveStatus::Pending
            {
                objective.status = ObjectiveStatus::Complete;
                verified.push(objective.id.clone());
            }
        }
        for objective_id in verified {
            self.emit(GameEvent::ObjectiveCompleted {
                mission_id,
                objective_id,
            });
        }
        if let Err(error) = self.finalize_mission(mission_id, MissionOutcome::Success) {
            warn!(mission_id = %mission_id, %error, "verified mission could not be finalized");
        }
    }

    fn apply_file_task(&mut self, task: &FileTask) {
        let now = self.clock.now();
        let mut changed = Vec::new();
        for name in &task.files {
            let change = match (task.kind, &task.destination) {
                (FileOperationKind::Repair, _) => self.registry.repair_file(&task.file_system_id, name),
                (FileOperationKind::Recover, _) => {
                    self.registry.recover_file(&task.file_system_id, name)
                }
                (FileOperationKind::Delete, _) => {
                    self.registry.delete_file(&task.file_system_id, name, now)
                }
                (FileOperationKind::SecureDelete, _) => {
                    self.registry
                        .secure_delete_file(&task.file_system_id, name, now)
                }
                (FileOperationKind::Copy, Some(destination)) => {
                    self.registry
                        .copy_file(&task.file_system_id, name, destination)
                }
                (FileOperationKind::Copy, None) => {
                    warn!(file = %name, "copy task without destination");
                    continue;
                }
            };
            if change.is_applied() {
                changed.push(name.clone());
            } else {
                debug!(file = %name, ?change, kind = ?task.kind, "file operation had no effect");
            }
        }

        let device_ip = self
            .registry
            .get_file_system(&task.file_system_id)
            .map(|fs| fs.device_ip.clone());
        if let Some(ip) = device_ip {
            let action = format!("file_{}", operation_log_name(task.kind));
            let entry = self.log_entry(&action, changed.join(", "));
            self.registry.add_device_log(&ip, entry);
        }

        let satisfied: Vec<String> = self
            .active
            .as_ref()
            .map(|active| {
                active
                    .mission
                    .objectives
                    .iter()
                    .filter(|o| {
                        o.objective_type == ObjectiveType::FileOperation
                            && o.status == ObjectiveStatus::Pending
                            && file_objective_satisfied(&self.registry, o)
                    })
                    .map(|o| o.id.clone())
                    .collect()
            })
            .unwrap_or_default();
        self.complete_objectives(|objective| satisfied.contains(&objective.id));

        if matches!(
            task.kind,
            FileOperationKind::Delete | FileOperationKind::SecureDelete
        ) {
            self.fail_if_targets_lost();
        }
    }

    /// A destructive operation that wiped files the active mission needs
    /// fails the mission.
    fn fail_if_targets_lost(&mut self) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        let lost = active
            .mission
            .objectives
            .iter()
            .filter(|o| o.objective_type == ObjectiveType::FileOperation && !o.is_complete())
            .any(|o| targets_lost(&self.registry, o));
        if lost {
            let mission_id = active.mission.id;
            warn!(mission_id = %mission_id, "mission target files destroyed");
            if let Err(error) =
                self.finalize_mission(mission_id, MissionOutcome::Failure(FailureCause::FilesDeleted))
            {
                warn!(mission_id = %mission_id, %error, "failed mission could not be finalized");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const fn operation_log_name(kind: FileOperationKind) -> &'static str {
    match kind {
        FileOperationKind::Repair => "repair",
        FileOperationKind::Copy => "copy",
        FileOperationKind::Delete => "delete",
        FileOperationKind::SecureDelete => "secure_delete",
        FileOperationKind::Recover => "recover",
    }
}

/// Whether the registry now shows the effect a file objective asks for.
fn file_objective_satisfied(registry: &NetworkRegistry, objective: &Objective) -> bool {
    let (Some(kind), Some(ip)) = (objective.operation, objective.device_ip.as_ref()) else {
        return false;
    };
    if objective.target_files.is_empty() {
        return false;
    }
    let source = registry.file_system_for_device(ip);
    let inspected = if kind == FileOperationKind::Copy {
        objective
            .destination
            .as_ref()
            .and_then(|dest| registry.file_system_for_device(dest))
    } else {
        source
    };
    let Some(file_system) = inspected else {
        return false;
    };
    objective.target_files.iter().all(|name| {
        file_system.file(name).is_some_and(|file| match kind {
            FileOperationKind::Repair | FileOperationKind::Copy => file.is_intact(),
            FileOperationKind::Recover => !file.deleted,
            FileOperationKind::Delete => file.deleted,
            FileOperationKind::SecureDelete => file.secure_deleted,
        })
    })
}

/// Whether a non-destructive objective's targets can no longer be served.
fn targets_lost(registry: &NetworkRegistry, objective: &Objective) -> bool {
    let Some(kind) = objective.operation else {
        return false;
    };
    if matches!(
        kind,
        FileOperationKind::Delete | FileOperationKind::SecureDelete
    ) {
        return false;
    }
    let Some(file_system) = objective
        .device_ip
        .as_ref()
        .and_then(|ip| registry.file_system_for_device(ip))
    else {
        return false;
    };
    objective.target_files.iter().any(|name| {
        file_system.file(name).is_some_and(|file| {
            if kind == FileOperationKind::Recover {
                file.secure_deleted
            } else {
                file.deleted
            }
        })
    })
}

fn home_network(now: DateTime<Utc>) -> NetworkBlueprint {
    let ip = DeviceIp::new("192.168.1.10");
    NetworkBlueprint {
        network_id: NetworkId::new(HOME_NETWORK_ID),
        name: "Home Office".to_owned(),
        address: "192.168.1.0/24".to_owned(),
        bandwidth_mbps: 1000.0,
        devices: vec![DeviceBlueprint {
            ip: ip.clone(),
            hostname: "workstation".to_owned(),
            file_system: FileSystem {
                id: FileSystemId::new("home-fs"),
                device_ip: ip,
                files: vec![
                    FileEntry::new("notes.txt", 4_000),
                    FileEntry::new("contracts.db", 12_000_000),
                ],
            },
            logs: vec![LogEntry {
                action: "boot".to_owned(),
                actor: "system".to_owned(),
                note: "workstation online".to_owned(),
                timestamp: now,
            }],
        }],
    }
}
