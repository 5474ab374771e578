//! The bounded, self-refreshing mission pool with storyline arcs.
//!
//! Missions live in an id-indexed arena; the visible list, the pending arc
//! buckets and the completed set refer to them by [`MissionId`] only, so a
//! mission is never duplicated while the pool is mutated.
//!
//! # Invariants
//!
//! - Every id in `visible` and in a pending arc bucket has an arena entry.
//! - A non-arc visible mission's client is in `active_client_ids`; arc
//!   clients never are.
//! - An arc exposes at most one mission at a time: its first mission on
//!   creation, then exactly one more per progression event.
//! - A visible arc mission the player no longer qualifies for is dropped
//!   with the rest of its arc on the next refresh.
//! - Refresh converges: afterwards the pool is at or above the midpoint of
//!   its target range and, once investigation tooling is unlocked, holds an
//!   investigation mission.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::{DateTime, TimeDelta, Utc};
use netsim_types::{ArcId, ClientId, Mission, MissionId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clients::{Client, ClientRegistry, walk_in};
use crate::config::PoolConfig;
use crate::error::MissionError;
use crate::generator::{MissionTemplate, choose_template, generate_mission};
use crate::storylines::{STORYLINES, Storyline, select_clients};

// ---------------------------------------------------------------------------
// Inputs and reports
// ---------------------------------------------------------------------------

/// The player's progression as seen by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progression {
    /// Current reputation tier.
    pub reputation: u8,
    /// Whether investigation tooling is installed.
    pub investigation_unlocked: bool,
}

/// Result of [`MissionPool::handle_arc_progression`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArcProgress {
    /// The next mission in the arc is now visible.
    Revealed(MissionId),
    /// The arc has no missions left.
    Completed {
        /// The finished arc.
        arc_id: ArcId,
        /// Its storyline name.
        name: String,
    },
    /// The arc is not (or no longer) tracked.
    UnknownArc,
}

/// What a refresh changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Missions dropped because they expired or their arc moved out of
    /// reputation reach.
    pub expired: Vec<MissionId>,
    /// Missions added.
    pub generated: Vec<MissionId>,
    /// Missions evicted to make room for an investigation mission.
    pub replaced: Vec<MissionId>,
    /// Arc started during this refresh.
    pub arc_started: Option<ArcId>,
}

/// Everything mission generation needs for one pool operation.
struct Generation<'a, R> {
    /// Sizing and expiry.
    config: &'a PoolConfig,
    /// Client catalog.
    clients: &'a ClientRegistry,
    /// Player progression.
    progression: Progression,
    /// Randomness.
    rng: &'a mut R,
    /// Virtual now.
    now: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// MissionPool
// ---------------------------------------------------------------------------

/// The pool of offered, not yet accepted missions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionPool {
    /// Arena of visible and pending arc missions.
    missions: BTreeMap<MissionId, Mission>,
    /// Offered missions, oldest first.
    visible: Vec<MissionId>,
    /// Clients represented by a visible non-arc mission.
    active_client_ids: BTreeSet<ClientId>,
    /// Unrevealed arc missions, next first.
    pending_arc_missions: BTreeMap<ArcId, VecDeque<MissionId>>,
    /// Storyline name per tracked arc.
    arc_names: BTreeMap<ArcId, String>,
    /// Finished missions.
    completed_missions: BTreeSet<MissionId>,
    /// Clients resting until the given instant.
    client_cooldowns: BTreeMap<ClientId, DateTime<Utc>>,
    /// Last refresh instant.
    last_refresh: Option<DateTime<Utc>>,
}

impl MissionPool {
    /// Create an empty pool.
    pub const fn new() -> Self {
        Self {
            missions: BTreeMap::new(),
            visible: Vec::new(),
            active_client_ids: BTreeSet::new(),
            pending_arc_missions: BTreeMap::new(),
            arc_names: BTreeMap::new(),
            completed_missions: BTreeSet::new(),
            client_cooldowns: BTreeMap::new(),
            last_refresh: None,
        }
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Build the opening pool.
    ///
    /// Picks a size in the progression's target range, optionally opens a
    /// storyline arc, then converges on the size and variety conditions.
    pub fn initialize_pool(
        config: &PoolConfig,
        clients: &ClientRegistry,
        progression: Progression,
        rng: &mut impl Rng,
        now: DateTime<Utc>,
    ) -> Self {
        let mut pool = Self::new();
        let mut generation = Generation {
            config,
            clients,
            progression,
            rng,
            now,
        };
        let target = *config.target(progression.investigation_unlocked);
        let size = generation.rng.random_range(target.min..=target.max.max(target.min));

        pool.maybe_start_arc(&mut generation);
        while pool.visible.len() < size {
            pool.generate_standard(&mut generation, false);
        }
        let mut report = RefreshReport::default();
        pool.converge(&mut generation, &mut report);
        pool.last_refresh = Some(now);

        info!(
            missions = pool.visible.len(),
            investigation_unlocked = progression.investigation_unlocked,
            "mission pool initialized"
        );
        pool
    }

    /// Whether the pool should be refreshed.
    ///
    /// True when the visible count is strictly below the target midpoint,
    /// or (with investigation tooling) when no investigation is offered.
    pub fn should_refresh_pool(&self, config: &PoolConfig, progression: Progression) -> bool {
        let target = config.target(progression.investigation_unlocked);
        if target.below_midpoint(self.visible.len())
            || !self.unreachable_arcs(progression.reputation).is_empty()
        {
            return true;
        }
        progression.investigation_unlocked && !self.has_investigation()
    }

    /// Drop expired missions and generate until the pool converges.
    pub fn refresh_pool(
        &mut self,
        config: &PoolConfig,
        clients: &ClientRegistry,
        progression: Progression,
        rng: &mut impl Rng,
        now: DateTime<Utc>,
    ) -> RefreshReport {
        let mut report = RefreshReport::default();
        self.client_cooldowns.retain(|_, until| *until > now);

        let expired: Vec<MissionId> = self
            .visible
            .iter()
            .copied()
            .filter(|id| self.missions.get(id).is_some_and(|m| m.is_expired(now)))
            .collect();
        for id in expired {
            if self.remove_mission_from_pool(id).is_some() {
                debug!(mission_id = %id, "mission expired");
                report.expired.push(id);
            }
        }

        for (id, arc_id) in self.unreachable_arcs(progression.reputation) {
            if self.remove_mission_from_pool(id).is_some() {
                let dropped = self.abandon_arc(arc_id);
                debug!(mission_id = %id, arc_id = %arc_id, dropped, "arc out of reach");
                report.expired.push(id);
            }
        }

        let mut generation = Generation {
            config,
            clients,
            progression,
            rng,
            now,
        };
        let target = *config.target(progression.investigation_unlocked);
        if self.visible.len() < target.max {
            report.arc_started = self.maybe_start_arc(&mut generation);
        }
        self.converge(&mut generation, &mut report);
        self.last_refresh = Some(now);

        info!(
            expired = report.expired.len(),
            generated = report.generated.len(),
            replaced = report.replaced.len(),
            missions = self.visible.len(),
            "mission pool refreshed"
        );
        report
    }

    /// Remove a visible mission (acceptance, expiry or eviction).
    ///
    /// For non-arc missions the client is released for future generation
    /// unless another visible mission still represents it. Pending arc
    /// missions are not removable this way.
    pub fn remove_mission_from_pool(&mut self, id: MissionId) -> Option<Mission> {
        let position = self.visible.iter().position(|v| *v == id)?;
        self.visible.remove(position);
        let mission = self.missions.remove(&id)?;

        if !mission.is_arc() {
            let still_represented = self.visible.iter().any(|other| {
                self.missions
                    .get(other)
                    .is_some_and(|m| !m.is_arc() && m.client_id == mission.client_id)
            });
            if !still_represented {
                self.active_client_ids.remove(&mission.client_id);
            }
        }
        debug!(mission_id = %id, client = %mission.client_id, "mission removed from pool");
        Some(mission)
    }

    /// Record a finished mission: it joins the completed set and, for
    /// non-arc missions, its client rests for the configured cooldown.
    pub fn record_finished(&mut self, mission: &Mission, config: &PoolConfig, now: DateTime<Utc>) {
        self.completed_missions.insert(mission.id);
        if !mission.is_arc() {
            let until = now
                .checked_add_signed(TimeDelta::minutes(i64::from(config.client_cooldown_minutes)))
                .unwrap_or(now);
            self.client_cooldowns.insert(mission.client_id.clone(), until);
            debug!(client = %mission.client_id, %until, "client cooling down");
        }
    }

    // -------------------------------------------------------------------
    // Arcs
    // -------------------------------------------------------------------

    /// Build an arc from `storyline` with one client per role.
    ///
    /// The first mission becomes visible; the rest wait in the arc's
    /// pending bucket, each requiring its predecessor. Arc missions never
    /// expire and their clients are not marked active.
    ///
    /// # Errors
    ///
    /// Returns [`MissionError::EmptyStoryline`] for a storyline without
    /// roles and [`MissionError::ClientCountMismatch`] when the client list
    /// does not match the roles.
    pub fn generate_mission_arc(
        &mut self,
        storyline: &Storyline,
        clients: &[Client],
        rng: &mut impl Rng,
        now: DateTime<Utc>,
    ) -> Result<ArcId, MissionError> {
        if storyline.roles.is_empty() {
            return Err(MissionError::EmptyStoryline {
                name: storyline.name.to_owned(),
            });
        }
        if clients.len() != storyline.roles.len() {
            return Err(MissionError::ClientCountMismatch {
                name: storyline.name.to_owned(),
                roles: storyline.roles.len(),
                clients: clients.len(),
            });
        }

        let arc_id = ArcId::new();
        let mut ids: VecDeque<MissionId> = VecDeque::with_capacity(clients.len());
        let mut previous: Option<MissionId> = None;
        for (role, client) in storyline.roles.iter().zip(clients) {
            let difficulty = choose_template(client, 0.0, false, rng).difficulty;
            let mut mission = generate_mission(
                client,
                MissionTemplate {
                    mission_type: role.mission_type,
                    difficulty,
                },
                now,
                rng,
            );
            mission.arc_id = Some(arc_id);
            mission.arc_name = Some(storyline.name.to_owned());
            mission.requires_completed_mission = previous;
            mission.expires_at = None;
            previous = Some(mission.id);
            ids.push_back(mission.id);
            self.missions.insert(mission.id, mission);
        }

        if let Some(first) = ids.pop_front() {
            self.visible.push(first);
        }
        self.pending_arc_missions.insert(arc_id, ids);
        self.arc_names.insert(arc_id, storyline.name.to_owned());

        info!(
            arc_id = %arc_id,
            name = storyline.name,
            missions = storyline.roles.len(),
            "storyline arc generated"
        );
        Ok(arc_id)
    }

    /// Advance an arc after `mission_id` completed.
    ///
    /// Reveals exactly one pending mission if any remain; otherwise reports
    /// the arc complete by name and drops its bucket.
    pub fn handle_arc_progression(
        &mut self,
        mission_id: MissionId,
        arc_id: ArcId,
        now: DateTime<Utc>,
    ) -> ArcProgress {
        self.completed_missions.insert(mission_id);
        let Some(bucket) = self.pending_arc_missions.get_mut(&arc_id) else {
            return ArcProgress::UnknownArc;
        };

        if let Some(next) = bucket.pop_front() {
            if let Some(mission) = self.missions.get_mut(&next) {
                mission.created_at = now;
            }
            self.visible.push(next);
            info!(arc_id = %arc_id, mission_id = %next, "arc mission revealed");
            return ArcProgress::Revealed(next);
        }

        self.pending_arc_missions.remove(&arc_id);
        let name = self.arc_names.remove(&arc_id).unwrap_or_default();
        info!(arc_id = %arc_id, name = %name, "arc completed");
        ArcProgress::Completed { arc_id, name }
    }

    /// Abandon an arc (its current mission failed): every unrevealed
    /// mission is discarded. Returns how many were dropped.
    pub fn abandon_arc(&mut self, arc_id: ArcId) -> usize {
        let Some(bucket) = self.pending_arc_missions.remove(&arc_id) else {
            return 0;
        };
        for id in &bucket {
            self.missions.remove(id);
        }
        let dropped = bucket.len();
        self.arc_names.remove(&arc_id);
        info!(arc_id = %arc_id, dropped, "arc abandoned");
        dropped
    }

    // -------------------------------------------------------------------
    // Read accessors
    // -------------------------------------------------------------------

    /// Visible missions, oldest first.
    pub fn visible_missions(&self) -> Vec<&Mission> {
        self.visible
            .iter()
            .filter_map(|id| self.missions.get(id))
            .collect()
    }

    /// Ids of visible missions, oldest first.
    pub fn visible_ids(&self) -> &[MissionId] {
        &self.visible
    }

    /// Number of visible missions.
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    /// Whether no mission is visible.
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Look up a visible or pending mission.
    pub fn get(&self, id: MissionId) -> Option<&Mission> {
        self.missions.get(&id)
    }

    /// Whether `id` is currently offered.
    pub fn is_visible(&self, id: MissionId) -> bool {
        self.visible.contains(&id)
    }

    /// Clients represented by a visible non-arc mission.
    pub const fn active_client_ids(&self) -> &BTreeSet<ClientId> {
        &self.active_client_ids
    }

    /// Unrevealed missions of an arc, next first.
    pub fn pending_arc_missions(&self, arc_id: ArcId) -> Option<&VecDeque<MissionId>> {
        self.pending_arc_missions.get(&arc_id)
    }

    /// Storyline name of a tracked arc.
    pub fn arc_name(&self, arc_id: ArcId) -> Option<&str> {
        self.arc_names.get(&arc_id).map(String::as_str)
    }

    /// Whether any arc is in progress.
    pub fn has_active_arc(&self) -> bool {
        !self.pending_arc_missions.is_empty()
    }

    /// Finished missions.
    pub const fn completed_missions(&self) -> &BTreeSet<MissionId> {
        &self.completed_missions
    }

    /// Last refresh instant.
    pub const fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }

    /// Whether `client` is resting at `now`.
    pub fn is_cooling_down(&self, client: &ClientId, now: DateTime<Utc>) -> bool {
        self.client_cooldowns
            .get(client)
            .is_some_and(|until| *until > now)
    }

    /// Whether a visible mission is an investigation.
    pub fn has_investigation(&self) -> bool {
        self.visible_missions()
            .iter()
            .any(|m| m.mission_type.is_investigation())
    }

    // -------------------------------------------------------------------
    // Generation internals
    // -------------------------------------------------------------------

    /// Generate until the size and variety conditions hold.
    fn converge<R: Rng>(&mut self, generation: &mut Generation<'_, R>, report: &mut RefreshReport) {
        let unlocked = generation.progression.investigation_unlocked;
        let target = *generation.config.target(unlocked);
        let mut budget = target.max.saturating_mul(4).max(8);

        while budget > 0 {
            budget = budget.saturating_sub(1);
            let size = self.visible.len();
            let size_ok = !target.below_midpoint(size);
            let variety_ok = !unlocked || self.has_investigation();
            if size_ok && variety_ok {
                return;
            }

            if size >= target.max {
                // Full but lacking variety: evict the oldest ordinary mission.
                if let Some(oldest) = self.oldest_non_arc() {
                    if self.remove_mission_from_pool(oldest).is_some() {
                        report.replaced.push(oldest);
                    }
                    let id = self.generate_standard(generation, true);
                    report.generated.push(id);
                }
                return;
            }

            let force = !variety_ok && (size_ok || size.saturating_add(1) >= target.max);
            let id = self.generate_standard(generation, force);
            report.generated.push(id);
        }
    }

    /// Generate one non-arc mission and make it visible.
    fn generate_standard<R: Rng>(
        &mut self,
        generation: &mut Generation<'_, R>,
        force_investigation: bool,
    ) -> MissionId {
        let client = self.pick_client(generation);
        let target = generation
            .config
            .target(generation.progression.investigation_unlocked);
        let template = choose_template(
            &client,
            target.investigation_chance,
            force_investigation,
            generation.rng,
        );
        let mut mission = generate_mission(&client, template, generation.now, generation.rng);

        let min = generation.config.expiry_min_minutes;
        let max = generation.config.expiry_max_minutes.max(min);
        let minutes = generation.rng.random_range(min..=max);
        mission.expires_at = generation
            .now
            .checked_add_signed(TimeDelta::minutes(i64::from(minutes)));

        let id = mission.id;
        self.active_client_ids.insert(mission.client_id.clone());
        self.missions.insert(id, mission);
        self.visible.push(id);
        id
    }

    /// Choose a client, falling back from "accessible, idle and rested" to
    /// "accessible" to "anyone in the catalog" to the walk-in client.
    fn pick_client<R: Rng>(&self, generation: &mut Generation<'_, R>) -> Client {
        let accessible = generation
            .clients
            .get_accessible_clients(generation.progression.reputation);
        let fresh: Vec<&Client> = accessible
            .iter()
            .copied()
            .filter(|c| {
                !self.active_client_ids.contains(&c.id)
                    && !self.is_cooling_down(&c.id, generation.now)
            })
            .collect();

        let candidates: Vec<&Client> = if !fresh.is_empty() {
            fresh
        } else if !accessible.is_empty() {
            accessible
        } else {
            generation.clients.all().iter().collect()
        };
        if candidates.is_empty() {
            return walk_in();
        }
        let idx = generation.rng.random_range(0..candidates.len());
        candidates
            .get(idx)
            .map_or_else(walk_in, |client| (*client).clone())
    }

    /// Possibly open a storyline arc.
    fn maybe_start_arc<R: Rng>(&mut self, generation: &mut Generation<'_, R>) -> Option<ArcId> {
        let config = generation.config;
        if generation.progression.reputation < config.arc_min_reputation
            || self.has_active_arc()
            || config.arc_chance <= 0.0
            || !generation.rng.random_bool(config.arc_chance.min(1.0))
        {
            return None;
        }
        let storyline = STORYLINES.get(generation.rng.random_range(0..STORYLINES.len()))?;
        let clients = select_clients(
            storyline,
            generation.clients,
            generation.progression.reputation,
            generation.rng,
        )?;
        self.generate_mission_arc(storyline, &clients, generation.rng, generation.now)
            .ok()
    }

    /// Visible arc missions whose client now wants more than `reputation`,
    /// with their arcs.
    fn unreachable_arcs(&self, reputation: u8) -> Vec<(MissionId, ArcId)> {
        self.visible
            .iter()
            .filter_map(|id| {
                let mission = self.missions.get(id)?;
                let arc_id = mission.arc_id?;
                (mission.min_reputation > reputation).then_some((*id, arc_id))
            })
            .collect()
    }

    /// Oldest visible mission that is not part of an arc.
    fn oldest_non_arc(&self) -> Option<MissionId> {
        self.visible
            .iter()
            .copied()
            .find(|id| self.missions.get(id).is_some_and(|m| !m.is_arc()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 25, 9, 0, 0).single().unwrap()
    }

    const ROOKIE: Progression = Progression {
        reputation: 1,
        investigation_unlocked: false,
    };

    const TOOLED: Progression = Progression {
        reputation: 1,
        investigation_unlocked: true,
    };

    fn no_arcs() -> PoolConfig {
        PoolConfig {
            arc_chance: 0.0,
            ..PoolConfig::default()
        }
    }

    #[test]
    fn initial_pool_respects_standard_range() {
        let config = PoolConfig::default();
        let clients = ClientRegistry::standard();
        for seed in 0..40 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let pool = MissionPool::initialize_pool(&config, &clients, ROOKIE, &mut rng, now());
            assert!((4..=6).contains(&pool.len()), "seed {seed}: {}", pool.len());
            assert!(!pool.has_investigation());
        }
    }

    #[test]
    fn investigation_tooling_widens_pool_and_adds_variety() {
        let config = PoolConfig::default();
        let clients = ClientRegistry::standard();
        let mut saw_investigation = false;
        for seed in 0..40 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let pool = MissionPool::initialize_pool(&config, &clients, TOOLED, &mut rng, now());
            assert!((5..=8).contains(&pool.len()), "seed {seed}: {}", pool.len());
            saw_investigation |= pool.has_investigation();
        }
        assert!(saw_investigation);
    }

    #[test]
    fn refresh_triggers_below_midpoint() {
        let config = no_arcs();
        let clients = ClientRegistry::standard();
        let mut rng = SmallRng::seed_from_u64(9);
        let mut pool = MissionPool::initialize_pool(&config, &clients, ROOKIE, &mut rng, now());
        while pool.len() >= 5 {
            let id = pool.visible_ids()[0];
            pool.remove_mission_from_pool(id);
        }
        assert!(pool.should_refresh_pool(&config, ROOKIE));
        pool.refresh_pool(&config, &clients, ROOKIE, &mut rng, now());
        assert!(pool.len() >= 5);
        assert!(!pool.should_refresh_pool(&config, ROOKIE));
    }

    #[test]
    fn refresh_triggers_on_missing_investigation_variety() {
        let config = no_arcs();
        let clients = ClientRegistry::standard();
        let mut rng = SmallRng::seed_from_u64(4);
        // Start without tooling, at maximum size.
        let mut pool = MissionPool::initialize_pool(&config, &clients, ROOKIE, &mut rng, now());
        assert!(!pool.has_investigation());
        assert!(pool.should_refresh_pool(&config, TOOLED));

        let report = pool.refresh_pool(&config, &clients, TOOLED, &mut rng, now());
        assert!(pool.has_investigation());
        assert!(pool.len() <= 8);
        assert!(!report.generated.is_empty());
    }

    #[test]
    fn full_pool_without_variety_replaces_oldest() {
        let config = PoolConfig {
            advanced: crate::config::PoolTarget {
                min: 4,
                max: 6,
                investigation_chance: 0.0,
            },
            ..no_arcs()
        };
        let clients = ClientRegistry::standard();
        let mut rng = SmallRng::seed_from_u64(12);
        let mut pool = MissionPool::new();
        {
            let mut generation = Generation {
                config: &config,
                clients: &clients,
                progression: ROOKIE,
                rng: &mut rng,
                now: now(),
            };
            for _ in 0..6 {
                pool.generate_standard(&mut generation, false);
            }
        }
        assert!(!pool.has_investigation());
        let oldest = pool.visible_ids()[0];

        let report = pool.refresh_pool(&config, &clients, TOOLED, &mut rng, now());
        assert_eq!(report.replaced, vec![oldest]);
        assert_eq!(pool.len(), 6);
        assert!(pool.has_investigation());
    }

    #[test]
    fn refresh_drops_expired_missions_first() {
        let config = no_arcs();
        let clients = ClientRegistry::standard();
        let mut rng = SmallRng::seed_from_u64(21);
        let mut pool = MissionPool::initialize_pool(&config, &clients, ROOKIE, &mut rng, now());
        let before: Vec<MissionId> = pool.visible_ids().to_vec();

        let later = now() + TimeDelta::minutes(91);
        let report = pool.refresh_pool(&config, &clients, ROOKIE, &mut rng, later);
        assert_eq!(report.expired.len(), before.len());
        assert!(before.iter().all(|id| !pool.is_visible(*id)));
        assert!(pool.len() >= 5);
    }

    #[test]
    fn empty_catalog_still_converges() {
        let config = no_arcs();
        let clients = ClientRegistry::new(Vec::new());
        let mut rng = SmallRng::seed_from_u64(5);
        let pool = MissionPool::initialize_pool(&config, &clients, TOOLED, &mut rng, now());
        assert!(pool.len() >= 5);
        assert!(pool.visible_missions().iter().all(|m| m.client_id.as_str() == "walk-in"));
    }

    #[test]
    fn removal_releases_non_arc_clients() {
        let config = no_arcs();
        let clients = ClientRegistry::standard();
        let mut rng = SmallRng::seed_from_u64(8);
        let mut pool = MissionPool::initialize_pool(&config, &clients, ROOKIE, &mut rng, now());
        let mission = pool.visible_missions()[0].clone();
        let shared = pool
            .visible_missions()
            .iter()
            .filter(|m| m.client_id == mission.client_id)
            .count();

        pool.remove_mission_from_pool(mission.id).unwrap();
        assert_eq!(
            pool.active_client_ids().contains(&mission.client_id),
            shared > 1
        );
        assert!(pool.remove_mission_from_pool(mission.id).is_none());
    }

    #[test]
    fn arc_reveals_one_mission_at_a_time() {
        let clients = ClientRegistry::standard();
        let mut rng = SmallRng::seed_from_u64(77);
        let mut pool = MissionPool::new();
        let storyline = &STORYLINES[0];
        let chosen = select_clients(storyline, &clients, 11, &mut rng).unwrap();
        let arc_id = pool
            .generate_mission_arc(storyline, &chosen, &mut rng, now())
            .unwrap();

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.pending_arc_missions(arc_id).unwrap().len(), 2);
        assert!(pool.active_client_ids().is_empty());

        let first = pool.visible_ids()[0];
        assert!(pool.get(first).unwrap().requires_completed_mission.is_none());
        pool.remove_mission_from_pool(first).unwrap();
        assert!(pool.active_client_ids().is_empty());

        let ArcProgress::Revealed(second) = pool.handle_arc_progression(first, arc_id, now()) else {
            panic!("expected a revealed mission");
        };
        assert_eq!(pool.len(), 1);
        assert_eq!(
            pool.get(second).unwrap().requires_completed_mission,
            Some(first)
        );
        pool.remove_mission_from_pool(second).unwrap();

        let ArcProgress::Revealed(third) = pool.handle_arc_progression(second, arc_id, now()) else {
            panic!("expected a revealed mission");
        };
        pool.remove_mission_from_pool(third).unwrap();

        let done = pool.handle_arc_progression(third, arc_id, now());
        assert_eq!(
            done,
            ArcProgress::Completed {
                arc_id,
                name: "The Ransomware Trail".to_owned()
            }
        );
        assert!(pool.pending_arc_missions(arc_id).is_none());
        assert_eq!(pool.completed_missions().len(), 3);
        assert!(!pool.has_active_arc());
    }

    #[test]
    fn arc_missions_do_not_expire() {
        let clients = ClientRegistry::standard();
        let mut rng = SmallRng::seed_from_u64(2);
        let mut pool = MissionPool::new();
        let storyline = &STORYLINES[1];
        let chosen = select_clients(storyline, &clients, 11, &mut rng).unwrap();
        pool.generate_mission_arc(storyline, &chosen, &mut rng, now())
            .unwrap();
        assert!(pool.visible_missions()[0].expires_at.is_none());
    }

    #[test]
    fn refresh_drops_arcs_out_of_reputation_reach() {
        let config = no_arcs();
        let clients = ClientRegistry::standard();
        let mut rng = SmallRng::seed_from_u64(14);
        let mut pool = MissionPool::new();
        let storyline = &STORYLINES[0];
        let chosen = select_clients(storyline, &clients, 11, &mut rng).unwrap();
        let arc_id = pool
            .generate_mission_arc(storyline, &chosen, &mut rng, now())
            .unwrap();
        let first = pool.visible_ids()[0];
        pool.missions.get_mut(&first).unwrap().min_reputation = 5;
        assert!(pool.should_refresh_pool(&config, ROOKIE));

        let report = pool.refresh_pool(&config, &clients, ROOKIE, &mut rng, now());

        assert!(report.expired.contains(&first));
        assert!(!pool.is_visible(first));
        assert!(pool.pending_arc_missions(arc_id).is_none());
        assert!(pool.arc_name(arc_id).is_none());
        assert!(!pool.has_active_arc());
        assert!(pool.visible_missions().iter().all(|m| !m.is_arc()));
    }

    #[test]
    fn mismatched_clients_are_rejected() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut pool = MissionPool::new();
        let result = pool.generate_mission_arc(&STORYLINES[0], &[], &mut rng, now());
        assert!(matches!(
            result,
            Err(MissionError::ClientCountMismatch { roles: 3, clients: 0, .. })
        ));
    }

    #[test]
    fn cooldown_keeps_client_out_of_fresh_candidates() {
        let config = no_arcs();
        let only = vec![ClientRegistry::standard().all()[0].clone()];
        let clients = ClientRegistry::new(only);
        let mut pool = MissionPool::new();
        let mission = {
            let mut rng = SmallRng::seed_from_u64(1);
            let mut generation = Generation {
                config: &config,
                clients: &clients,
                progression: ROOKIE,
                rng: &mut rng,
                now: now(),
            };
            let id = pool.generate_standard(&mut generation, false);
            pool.remove_mission_from_pool(id).unwrap()
        };
        pool.record_finished(&mission, &config, now());
        assert!(pool.is_cooling_down(&mission.client_id, now() + TimeDelta::minutes(9)));
        assert!(!pool.is_cooling_down(&mission.client_id, now() + TimeDelta::minutes(10)));
        assert!(pool.completed_missions().contains(&mission.id));
    }

    #[test]
    fn pool_survives_json_roundtrip() {
        let config = PoolConfig::default();
        let clients = ClientRegistry::standard();
        let mut rng = SmallRng::seed_from_u64(31);
        let pool = MissionPool::initialize_pool(&config, &clients, TOOLED, &mut rng, now());
        let json = serde_json::to_string(&pool).unwrap();
        let back: MissionPool = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pool);
    }
}
