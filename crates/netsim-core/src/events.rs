//! Synchronous, typed publish/subscribe for kernel events.
//!
//! Event names are an enumerated [`EventKind`]; payloads are the variants of
//! [`GameEvent`]. Subscribers run synchronously in registration order. A
//! failing subscriber is logged and reported but never stops its siblings.
//!
//! Re-entrant emission goes through the [`Outbox`] handed to every handler:
//! events pushed there are dispatched after the current event's subscribers
//! finish, first in first out. Ordering is guaranteed per event kind only.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use netsim_types::{
    ArcId, Capability, GameOverReason, MessageId, MissionId, MissionOutcome, NetworkId,
    OperationId, OperationType,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Upper bound on events dispatched by one [`EventBus::emit`] call,
/// including re-entrant ones.
pub const MAX_CASCADE: usize = 256;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Enumerated event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A mission was accepted from the pool.
    MissionAccepted,
    /// An objective of the active mission completed.
    ObjectiveCompleted,
    /// A mission was finalized.
    MissionFinished,
    /// An arc revealed its next mission.
    ArcProgressed,
    /// An arc ran out of missions.
    ArcCompleted,
    /// The mission pool was refreshed.
    PoolRefreshed,
    /// Access to a network was revoked.
    NetworkRevoked,
    /// Access to a network was granted.
    NetworkGranted,
    /// A bandwidth operation started.
    OperationStarted,
    /// A bandwidth operation finished.
    OperationCompleted,
    /// A queued message reached the inbox.
    MessageDelivered,
    /// Credits were posted to the bank.
    CreditsChanged,
    /// The reputation tier moved.
    ReputationChanged,
    /// A game-ending countdown started or was cancelled.
    CountdownChanged,
    /// A capability was installed.
    SoftwareInstalled,
    /// The clock speed, or its paused state, changed.
    ClockChanged,
    /// The session ended.
    GameOver,
}

/// Which countdown a [`GameEvent::CountdownChanged`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownKind {
    /// Deep-debt countdown.
    Bankruptcy,
    /// Lowest-tier countdown.
    Termination,
}

/// A kernel event with its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A mission was accepted.
    MissionAccepted {
        /// Accepted mission.
        mission_id: MissionId,
        /// Its title.
        title: String,
    },
    /// An objective completed.
    ObjectiveCompleted {
        /// Owning mission.
        mission_id: MissionId,
        /// Objective id within the mission.
        objective_id: String,
    },
    /// A mission was finalized.
    MissionFinished {
        /// Finalized mission.
        mission_id: MissionId,
        /// Success or failure cause.
        outcome: MissionOutcome,
        /// Credits posted.
        credits: Decimal,
        /// Reputation delta applied.
        reputation_delta: i8,
    },
    /// An arc revealed its next mission.
    ArcProgressed {
        /// The arc.
        arc_id: ArcId,
        /// Newly visible mission.
        revealed: MissionId,
    },
    /// An arc finished.
    ArcCompleted {
        /// The arc.
        arc_id: ArcId,
        /// Storyline name.
        name: String,
    },
    /// The pool was refreshed.
    PoolRefreshed {
        /// Missions generated.
        generated: usize,
        /// Missions dropped on expiry.
        expired: usize,
        /// Visible missions afterwards.
        visible: usize,
    },
    /// Access to a network was revoked.
    NetworkRevoked {
        /// The network.
        network_id: NetworkId,
        /// Why.
        reason: String,
        /// Devices cascaded.
        devices: usize,
    },
    /// Access to a network was granted.
    NetworkGranted {
        /// The network.
        network_id: NetworkId,
        /// Devices cascaded.
        devices: usize,
    },
    /// A bandwidth operation started.
    OperationStarted {
        /// The operation.
        operation_id: OperationId,
        /// Its kind.
        operation_type: OperationType,
        /// Completion estimate at the current share.
        estimated_completion: DateTime<Utc>,
    },
    /// A bandwidth operation finished.
    OperationCompleted {
        /// The operation.
        operation_id: OperationId,
        /// Its kind.
        operation_type: OperationType,
    },
    /// A message reached the inbox.
    MessageDelivered {
        /// The message.
        message_id: MessageId,
        /// Its subject.
        subject: String,
    },
    /// Credits were posted.
    CreditsChanged {
        /// Signed amount.
        amount: Decimal,
        /// Total balance afterwards.
        balance: Decimal,
        /// Transaction description.
        description: String,
    },
    /// The reputation tier moved.
    ReputationChanged {
        /// Previous tier.
        from: u8,
        /// New tier.
        to: u8,
        /// Warning issued by the transition.
        warning: Option<String>,
    },
    /// A countdown started (`end` set) or was cancelled (`end` unset).
    CountdownChanged {
        /// Which countdown.
        countdown: CountdownKind,
        /// Expiry instant while running.
        end: Option<DateTime<Utc>>,
    },
    /// A capability was installed.
    SoftwareInstalled {
        /// The capability.
        capability: Capability,
    },
    /// Speed or pause state changed.
    ClockChanged {
        /// Speed multiplier in force.
        speed: u32,
        /// Whether the clock is paused.
        paused: bool,
    },
    /// The session ended.
    GameOver {
        /// Why.
        reason: GameOverReason,
    },
}

impl GameEvent {
    /// The event's name.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::MissionAccepted { .. } => EventKind::MissionAccepted,
            Self::ObjectiveCompleted { .. } => EventKind::ObjectiveCompleted,
            Self::MissionFinished { .. } => EventKind::MissionFinished,
            Self::ArcProgressed { .. } => EventKind::ArcProgressed,
            Self::ArcCompleted { .. } => EventKind::ArcCompleted,
            Self::PoolRefreshed { .. } => EventKind::PoolRefreshed,
            Self::NetworkRevoked { .. } => EventKind::NetworkRevoked,
            Self::NetworkGranted { .. } => EventKind::NetworkGranted,
            Self::OperationStarted { .. } => EventKind::OperationStarted,
            Self::OperationCompleted { .. } => EventKind::OperationCompleted,
            Self::MessageDelivered { .. } => EventKind::MessageDelivered,
            Self::CreditsChanged { .. } => EventKind::CreditsChanged,
            Self::ReputationChanged { .. } => EventKind::ReputationChanged,
            Self::CountdownChanged { .. } => EventKind::CountdownChanged,
            Self::SoftwareInstalled { .. } => EventKind::SoftwareInstalled,
            Self::ClockChanged { .. } => EventKind::ClockChanged,
            Self::GameOver { .. } => EventKind::GameOver,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Error returned by a failing subscriber.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    /// What went wrong.
    pub message: String,
}

impl HandlerError {
    /// Create a handler error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Events raised by handlers, dispatched after the current event.
#[derive(Debug, Default)]
pub struct Outbox {
    /// Queued events, oldest first.
    queued: VecDeque<GameEvent>,
}

impl Outbox {
    /// Queue an event for dispatch.
    pub fn push(&mut self, event: GameEvent) {
        self.queued.push_back(event);
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }
}

/// A subscriber callback.
pub type Handler = Box<dyn FnMut(&GameEvent, &mut Outbox) -> Result<(), HandlerError> + Send>;

/// Identifies one subscription for [`EventBus::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A subscriber that failed during [`EventBus::emit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    /// Failing subscription.
    pub subscription: SubscriptionId,
    /// Event it was handling.
    pub kind: EventKind,
    /// The error it returned.
    pub error: HandlerError,
}

/// Outcome of one [`EventBus::emit`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitReport {
    /// Events dispatched, including re-entrant ones.
    pub dispatched: usize,
    /// Successful handler invocations.
    pub delivered: usize,
    /// Failed handler invocations.
    pub failures: Vec<HandlerFailure>,
    /// Whether dispatch stopped at [`MAX_CASCADE`].
    pub truncated: bool,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Directory from event kind to ordered subscribers.
#[derive(Default)]
pub struct EventBus {
    /// Subscribers per kind, in registration order.
    subscribers: BTreeMap<EventKind, Vec<(SubscriptionId, Handler)>>,
    /// Next subscription number.
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<EventKind, usize> = self
            .subscribers
            .iter()
            .map(|(kind, subs)| (*kind, subs.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("subscribers", &counts)
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl EventBus {
    /// Create a bus with no subscribers.
    pub const fn new() -> Self {
        Self {
            subscribers: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Subscribe `handler` to `kind`.
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&GameEvent, &mut Outbox) -> Result<(), HandlerError> + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.subscribers
            .entry(kind)
            .or_default()
            .push((id, Box::new(handler)));
        debug!(?kind, subscription = %id, "subscriber added");
        id
    }

    /// Remove exactly the subscription `id` from `kind`.
    pub fn off(&mut self, kind: EventKind, id: SubscriptionId) -> bool {
        let Some(subs) = self.subscribers.get_mut(&kind) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|(sub, _)| *sub != id);
        let removed = subs.len() != before;
        if subs.is_empty() {
            self.subscribers.remove(&kind);
        }
        removed
    }

    /// Dispatch `event` and everything its handlers queue.
    pub fn emit(&mut self, event: GameEvent) -> EmitReport {
        let mut report = EmitReport::default();
        let mut queue = VecDeque::from([event]);
        let mut outbox = Outbox::default();

        while let Some(current) = queue.pop_front() {
            if report.dispatched >= MAX_CASCADE {
                warn!(
                    limit = MAX_CASCADE,
                    dropped = queue.len().saturating_add(1),
                    "event cascade limit reached"
                );
                report.truncated = true;
                break;
            }
            report.dispatched = report.dispatched.saturating_add(1);
            let kind = current.kind();

            if let Some(subs) = self.subscribers.get_mut(&kind) {
                for (id, handler) in subs.iter_mut() {
                    match handler(&current, &mut outbox) {
                        Ok(()) => report.delivered = report.delivered.saturating_add(1),
                        Err(error) => {
                            warn!(?kind, subscription = %id, %error, "event subscriber failed");
                            report.failures.push(HandlerFailure {
                                subscription: *id,
                                kind,
                                error,
                            });
                        }
                    }
                }
            }
            queue.append(&mut outbox.queued);
        }
        report
    }

    /// Drop every subscription.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    /// Number of subscribers for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.get(&kind).map_or(0, Vec::len)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn paused() -> GameEvent {
        GameEvent::ClockChanged {
            speed: 1,
            paused: true,
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> impl FnMut(&GameEvent, &mut Outbox) -> Result<(), HandlerError> + Send + 'static {
        let log = Arc::clone(log);
        let tag = tag.to_owned();
        move |event, _| {
            log.lock().unwrap().push(format!("{tag}:{:?}", event.kind()));
            Ok(())
        }
    }

    #[test]
    fn subscribers_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.on(EventKind::ClockChanged, recorder(&log, "a"));
        bus.on(EventKind::ClockChanged, recorder(&log, "b"));
        bus.on(EventKind::GameOver, recorder(&log, "c"));

        let report = bus.emit(paused());
        assert_eq!(report.delivered, 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:ClockChanged".to_owned(), "b:ClockChanged".to_owned()]
        );
    }

    #[test]
    fn failing_subscriber_does_not_stop_siblings() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        let bad = bus.on(EventKind::ClockChanged, |_, _| Err(HandlerError::new("boom")));
        bus.on(EventKind::ClockChanged, recorder(&log, "after"));

        let report = bus.emit(paused());
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].subscription, bad);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn off_removes_exactly_one_subscription() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        let first = bus.on(EventKind::ClockChanged, recorder(&log, "a"));
        bus.on(EventKind::ClockChanged, recorder(&log, "b"));

        assert!(bus.off(EventKind::ClockChanged, first));
        assert!(!bus.off(EventKind::ClockChanged, first));
        assert_eq!(bus.subscriber_count(EventKind::ClockChanged), 1);
        bus.emit(paused());
        assert_eq!(*log.lock().unwrap(), vec!["b:ClockChanged".to_owned()]);
    }

    #[test]
    fn reentrant_events_dispatch_after_current_subscribers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.on(EventKind::ClockChanged, |_, outbox| {
            outbox.push(GameEvent::GameOver {
                reason: GameOverReason::Bankruptcy,
            });
            Ok(())
        });
        bus.on(EventKind::ClockChanged, recorder(&log, "clock"));
        bus.on(EventKind::GameOver, recorder(&log, "over"));

        let report = bus.emit(paused());
        assert_eq!(report.dispatched, 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["clock:ClockChanged".to_owned(), "over:GameOver".to_owned()]
        );
    }

    #[test]
    fn runaway_cascades_are_truncated() {
        let mut bus = EventBus::new();
        bus.on(EventKind::ClockChanged, |event, outbox| {
            outbox.push(event.clone());
            Ok(())
        });
        let report = bus.emit(paused());
        assert!(report.truncated);
        assert_eq!(report.dispatched, MAX_CASCADE);
    }

    #[test]
    fn clear_drops_everything() {
        let mut bus = EventBus::new();
        bus.on(EventKind::GameOver, |_, _| Ok(()));
        bus.clear();
        assert_eq!(bus.subscriber_count(EventKind::GameOver), 0);
        assert_eq!(bus.emit(paused()).delivered, 0);
    }
}
