//! Serial delivery of queued inbox messages.
//!
//! Notices raised in the same tick are not delivered simultaneously: each
//! queued message is scheduled a fixed virtual-time gap after the previous
//! one. An idle queue delivers its first message one gap after enqueueing.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use netsim_types::{Message, MessageId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default gap between deliveries, in virtual seconds.
pub const DEFAULT_MESSAGE_GAP_SECS: i64 = 5;

/// A message waiting for its delivery instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    /// The undelivered message.
    pub message: Message,
    /// Virtual delivery instant.
    pub deliver_at: DateTime<Utc>,
}

/// FIFO of undelivered messages spaced by a fixed gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageQueue {
    /// Spacing between deliveries, in virtual seconds.
    gap_secs: i64,
    /// Delivery instant of the most recently enqueued message.
    last_slot: Option<DateTime<Utc>>,
    /// Pending messages by id.
    pending: BTreeMap<MessageId, QueuedMessage>,
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(DEFAULT_MESSAGE_GAP_SECS))
    }
}

impl MessageQueue {
    /// Create an empty queue with the given gap.
    pub fn new(gap: TimeDelta) -> Self {
        Self {
            gap_secs: gap.num_seconds().max(0),
            last_slot: None,
            pending: BTreeMap::new(),
        }
    }

    /// Gap between deliveries.
    pub const fn gap(&self) -> TimeDelta {
        TimeDelta::seconds(self.gap_secs)
    }

    /// Queue `message` and return its delivery instant: one gap after the
    /// later of `now` and the previous slot.
    pub fn enqueue(&mut self, message: Message, now: DateTime<Utc>) -> DateTime<Utc> {
        let base = self.last_slot.filter(|slot| *slot > now).unwrap_or(now);
        let deliver_at = base.checked_add_signed(self.gap()).unwrap_or(base);
        self.last_slot = Some(deliver_at);
        debug!(
            message_id = %message.id,
            subject = %message.subject,
            %deliver_at,
            "message queued"
        );
        self.pending.insert(
            message.id,
            QueuedMessage {
                message,
                deliver_at,
            },
        );
        deliver_at
    }

    /// Remove a message for delivery.
    pub fn take(&mut self, id: MessageId) -> Option<Message> {
        self.pending.remove(&id).map(|queued| queued.message)
    }

    /// Pending messages in delivery order.
    pub fn pending(&self) -> Vec<&QueuedMessage> {
        let mut queued: Vec<&QueuedMessage> = self.pending.values().collect();
        queued.sort_by_key(|q| q.deliver_at);
        queued
    }

    /// Number of pending messages.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 25, 9, 0, 0).single().unwrap()
    }

    #[test]
    fn burst_is_spaced_by_the_gap() {
        let mut queue = MessageQueue::default();
        let a = queue.enqueue(Message::new("bank", "a", ""), now());
        let b = queue.enqueue(Message::new("bank", "b", ""), now());
        let c = queue.enqueue(Message::new("bank", "c", ""), now());
        assert_eq!(a, now() + TimeDelta::seconds(5));
        assert_eq!(b, now() + TimeDelta::seconds(10));
        assert_eq!(c, now() + TimeDelta::seconds(15));
    }

    #[test]
    fn idle_queue_restarts_from_now() {
        let mut queue = MessageQueue::default();
        queue.enqueue(Message::new("bank", "a", ""), now());
        let later = now() + TimeDelta::minutes(1);
        let slot = queue.enqueue(Message::new("bank", "b", ""), later);
        assert_eq!(slot, later + TimeDelta::seconds(5));
    }

    #[test]
    fn take_removes_once() {
        let mut queue = MessageQueue::default();
        let message = Message::new("bank", "a", "");
        let id = message.id;
        queue.enqueue(message, now());
        assert_eq!(queue.len(), 1);
        assert!(queue.take(id).is_some());
        assert!(queue.take(id).is_none());
        assert!(queue.is_empty());
    }
}
