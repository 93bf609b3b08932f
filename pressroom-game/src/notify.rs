//! Notification records published by the session.
//!
//! The core never renders anything: every user-visible event becomes a
//! [`Notification`] in an outbox the caller drains, and a bounded history the
//! UI can filter.
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::clock::SimTime;
use crate::orders::Rarity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Order,
    Employee,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

/// A human-readable event with tags for display and filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub seq: u64,
    pub at: SimTime,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rarity: Option<Rarity>,
    pub polarity: Polarity,
    pub key: String,
    pub message: String,
}

/// Receiver for notifications forwarded out of the session.
pub trait NotificationSink {
    fn publish(&mut self, notification: &Notification);
}

impl NotificationSink for Vec<Notification> {
    fn publish(&mut self, notification: &Notification) {
        self.push(notification.clone());
    }
}

/// History filter; `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub category: Option<Category>,
    pub rarity: Option<Rarity>,
    pub polarity: Option<Polarity>,
}

impl HistoryFilter {
    #[must_use]
    pub fn matches(&self, notification: &Notification) -> bool {
        self.category.is_none_or(|c| c == notification.category)
            && self.rarity.is_none_or(|r| notification.rarity == Some(r))
            && self.polarity.is_none_or(|p| p == notification.polarity)
    }
}

/// Undrained notifications kept at minimum when the history limit is smaller.
const OUTBOX_FLOOR: usize = 100;

/// Bounded outbox plus newest-first bounded history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationLog {
    next_seq: u64,
    limit: usize,
    history_enabled: bool,
    #[serde(default)]
    history: VecDeque<Notification>,
    #[serde(skip)]
    outbox: VecDeque<Notification>,
}

impl NotificationLog {
    #[must_use]
    pub fn new(limit: usize, history_enabled: bool) -> Self {
        Self {
            next_seq: 1,
            limit,
            history_enabled,
            history: VecDeque::new(),
            outbox: VecDeque::new(),
        }
    }

    /// Record an event and return its sequence number.
    pub fn push(
        &mut self,
        at: SimTime,
        category: Category,
        rarity: Option<Rarity>,
        polarity: Polarity,
        key: &str,
        message: String,
    ) -> u64 {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        let notification = Notification {
            seq,
            at,
            category,
            rarity,
            polarity,
            key: key.to_string(),
            message,
        };
        if self.history_enabled && self.limit > 0 {
            self.history.push_front(notification.clone());
            self.history.truncate(self.limit);
        }
        if self.outbox.len() >= self.outbox_capacity() {
            self.outbox.pop_front();
        }
        self.outbox.push_back(notification);
        seq
    }

    /// Take every notification published since the last drain. Once the
    /// outbox is full the oldest undrained entries are dropped.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.outbox.drain(..).collect()
    }

    /// Forward pending notifications to `sink`, emptying the outbox.
    pub fn forward_to(&mut self, sink: &mut dyn NotificationSink) {
        for notification in self.outbox.drain(..) {
            sink.publish(&notification);
        }
    }

    fn outbox_capacity(&self) -> usize {
        self.limit.max(OUTBOX_FLOOR)
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// History entries matching `filter`, newest first.
    #[must_use]
    pub fn history(&self, filter: HistoryFilter) -> Vec<&Notification> {
        self.history.iter().filter(|n| filter.matches(n)).collect()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> SimTime {
        SimTime::from_ymd_hm(2025, 9, 1, 9, 0).unwrap()
    }

    #[test]
    fn history_is_newest_first_and_capped() {
        let mut log = NotificationLog::new(3, true);
        for i in 0..5 {
            log.push(
                at(),
                Category::System,
                None,
                Polarity::Neutral,
                "system.test",
                format!("event {i}"),
            );
        }
        let history = log.history(HistoryFilter::default());
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].message, "event 4");
        assert_eq!(history[2].seq, 3);
        assert_eq!(log.drain().len(), 5);
        assert_eq!(log.pending(), 0);
    }

    #[test]
    fn filters_combine() {
        let mut log = NotificationLog::new(100, true);
        log.push(
            at(),
            Category::Order,
            Some(Rarity::Rare),
            Polarity::Positive,
            "order.completed",
            "done".into(),
        );
        log.push(
            at(),
            Category::Order,
            Some(Rarity::Common),
            Polarity::Negative,
            "order.expired",
            "gone".into(),
        );
        log.push(
            at(),
            Category::Employee,
            None,
            Polarity::Positive,
            "employee.hired",
            "hi".into(),
        );
        let orders = log.history(HistoryFilter {
            category: Some(Category::Order),
            ..HistoryFilter::default()
        });
        assert_eq!(orders.len(), 2);
        let rare_good = log.history(HistoryFilter {
            category: Some(Category::Order),
            rarity: Some(Rarity::Rare),
            polarity: Some(Polarity::Positive),
        });
        assert_eq!(rare_good.len(), 1);
        assert_eq!(rare_good[0].key, "order.completed");
    }

    #[test]
    fn undrained_outbox_keeps_newest_entries() {
        let mut log = NotificationLog::new(OUTBOX_FLOOR, true);
        for i in 0..OUTBOX_FLOOR + 35 {
            log.push(
                at(),
                Category::System,
                None,
                Polarity::Neutral,
                "system.test",
                format!("event {i}"),
            );
        }
        assert_eq!(log.pending(), OUTBOX_FLOOR);
        let drained = log.drain();
        assert_eq!(drained[0].message, "event 35");
        assert_eq!(drained[OUTBOX_FLOOR - 1].seq, 135);
    }

    #[test]
    fn disabled_history_still_fills_outbox() {
        let mut log = NotificationLog::new(100, false);
        log.push(
            at(),
            Category::System,
            None,
            Polarity::Neutral,
            "system.day-start",
            "morning".into(),
        );
        assert!(log.history(HistoryFilter::default()).is_empty());
        let mut sink: Vec<Notification> = Vec::new();
        log.forward_to(&mut sink);
        assert_eq!(sink.len(), 1);
    }
}
