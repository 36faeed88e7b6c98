//! Bounded, newest-first history of a single status value

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::ids::EventTrackingId;
use crate::domain::timestamped::Timestamped;
use crate::support::errors::{DomainError, DomainResult};

/// Default number of retained history entries
pub const DEFAULT_MAX_STATUS_HISTORY: usize = 50;

/// How `insert_all` combines the given list with the existing history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeMethod {
    /// Discard the history and adopt the list
    Replace,
    /// Prepend the list ahead of the history
    Add,
}

/// A change of the current value of a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleChange<T> {
    /// When the insert was made
    pub timestamp: DateTime<Utc>,
    pub event_tracking_id: EventTrackingId,
    pub old: Timestamped<T>,
    pub new: Timestamped<T>,
}

pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Synchronous change listener. Runs inline with the insert that caused
/// the change; its errors are logged and dropped.
pub type ScheduleListener<T> =
    Box<dyn Fn(&StatusSchedule<T>, &ScheduleChange<T>) -> Result<(), ListenerError> + Send + Sync>;

/// Status schedule.
///
/// Never empty, never longer than `max_list_size`. Entries are kept in
/// insertion order (newest first); inserts are not re-sorted, so callers
/// insert chronologically and use [`ChangeMethod::Replace`] to reorder.
///
/// Every insert is recorded, including one that repeats the current
/// value. Listeners only hear about inserts that change the current value.
pub struct StatusSchedule<T> {
    entries: VecDeque<Timestamped<T>>,
    max_list_size: usize,
    listeners: Vec<ScheduleListener<T>>,
}

impl<T: Clone + PartialEq> StatusSchedule<T> {
    pub fn new(initial: Timestamped<T>) -> Self {
        Self::with_max_list_size(initial, DEFAULT_MAX_STATUS_HISTORY)
    }

    /// A `max_list_size` of 0 is treated as 1.
    pub fn with_max_list_size(initial: Timestamped<T>, max_list_size: usize) -> Self {
        let max_list_size = max_list_size.max(1);
        let mut entries = VecDeque::with_capacity(max_list_size.min(DEFAULT_MAX_STATUS_HISTORY));
        entries.push_front(initial);
        Self {
            entries,
            max_list_size,
            listeners: Vec::new(),
        }
    }

    pub fn max_list_size(&self) -> usize {
        self.max_list_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true once constructed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest entry
    pub fn current(&self) -> &Timestamped<T> {
        // The schedule is seeded on construction and `insert_all` refuses
        // to empty it.
        &self.entries[0]
    }

    pub fn current_value(&self) -> &T {
        &self.current().value
    }

    /// Entries newest first
    pub fn iter(&self) -> impl Iterator<Item = &Timestamped<T>> + Clone + '_ {
        self.entries.iter()
    }

    /// The `n` newest entries (fewer if the history is shorter).
    ///
    /// The iterator is lazy and can be cloned to restart it.
    pub fn take(&self, n: usize) -> impl Iterator<Item = &Timestamped<T>> + Clone + '_ {
        self.entries.iter().take(n)
    }

    /// The second newest entry, if any
    pub fn previous(&self) -> Option<&Timestamped<T>> {
        self.entries.get(1)
    }

    pub fn subscribe(&mut self, listener: ScheduleListener<T>) {
        self.listeners.push(listener);
    }

    /// Insert `value` stamped with the current time
    pub fn insert(&mut self, value: T) -> Option<ScheduleChange<T>> {
        self.insert_at(value, Utc::now())
    }

    pub fn insert_at(&mut self, value: T, timestamp: DateTime<Utc>) -> Option<ScheduleChange<T>> {
        self.insert_tracked(value, timestamp, EventTrackingId::new())
    }

    pub fn insert_tracked(
        &mut self,
        value: T,
        timestamp: DateTime<Utc>,
        event_tracking_id: EventTrackingId,
    ) -> Option<ScheduleChange<T>> {
        let old = self.current().clone();
        self.entries.push_front(Timestamped::new(timestamp, value));
        self.entries.truncate(self.max_list_size);
        self.notify_if_changed(old, event_tracking_id)
    }

    /// Bulk insert. `entries` is ordered newest first.
    pub fn insert_all(
        &mut self,
        entries: Vec<Timestamped<T>>,
        method: ChangeMethod,
    ) -> DomainResult<Option<ScheduleChange<T>>> {
        let old = self.current().clone();

        match method {
            ChangeMethod::Replace => {
                if entries.is_empty() {
                    return Err(DomainError::EmptyScheduleReplace);
                }
                self.entries = entries.into();
            }
            ChangeMethod::Add => {
                if entries.is_empty() {
                    return Ok(None);
                }
                for entry in entries.into_iter().rev() {
                    self.entries.push_front(entry);
                }
            }
        }

        self.entries.truncate(self.max_list_size);
        Ok(self.notify_if_changed(old, EventTrackingId::new()))
    }

    fn notify_if_changed(
        &self,
        old: Timestamped<T>,
        event_tracking_id: EventTrackingId,
    ) -> Option<ScheduleChange<T>> {
        let new = self.current().clone();
        if new.value == old.value {
            return None;
        }

        let change = ScheduleChange {
            timestamp: Utc::now(),
            event_tracking_id,
            old,
            new,
        };

        for (index, listener) in self.listeners.iter().enumerate() {
            if let Err(e) = listener(self, &change) {
                warn!(listener = index, error = %e, "Status schedule listener failed");
            }
        }

        Some(change)
    }
}

impl<T: fmt::Debug> fmt::Debug for StatusSchedule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusSchedule")
            .field("entries", &self.entries)
            .field("max_list_size", &self.max_list_size)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Red,
        Green,
        Amber,
        Off,
    }

    fn at(t0: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
        t0 + Duration::seconds(secs)
    }

    fn values(schedule: &StatusSchedule<Light>) -> Vec<Light> {
        schedule.iter().map(|e| e.value).collect()
    }

    #[test]
    fn seeded_schedule_has_one_entry() {
        let schedule = StatusSchedule::new(Timestamped::now(Light::Off));
        assert_eq!(schedule.len(), 1);
        assert!(!schedule.is_empty());
        assert_eq!(*schedule.current_value(), Light::Off);
        assert_eq!(schedule.max_list_size(), DEFAULT_MAX_STATUS_HISTORY);
        assert!(schedule.previous().is_none());
    }

    #[test]
    fn insert_sets_current_value() {
        let mut schedule = StatusSchedule::new(Timestamped::now(Light::Off));
        for value in [Light::Red, Light::Green, Light::Green, Light::Amber] {
            schedule.insert(value);
            assert_eq!(*schedule.current_value(), value);
        }
    }

    #[test]
    fn history_is_bounded_to_most_recent_entries() {
        let t0 = Utc::now();
        let mut schedule = StatusSchedule::with_max_list_size(Timestamped::new(t0, 0u32), 5);
        for i in 1..=12u32 {
            schedule.insert_at(i, at(t0, i64::from(i)));
        }
        let kept: Vec<u32> = schedule.iter().map(|e| e.value).collect();
        assert_eq!(kept, vec![12, 11, 10, 9, 8]);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut schedule = StatusSchedule::with_max_list_size(Timestamped::now(Light::Off), 0);
        schedule.insert(Light::Red);
        assert_eq!(schedule.len(), 1);
        assert_eq!(*schedule.current_value(), Light::Red);
    }

    #[test]
    fn change_is_reported_only_when_value_differs() {
        let t0 = Utc::now();
        let mut schedule = StatusSchedule::new(Timestamped::new(t0, Light::Off));

        let change = schedule.insert_at(Light::Red, at(t0, 1)).expect("changed");
        assert_eq!(change.old, Timestamped::new(t0, Light::Off));
        assert_eq!(change.new, Timestamped::new(at(t0, 1), Light::Red));

        assert!(schedule.insert_at(Light::Red, at(t0, 2)).is_none());
        // same-value inserts are still recorded
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule.current().timestamp, at(t0, 2));
    }

    #[test]
    fn listeners_fire_in_insert_order() {
        let t0 = Utc::now();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut schedule = StatusSchedule::new(Timestamped::new(t0, Light::Off));

        let sink = seen.clone();
        schedule.subscribe(Box::new(move |schedule: &StatusSchedule<Light>, change: &ScheduleChange<Light>| {
            assert_eq!(schedule.current(), &change.new);
            sink.lock().unwrap().push((change.old.value, change.new.value));
            Ok(())
        }));

        schedule.insert_at(Light::Red, at(t0, 1));
        schedule.insert_at(Light::Red, at(t0, 2));
        schedule.insert_at(Light::Green, at(t0, 3));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(Light::Off, Light::Red), (Light::Red, Light::Green)]
        );
    }

    #[test]
    fn small_capacity_evicts_seed_and_notifies_every_change() {
        let t0 = Utc::now();
        let notified = Arc::new(AtomicUsize::new(0));
        let mut schedule = StatusSchedule::with_max_list_size(Timestamped::new(t0, Light::Off), 3);

        let counter = notified.clone();
        schedule.subscribe(Box::new(move |_: &StatusSchedule<Light>, _: &ScheduleChange<Light>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        schedule.insert_at(Light::Green, at(t0, 1));
        schedule.insert_at(Light::Red, at(t0, 2));
        schedule.insert_at(Light::Green, at(t0, 3));
        schedule.insert_at(Light::Amber, at(t0, 4));

        let history: Vec<_> = schedule.iter().cloned().collect();
        assert_eq!(
            history,
            vec![
                Timestamped::new(at(t0, 4), Light::Amber),
                Timestamped::new(at(t0, 3), Light::Green),
                Timestamped::new(at(t0, 2), Light::Red),
            ]
        );
        assert_eq!(schedule.current(), &Timestamped::new(at(t0, 4), Light::Amber));
        assert_eq!(notified.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn failing_listener_does_not_abort_insert_or_other_listeners() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut schedule = StatusSchedule::new(Timestamped::now(Light::Off));

        schedule.subscribe(Box::new(|_: &StatusSchedule<Light>, _: &ScheduleChange<Light>| {
            Err(ListenerError::from("listener exploded"))
        }));
        let counter = calls.clone();
        schedule.subscribe(Box::new(move |_: &StatusSchedule<Light>, _: &ScheduleChange<Light>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        assert!(schedule.insert(Light::Green).is_some());
        assert_eq!(*schedule.current_value(), Light::Green);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tracked_insert_carries_tracking_id() {
        let mut schedule = StatusSchedule::new(Timestamped::now(Light::Off));
        let tracking = EventTrackingId::new();
        let change = schedule
            .insert_tracked(Light::Amber, Utc::now(), tracking)
            .unwrap();
        assert_eq!(change.event_tracking_id, tracking);
    }

    #[test]
    fn replace_adopts_list_as_history() {
        let t0 = Utc::now();
        let mut schedule = StatusSchedule::with_max_list_size(Timestamped::new(t0, Light::Off), 3);
        schedule.insert_at(Light::Red, at(t0, 1));

        let change = schedule
            .insert_all(
                vec![
                    Timestamped::new(at(t0, 9), Light::Green),
                    Timestamped::new(at(t0, 8), Light::Amber),
                    Timestamped::new(at(t0, 7), Light::Red),
                    Timestamped::new(at(t0, 6), Light::Off),
                ],
                ChangeMethod::Replace,
            )
            .unwrap()
            .expect("current value changed");

        assert_eq!(change.old.value, Light::Red);
        assert_eq!(change.new.value, Light::Green);
        assert_eq!(values(&schedule), vec![Light::Green, Light::Amber, Light::Red]);
    }

    #[test]
    fn replace_with_empty_list_is_rejected() {
        let mut schedule = StatusSchedule::new(Timestamped::now(Light::Off));
        let err = schedule.insert_all(Vec::new(), ChangeMethod::Replace).unwrap_err();
        assert_eq!(err, DomainError::EmptyScheduleReplace);
        assert_eq!(schedule.len(), 1);
    }

    #[test]
    fn add_prepends_and_evicts() {
        let t0 = Utc::now();
        let mut schedule = StatusSchedule::with_max_list_size(Timestamped::new(t0, Light::Off), 3);
        schedule.insert_at(Light::Red, at(t0, 1));

        let change = schedule
            .insert_all(
                vec![
                    Timestamped::new(at(t0, 3), Light::Amber),
                    Timestamped::new(at(t0, 2), Light::Green),
                ],
                ChangeMethod::Add,
            )
            .unwrap();

        assert_eq!(change.map(|c| c.new.value), Some(Light::Amber));
        assert_eq!(values(&schedule), vec![Light::Amber, Light::Green, Light::Red]);

        assert!(schedule.insert_all(Vec::new(), ChangeMethod::Add).unwrap().is_none());
    }

    #[test]
    fn take_is_lazy_and_restartable() {
        let t0 = Utc::now();
        let mut schedule = StatusSchedule::new(Timestamped::new(t0, Light::Off));
        schedule.insert_at(Light::Red, at(t0, 1));
        schedule.insert_at(Light::Green, at(t0, 2));

        let first_two = schedule.take(2);
        let again = first_two.clone();
        assert_eq!(first_two.map(|e| e.value).collect::<Vec<_>>(), vec![Light::Green, Light::Red]);
        assert_eq!(again.count(), 2);
        assert_eq!(schedule.take(10).count(), 3);
    }
}
