//! Status + admin status pair with effective status derivation

use chrono::{DateTime, Utc};

use super::schedule::{ChangeMethod, ScheduleChange, StatusSchedule};
use crate::domain::ids::EventTrackingId;
use crate::domain::timestamped::Timestamped;
use crate::support::errors::DomainResult;

/// Operational status of an entity (Available, Charging, ...).
pub trait StatusKind: Clone + PartialEq {
    /// The value reported while the admin status keeps the entity closed.
    fn out_of_service() -> Self;
}

/// Administrator-controlled lifecycle status of an entity.
pub trait AdminStatusKind: Clone + PartialEq {
    /// Whether the entity accepts operations (Operational or InternalUse).
    fn is_operational(&self) -> bool;
}

/// History sizes for the two schedules of a tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    pub status: usize,
    pub admin_status: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            status: super::schedule::DEFAULT_MAX_STATUS_HISTORY,
            admin_status: super::schedule::DEFAULT_MAX_STATUS_HISTORY,
        }
    }
}

/// Owns the status and admin status schedules of one entity.
#[derive(Debug)]
pub struct StatusTracker<S, A> {
    status: StatusSchedule<S>,
    admin_status: StatusSchedule<A>,
}

impl<S: StatusKind, A: AdminStatusKind> StatusTracker<S, A> {
    pub fn new(initial_status: Timestamped<S>, initial_admin_status: Timestamped<A>, limits: HistoryLimits) -> Self {
        Self {
            status: StatusSchedule::with_max_list_size(initial_status, limits.status),
            admin_status: StatusSchedule::with_max_list_size(initial_admin_status, limits.admin_status),
        }
    }

    /// Raw status schedule, ignoring the admin status
    pub fn status_schedule(&self) -> &StatusSchedule<S> {
        &self.status
    }

    pub fn status_schedule_mut(&mut self) -> &mut StatusSchedule<S> {
        &mut self.status
    }

    pub fn admin_status_schedule(&self) -> &StatusSchedule<A> {
        &self.admin_status
    }

    pub fn admin_status_schedule_mut(&mut self) -> &mut StatusSchedule<A> {
        &mut self.admin_status
    }

    pub fn admin_status(&self) -> &Timestamped<A> {
        self.admin_status.current()
    }

    pub fn is_operational(&self) -> bool {
        self.admin_status.current_value().is_operational()
    }

    /// Effective status: the raw status while the admin status is
    /// operational, otherwise out-of-service stamped with the admin
    /// status timestamp.
    pub fn effective_status(&self) -> Timestamped<S> {
        if self.is_operational() {
            self.status.current().clone()
        } else {
            Timestamped::new(self.admin_status.current().timestamp, S::out_of_service())
        }
    }

    /// Effective view of the status history: the `history_size` newest raw
    /// entries while operational, otherwise just the effective status.
    pub fn effective_status_history(&self, history_size: usize) -> Vec<Timestamped<S>> {
        if self.is_operational() {
            self.status.take(history_size).cloned().collect()
        } else if history_size == 0 {
            Vec::new()
        } else {
            vec![self.effective_status()]
        }
    }

    pub fn admin_status_history(&self, history_size: usize) -> Vec<Timestamped<A>> {
        self.admin_status.take(history_size).cloned().collect()
    }

    pub fn set_status(
        &mut self,
        value: S,
        timestamp: DateTime<Utc>,
        event_tracking_id: EventTrackingId,
    ) -> Option<ScheduleChange<S>> {
        self.status.insert_tracked(value, timestamp, event_tracking_id)
    }

    pub fn set_admin_status(
        &mut self,
        value: A,
        timestamp: DateTime<Utc>,
        event_tracking_id: EventTrackingId,
    ) -> Option<ScheduleChange<A>> {
        self.admin_status.insert_tracked(value, timestamp, event_tracking_id)
    }

    pub fn set_status_list(
        &mut self,
        entries: Vec<Timestamped<S>>,
        method: ChangeMethod,
    ) -> DomainResult<Option<ScheduleChange<S>>> {
        self.status.insert_all(entries, method)
    }

    pub fn set_admin_status_list(
        &mut self,
        entries: Vec<Timestamped<A>>,
        method: ChangeMethod,
    ) -> DomainResult<Option<ScheduleChange<A>>> {
        self.admin_status.insert_all(entries, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Status {
        Idle,
        Busy,
        Closed,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Admin {
        Operational,
        InternalUse,
        OutOfService,
        Planned,
    }

    impl StatusKind for Status {
        fn out_of_service() -> Self {
            Self::Closed
        }
    }

    impl AdminStatusKind for Admin {
        fn is_operational(&self) -> bool {
            matches!(self, Self::Operational | Self::InternalUse)
        }
    }

    fn tracker(t0: DateTime<Utc>, admin: Admin) -> StatusTracker<Status, Admin> {
        StatusTracker::new(
            Timestamped::new(t0, Status::Idle),
            Timestamped::new(t0 + Duration::seconds(5), admin),
            HistoryLimits::default(),
        )
    }

    #[test]
    fn closed_admin_status_forces_out_of_service() {
        let t0 = Utc::now();
        for admin in [Admin::OutOfService, Admin::Planned] {
            let tracker = tracker(t0, admin);
            assert_eq!(
                tracker.effective_status(),
                Timestamped::new(t0 + Duration::seconds(5), Status::Closed)
            );
            assert!(!tracker.is_operational());
        }
    }

    #[test]
    fn open_admin_status_passes_raw_status_through() {
        let t0 = Utc::now();
        for admin in [Admin::Operational, Admin::InternalUse] {
            let mut tracker = tracker(t0, admin);
            assert_eq!(tracker.effective_status(), Timestamped::new(t0, Status::Idle));

            tracker.set_status(Status::Busy, t0 + Duration::seconds(9), EventTrackingId::new());
            assert_eq!(
                tracker.effective_status(),
                Timestamped::new(t0 + Duration::seconds(9), Status::Busy)
            );
        }
    }

    #[test]
    fn effective_history_collapses_when_closed() {
        let t0 = Utc::now();
        let mut tracker = tracker(t0, Admin::Operational);
        tracker.set_status(Status::Busy, t0 + Duration::seconds(1), EventTrackingId::new());
        assert_eq!(tracker.effective_status_history(10).len(), 2);

        tracker.set_admin_status(Admin::OutOfService, t0 + Duration::seconds(2), EventTrackingId::new());
        let history = tracker.effective_status_history(10);
        assert_eq!(history, vec![Timestamped::new(t0 + Duration::seconds(2), Status::Closed)]);
        assert!(tracker.effective_status_history(0).is_empty());
        assert_eq!(tracker.status_schedule().len(), 2);
    }
}
