//! EVSE status value objects and update (delta) records
//!
//! These are the shapes handed to downstream receivers: a status record
//! is "what it is now", an update is "what it was, and what it is now".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{Evse, EvseAdminStatusType, EvseStatusType};
use crate::domain::ids::EvseId;
use crate::domain::status::ScheduleChange;
use crate::domain::timestamped::Timestamped;

/// (entity id, value, timestamp), ordered by id, then value, then timestamp
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatusRecord<I, T> {
    pub id: I,
    pub value: T,
    pub timestamp: DateTime<Utc>,
}

impl<I, T> StatusRecord<I, T> {
    pub fn new(id: I, status: Timestamped<T>) -> Self {
        Self {
            id,
            value: status.value,
            timestamp: status.timestamp,
        }
    }

    pub fn timestamped(&self) -> Timestamped<T>
    where
        T: Clone,
    {
        Timestamped::new(self.timestamp, self.value.clone())
    }
}

/// (entity id, old, new), ordered by id, then new, then old
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatusUpdate<I, T> {
    pub id: I,
    pub new: Timestamped<T>,
    pub old: Timestamped<T>,
}

impl<I, T> StatusUpdate<I, T> {
    pub fn new(id: I, old: Timestamped<T>, new: Timestamped<T>) -> Self {
        Self { id, new, old }
    }

    pub fn from_change(id: I, change: &ScheduleChange<T>) -> Self
    where
        T: Clone,
    {
        Self::new(id, change.old.clone(), change.new.clone())
    }
}

pub type EvseStatus = StatusRecord<EvseId, EvseStatusType>;
pub type EvseAdminStatus = StatusRecord<EvseId, EvseAdminStatusType>;
pub type EvseStatusUpdate = StatusUpdate<EvseId, EvseStatusType>;
pub type EvseAdminStatusUpdate = StatusUpdate<EvseId, EvseAdminStatusType>;

impl StatusRecord<EvseId, EvseStatusType> {
    /// Current effective status of `evse`
    pub fn snapshot(evse: &Evse) -> Self {
        Self::new(evse.id().clone(), evse.status())
    }
}

impl StatusRecord<EvseId, EvseAdminStatusType> {
    pub fn snapshot(evse: &Evse) -> Self {
        Self::new(evse.id().clone(), evse.admin_status())
    }
}

impl StatusUpdate<EvseId, EvseStatusType> {
    /// Newest entry of the effective status history paired with the one
    /// before it (or the zero value when there is none).
    pub fn snapshot(evse: &Evse) -> Self {
        let mut history = evse.status_schedule(Some(2)).into_iter();
        let new = history.next().unwrap_or_else(|| evse.status());
        let old = history.next().unwrap_or_default();
        Self::new(evse.id().clone(), old, new)
    }
}

impl StatusUpdate<EvseId, EvseAdminStatusType> {
    pub fn snapshot(evse: &Evse) -> Self {
        let mut history = evse.admin_status_schedule(Some(2)).into_iter();
        let new = history.next().unwrap_or_else(|| evse.admin_status());
        let old = history.next().unwrap_or_default();
        Self::new(evse.id().clone(), old, new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evse::model::EvseSettings;
    use crate::domain::ids::EventTrackingId;
    use chrono::Duration;

    fn evse_id(s: &str) -> EvseId {
        s.parse().unwrap()
    }

    fn operational_evse() -> Evse {
        let mut evse = Evse::new(
            evse_id("DE*GEF*E1*1"),
            "DE*GEF*S1".parse().unwrap(),
            EvseSettings {
                initial_status: EvseStatusType::Available,
                ..EvseSettings::default()
            },
        );
        evse.set_admin_status(EvseAdminStatusType::Operational, Utc::now(), EventTrackingId::new());
        evse
    }

    #[test]
    fn records_order_by_id_then_value() {
        let t0 = Utc::now();
        let later = t0 + Duration::minutes(1);
        let mut records = vec![
            EvseStatus::new(evse_id("DE*GEF*E2*1"), Timestamped::new(t0, EvseStatusType::Available)),
            EvseStatus::new(evse_id("DE*GEF*E1*1"), Timestamped::new(t0, EvseStatusType::Charging)),
            EvseStatus::new(evse_id("DE*GEF*E1*1"), Timestamped::new(later, EvseStatusType::Available)),
        ];
        records.sort();

        assert_eq!(records[0].id, evse_id("DE*GEF*E1*1"));
        assert_eq!(records[0].value, EvseStatusType::Available);
        assert_eq!(records[1].value, EvseStatusType::Charging);
        assert_eq!(records[2].id, evse_id("DE*GEF*E2*1"));
    }

    #[test]
    fn updates_order_by_id_then_new_then_old() {
        let t0 = Utc::now();
        let a = Timestamped::new(t0, EvseStatusType::Available);
        let b = Timestamped::new(t0 + Duration::seconds(1), EvseStatusType::Charging);
        let id = evse_id("DE*GEF*E1*1");

        let first = EvseStatusUpdate::new(id.clone(), b, a);
        let second = EvseStatusUpdate::new(id.clone(), a, b);
        assert!(first < second);

        let third = EvseStatusUpdate::new(id, b, b);
        assert!(second < third);
    }

    #[test]
    fn status_snapshot_uses_effective_status() {
        let closed = Evse::new(
            evse_id("DE*GEF*E1*1"),
            "DE*GEF*S1".parse().unwrap(),
            EvseSettings {
                initial_status: EvseStatusType::Available,
                ..EvseSettings::default()
            },
        );
        assert_eq!(EvseStatus::snapshot(&closed).value, EvseStatusType::OutOfService);
        assert_eq!(
            EvseAdminStatus::snapshot(&closed).value,
            EvseAdminStatusType::OutOfService
        );

        let open = operational_evse();
        assert_eq!(EvseStatus::snapshot(&open).value, EvseStatusType::Available);
    }

    #[test]
    fn update_snapshot_pairs_current_with_previous() {
        let mut evse = operational_evse();
        let before = evse.status();
        let later = Utc::now() + Duration::seconds(1);
        evse.set_status(EvseStatusType::Charging, later, EventTrackingId::new());

        let update = EvseStatusUpdate::snapshot(&evse);
        assert_eq!(update.new, Timestamped::new(later, EvseStatusType::Charging));
        assert_eq!(update.old, before);
    }

    #[test]
    fn update_snapshot_without_history_uses_zero_value() {
        let closed = Evse::new(
            evse_id("DE*GEF*E1*1"),
            "DE*GEF*S1".parse().unwrap(),
            EvseSettings::default(),
        );
        let update = EvseStatusUpdate::snapshot(&closed);
        assert_eq!(update.old, Timestamped::default());
        assert_eq!(update.new.value, EvseStatusType::OutOfService);

        let admin = EvseAdminStatusUpdate::snapshot(&closed);
        assert_eq!(admin.old, Timestamped::default());
        assert_eq!(admin.new.value, EvseAdminStatusType::OutOfService);
    }

    #[test]
    fn update_from_change_copies_both_sides() {
        let mut evse = operational_evse();
        let change = evse
            .set_status(EvseStatusType::Reserved, Utc::now(), EventTrackingId::new())
            .unwrap();
        let update = EvseStatusUpdate::from_change(evse.id().clone(), &change);
        assert_eq!(update.old, change.old);
        assert_eq!(update.new, change.new);
    }
}
