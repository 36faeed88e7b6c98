//! EVSE domain entity

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::socket_outlet::SocketOutlet;
use crate::domain::charging_session::ChargingSession;
use crate::domain::ids::{ChargingSessionId, ChargingStationId, EventTrackingId, EvseId, ReservationId};
use crate::domain::reservation::Reservation;
use crate::domain::status::{
    AdminStatusKind, ChangeMethod, HistoryLimits, ScheduleChange, StatusKind, StatusTracker,
};
use crate::domain::timestamped::Timestamped;
use crate::support::errors::{DomainError, DomainResult};

/// Operational status of an EVSE
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum EvseStatusType {
    #[default]
    Unspecified,
    Available,
    Reserved,
    Charging,
    Blocked,
    Faulted,
    Offline,
    OutOfService,
    Removed,
}

impl StatusKind for EvseStatusType {
    fn out_of_service() -> Self {
        Self::OutOfService
    }
}

impl fmt::Display for EvseStatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Administrator-controlled status of an EVSE
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum EvseAdminStatusType {
    #[default]
    Unspecified,
    Operational,
    InternalUse,
    OutOfService,
    Planned,
    Blocked,
    Removed,
}

impl AdminStatusKind for EvseAdminStatusType {
    fn is_operational(&self) -> bool {
        matches!(self, Self::Operational | Self::InternalUse)
    }
}

impl fmt::Display for EvseAdminStatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What the EVSE is doing, derived from its reservation and session slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvseActivity {
    Idle,
    Reserved,
    Charging,
}

/// Construction settings for an EVSE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvseSettings {
    pub initial_status: EvseStatusType,
    pub initial_admin_status: EvseAdminStatusType,
    pub history: HistoryLimits,
}

impl Default for EvseSettings {
    fn default() -> Self {
        Self {
            initial_status: EvseStatusType::OutOfService,
            initial_admin_status: EvseAdminStatusType::OutOfService,
            history: HistoryLimits::default(),
        }
    }
}

/// Change of a plain EVSE property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub property: String,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
}

impl PropertyChange {
    fn compare<T: Serialize + PartialEq>(property: &'static str, old: &T, new: &T) -> Option<Self> {
        if old == new {
            return None;
        }
        Some(Self {
            property: property.to_string(),
            old_value: serde_json::to_value(old).unwrap_or(serde_json::Value::Null),
            new_value: serde_json::to_value(new).unwrap_or(serde_json::Value::Null),
        })
    }
}

/// EVSE entity
///
/// Holds at most one active reservation and at most one active charging
/// session. The parent charging station is referenced by id.
#[derive(Debug)]
pub struct Evse {
    id: EvseId,
    station_id: ChargingStationId,
    tracker: StatusTracker<EvseStatusType, EvseAdminStatusType>,
    socket_outlets: Vec<SocketOutlet>,
    description: Option<String>,
    /// Maximum power in kW
    max_power: Option<f64>,
    reservation: Option<Reservation>,
    session: Option<ChargingSession>,
}

impl Evse {
    pub fn new(id: EvseId, station_id: ChargingStationId, settings: EvseSettings) -> Self {
        let now = Utc::now();
        Self {
            id,
            station_id,
            tracker: StatusTracker::new(
                Timestamped::new(now, settings.initial_status),
                Timestamped::new(now, settings.initial_admin_status),
                settings.history,
            ),
            socket_outlets: Vec::new(),
            description: None,
            max_power: None,
            reservation: None,
            session: None,
        }
    }

    pub fn id(&self) -> &EvseId {
        &self.id
    }

    pub fn station_id(&self) -> &ChargingStationId {
        &self.station_id
    }

    // ── Status ─────────────────────────────────────────────────

    /// Effective status (see [`StatusTracker::effective_status`])
    pub fn status(&self) -> Timestamped<EvseStatusType> {
        self.tracker.effective_status()
    }

    pub fn admin_status(&self) -> Timestamped<EvseAdminStatusType> {
        *self.tracker.admin_status()
    }

    pub fn is_operational(&self) -> bool {
        self.tracker.is_operational()
    }

    /// Effective status history, newest first
    pub fn status_schedule(&self, history_size: Option<usize>) -> Vec<Timestamped<EvseStatusType>> {
        let size = history_size.unwrap_or_else(|| self.tracker.status_schedule().max_list_size());
        self.tracker.effective_status_history(size)
    }

    pub fn admin_status_schedule(
        &self,
        history_size: Option<usize>,
    ) -> Vec<Timestamped<EvseAdminStatusType>> {
        let size =
            history_size.unwrap_or_else(|| self.tracker.admin_status_schedule().max_list_size());
        self.tracker.admin_status_history(size)
    }

    pub fn tracker(&self) -> &StatusTracker<EvseStatusType, EvseAdminStatusType> {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut StatusTracker<EvseStatusType, EvseAdminStatusType> {
        &mut self.tracker
    }

    pub fn set_status(
        &mut self,
        status: EvseStatusType,
        timestamp: DateTime<Utc>,
        event_tracking_id: EventTrackingId,
    ) -> Option<ScheduleChange<EvseStatusType>> {
        self.tracker.set_status(status, timestamp, event_tracking_id)
    }

    pub fn set_admin_status(
        &mut self,
        admin_status: EvseAdminStatusType,
        timestamp: DateTime<Utc>,
        event_tracking_id: EventTrackingId,
    ) -> Option<ScheduleChange<EvseAdminStatusType>> {
        self.tracker.set_admin_status(admin_status, timestamp, event_tracking_id)
    }

    pub fn set_status_list(
        &mut self,
        entries: Vec<Timestamped<EvseStatusType>>,
        method: ChangeMethod,
    ) -> DomainResult<Option<ScheduleChange<EvseStatusType>>> {
        self.tracker.set_status_list(entries, method)
    }

    pub fn set_admin_status_list(
        &mut self,
        entries: Vec<Timestamped<EvseAdminStatusType>>,
        method: ChangeMethod,
    ) -> DomainResult<Option<ScheduleChange<EvseAdminStatusType>>> {
        self.tracker.set_admin_status_list(entries, method)
    }

    // ── Properties ─────────────────────────────────────────────

    pub fn socket_outlets(&self) -> &[SocketOutlet] {
        &self.socket_outlets
    }

    pub fn add_socket_outlet(&mut self, outlet: SocketOutlet) -> PropertyChange {
        let old = self.socket_outlets.clone();
        self.socket_outlets.push(outlet);
        PropertyChange {
            property: "socket_outlets".to_string(),
            old_value: serde_json::to_value(&old).unwrap_or(serde_json::Value::Null),
            new_value: serde_json::to_value(&self.socket_outlets)
                .unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: Option<String>) -> Option<PropertyChange> {
        let change = PropertyChange::compare("description", &self.description, &description)?;
        self.description = description;
        Some(change)
    }

    pub fn max_power(&self) -> Option<f64> {
        self.max_power
    }

    pub fn set_max_power(&mut self, max_power: Option<f64>) -> DomainResult<Option<PropertyChange>> {
        if let Some(power) = max_power {
            if !power.is_finite() || power <= 0.0 {
                return Err(DomainError::invalid_argument(format!(
                    "max power must be a positive number of kW, got {power}"
                )));
            }
        }
        let change = PropertyChange::compare("max_power", &self.max_power, &max_power);
        self.max_power = max_power;
        Ok(change)
    }

    // ── Reservation / session slots ────────────────────────────

    pub fn reservation(&self) -> Option<&Reservation> {
        self.reservation.as_ref()
    }

    pub fn session(&self) -> Option<&ChargingSession> {
        self.session.as_ref()
    }

    pub fn activity(&self) -> EvseActivity {
        if self.session.is_some() {
            EvseActivity::Charging
        } else if self.reservation.is_some() {
            EvseActivity::Reserved
        } else {
            EvseActivity::Idle
        }
    }

    /// Install a reservation. Re-installing the active reservation's id
    /// updates it in place.
    pub fn install_reservation(&mut self, reservation: Reservation) -> DomainResult<()> {
        if let Some(active) = &self.reservation {
            if active.id != reservation.id {
                return Err(DomainError::Conflict(format!(
                    "EVSE {} is already reserved by {}",
                    self.id, active.id
                )));
            }
        }
        if let Some(session) = &self.session {
            return Err(DomainError::Conflict(format!(
                "EVSE {} is in use by session {}",
                self.id, session.id
            )));
        }
        self.reservation = Some(reservation);
        Ok(())
    }

    /// Remove the active reservation if its id matches
    pub fn cancel_reservation(&mut self, reservation_id: &ReservationId) -> Option<Reservation> {
        if self.reservation.as_ref().map(|r| &r.id) != Some(reservation_id) {
            return None;
        }
        self.reservation.take().map(|mut r| {
            r.cancel();
            r
        })
    }

    /// Remove the active reservation if it ran past its end time
    pub fn expire_reservation(&mut self, now: DateTime<Utc>) -> Option<Reservation> {
        if !self.reservation.as_ref().is_some_and(|r| r.is_expired(now)) {
            return None;
        }
        self.reservation.take().map(|mut r| {
            r.expire();
            r
        })
    }

    /// Install a charging session. An active reservation must be the one
    /// the session refers to; it is consumed and returned.
    pub fn start_session(&mut self, session: ChargingSession) -> DomainResult<Option<Reservation>> {
        if let Some(active) = &self.session {
            return Err(DomainError::Conflict(format!(
                "EVSE {} is in use by session {}",
                self.id, active.id
            )));
        }
        if let Some(reservation) = &self.reservation {
            if session.reservation_id.as_ref() != Some(&reservation.id) {
                return Err(DomainError::Conflict(format!(
                    "EVSE {} is reserved by {}",
                    self.id, reservation.id
                )));
            }
        }
        let consumed = self.reservation.take().map(|mut r| {
            r.mark_used();
            r
        });
        self.session = Some(session);
        Ok(consumed)
    }

    /// Remove the active session if its id matches
    pub fn stop_session(&mut self, session_id: &ChargingSessionId) -> Option<ChargingSession> {
        if self.session.as_ref().map(|s| &s.id) != Some(session_id) {
            return None;
        }
        self.session.take()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn evse(settings: EvseSettings) -> Evse {
        Evse::new(
            "DE*GEF*E1*1".parse().unwrap(),
            "DE*GEF*S1".parse().unwrap(),
            settings,
        )
    }

    fn reservation(id: &str) -> Reservation {
        Reservation::new(
            id.parse().unwrap(),
            "DE*GEF*E1*1".parse().unwrap(),
            Utc::now(),
            Duration::minutes(15),
        )
    }

    fn session(id: &str, reservation_id: Option<&str>) -> ChargingSession {
        let mut session = ChargingSession::new(
            id.parse().unwrap(),
            "DE*GEF*E1*1".parse().unwrap(),
            Utc::now(),
        );
        session.reservation_id = reservation_id.map(|r| r.parse().unwrap());
        session
    }

    #[test]
    fn defaults_to_out_of_service() {
        let evse = evse(EvseSettings::default());
        assert_eq!(evse.status().value, EvseStatusType::OutOfService);
        assert_eq!(evse.admin_status().value, EvseAdminStatusType::OutOfService);
        assert_eq!(evse.activity(), EvseActivity::Idle);
    }

    #[test]
    fn closed_admin_status_hides_raw_status() {
        let evse = evse(EvseSettings {
            initial_status: EvseStatusType::Available,
            ..EvseSettings::default()
        });
        let status = evse.status();
        assert_eq!(status.value, EvseStatusType::OutOfService);
        assert_eq!(status.timestamp, evse.admin_status().timestamp);
        assert_eq!(
            *evse.tracker().status_schedule().current_value(),
            EvseStatusType::Available
        );
    }

    #[test]
    fn operational_admin_status_exposes_raw_status() {
        let mut evse = evse(EvseSettings {
            initial_status: EvseStatusType::Available,
            ..EvseSettings::default()
        });
        let status_time = evse.tracker().status_schedule().current().timestamp;
        let admin_time = status_time + Duration::seconds(30);
        evse.set_admin_status(EvseAdminStatusType::Operational, admin_time, EventTrackingId::new());

        assert_eq!(
            evse.status(),
            Timestamped::new(status_time, EvseStatusType::Available)
        );
        assert_eq!(evse.status_schedule(None).len(), 1);
        assert_eq!(evse.admin_status_schedule(Some(1)).len(), 1);
        assert_eq!(evse.admin_status_schedule(None).len(), 2);
    }

    #[test]
    fn description_setter_reports_changes_only() {
        let mut evse = evse(EvseSettings::default());
        let change = evse.set_description(Some("Parking deck".into())).unwrap();
        assert_eq!(change.property, "description");
        assert_eq!(change.old_value, serde_json::Value::Null);
        assert_eq!(change.new_value, serde_json::json!("Parking deck"));
        assert!(evse.set_description(Some("Parking deck".into())).is_none());
    }

    #[test]
    fn max_power_must_be_positive() {
        let mut evse = evse(EvseSettings::default());
        assert!(evse.set_max_power(Some(-3.0)).is_err());
        assert!(evse.set_max_power(Some(22.0)).unwrap().is_some());
        assert_eq!(evse.max_power(), Some(22.0));
        assert!(evse.set_max_power(Some(22.0)).unwrap().is_none());
    }

    #[test]
    fn second_reservation_conflicts() {
        let mut evse = evse(EvseSettings::default());
        evse.install_reservation(reservation("R-1")).unwrap();
        assert_eq!(evse.activity(), EvseActivity::Reserved);
        // same id updates
        evse.install_reservation(reservation("R-1")).unwrap();
        assert!(matches!(
            evse.install_reservation(reservation("R-2")),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn cancel_requires_matching_id() {
        let mut evse = evse(EvseSettings::default());
        evse.install_reservation(reservation("R-1")).unwrap();
        assert!(evse.cancel_reservation(&"R-2".parse().unwrap()).is_none());
        let cancelled = evse.cancel_reservation(&"R-1".parse().unwrap()).unwrap();
        assert!(!cancelled.is_active());
        assert!(evse.reservation().is_none());
    }

    #[test]
    fn session_consumes_matching_reservation() {
        let mut evse = evse(EvseSettings::default());
        evse.install_reservation(reservation("R-1")).unwrap();

        assert!(evse.start_session(session("S-1", None)).is_err());

        let consumed = evse.start_session(session("S-1", Some("R-1"))).unwrap().unwrap();
        assert_eq!(consumed.status, crate::domain::reservation::ReservationStatus::Used);
        assert_eq!(evse.activity(), EvseActivity::Charging);
        assert!(evse.start_session(session("S-2", None)).is_err());

        assert!(evse.stop_session(&"S-2".parse().unwrap()).is_none());
        assert!(evse.stop_session(&"S-1".parse().unwrap()).is_some());
        assert_eq!(evse.activity(), EvseActivity::Idle);
    }

    #[test]
    fn expiry_only_removes_overdue_reservation() {
        let mut evse = evse(EvseSettings::default());
        let r = reservation("R-1");
        let end = r.end_time;
        evse.install_reservation(r).unwrap();

        assert!(evse.expire_reservation(end - Duration::seconds(1)).is_none());
        let expired = evse.expire_reservation(end + Duration::seconds(1)).unwrap();
        assert!(expired.is_expired(end));
        assert!(evse.reservation().is_none());
    }
}
