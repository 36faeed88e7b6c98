//! Notification events
//!
//! Defines all event types that can be broadcasted to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::charging_pool::{ChargingPoolAdminStatusType, ChargingPoolStatusType};
use crate::domain::charging_session::{ChargeDetailRecord, ChargingSession};
use crate::domain::charging_station::{ChargingStationAdminStatusType, ChargingStationStatusType};
use crate::domain::evse::{EvseAdminStatusType, EvseStatusType, PropertyChange};
use crate::domain::ids::{
    ChargingPoolId, ChargingSessionId, ChargingStationId, EventTrackingId, EvseId, ReservationId,
};
use crate::domain::reservation::{CancellationReason, Reservation};
use crate::domain::timestamped::Timestamped;

/// Event types for notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    EvseStatusChanged(StatusChangedEvent<EvseId, EvseStatusType>),
    EvseAdminStatusChanged(StatusChangedEvent<EvseId, EvseAdminStatusType>),
    EvseDataChanged(DataChangedEvent),
    ChargingStationStatusChanged(StatusChangedEvent<ChargingStationId, ChargingStationStatusType>),
    ChargingStationAdminStatusChanged(
        StatusChangedEvent<ChargingStationId, ChargingStationAdminStatusType>,
    ),
    ChargingPoolStatusChanged(StatusChangedEvent<ChargingPoolId, ChargingPoolStatusType>),
    ChargingPoolAdminStatusChanged(StatusChangedEvent<ChargingPoolId, ChargingPoolAdminStatusType>),
    ReserveRequested(ReserveRequestedEvent),
    ReserveResponded(ResponseEvent),
    CancelReservationRequested(CancelReservationRequestedEvent),
    CancelReservationResponded(ResponseEvent),
    RemoteStartRequested(RemoteStartRequestedEvent),
    RemoteStartResponded(ResponseEvent),
    RemoteStopRequested(RemoteStopRequestedEvent),
    RemoteStopResponded(ResponseEvent),
    ReservationCreated(ReservationCreatedEvent),
    ReservationCancelled(ReservationCancelledEvent),
    SessionCreated(SessionCreatedEvent),
    ChargeDetailRecordCreated(ChargeDetailRecordEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::EvseStatusChanged(_) => "evse_status_changed",
            Event::EvseAdminStatusChanged(_) => "evse_admin_status_changed",
            Event::EvseDataChanged(_) => "evse_data_changed",
            Event::ChargingStationStatusChanged(_) => "charging_station_status_changed",
            Event::ChargingStationAdminStatusChanged(_) => "charging_station_admin_status_changed",
            Event::ChargingPoolStatusChanged(_) => "charging_pool_status_changed",
            Event::ChargingPoolAdminStatusChanged(_) => "charging_pool_admin_status_changed",
            Event::ReserveRequested(_) => "reserve_requested",
            Event::ReserveResponded(_) => "reserve_responded",
            Event::CancelReservationRequested(_) => "cancel_reservation_requested",
            Event::CancelReservationResponded(_) => "cancel_reservation_responded",
            Event::RemoteStartRequested(_) => "remote_start_requested",
            Event::RemoteStartResponded(_) => "remote_start_responded",
            Event::RemoteStopRequested(_) => "remote_stop_requested",
            Event::RemoteStopResponded(_) => "remote_stop_responded",
            Event::ReservationCreated(_) => "reservation_created",
            Event::ReservationCancelled(_) => "reservation_cancelled",
            Event::SessionCreated(_) => "session_created",
            Event::ChargeDetailRecordCreated(_) => "charge_detail_record_created",
        }
    }

    /// The EVSE the event is about, if any
    pub fn evse_id(&self) -> Option<&EvseId> {
        match self {
            Event::EvseStatusChanged(e) => Some(&e.id),
            Event::EvseAdminStatusChanged(e) => Some(&e.id),
            Event::EvseDataChanged(e) => Some(&e.evse_id),
            Event::ReserveRequested(e) => Some(&e.evse_id),
            Event::CancelReservationRequested(e) => Some(&e.evse_id),
            Event::RemoteStartRequested(e) => Some(&e.evse_id),
            Event::RemoteStopRequested(e) => Some(&e.evse_id),
            Event::ReserveResponded(e)
            | Event::CancelReservationResponded(e)
            | Event::RemoteStartResponded(e)
            | Event::RemoteStopResponded(e) => Some(&e.evse_id),
            Event::ReservationCreated(e) => Some(&e.reservation.evse_id),
            Event::ReservationCancelled(e) => Some(&e.reservation.evse_id),
            Event::SessionCreated(e) => Some(&e.session.evse_id),
            Event::ChargeDetailRecordCreated(e) => Some(&e.charge_detail_record.evse_id),
            Event::ChargingStationStatusChanged(_)
            | Event::ChargingStationAdminStatusChanged(_)
            | Event::ChargingPoolStatusChanged(_)
            | Event::ChargingPoolAdminStatusChanged(_) => None,
        }
    }

    /// Correlation id of request / response / status events
    pub fn event_tracking_id(&self) -> Option<EventTrackingId> {
        match self {
            Event::EvseStatusChanged(e) => Some(e.event_tracking_id),
            Event::EvseAdminStatusChanged(e) => Some(e.event_tracking_id),
            Event::ChargingStationStatusChanged(e) => Some(e.event_tracking_id),
            Event::ChargingStationAdminStatusChanged(e) => Some(e.event_tracking_id),
            Event::ChargingPoolStatusChanged(e) => Some(e.event_tracking_id),
            Event::ChargingPoolAdminStatusChanged(e) => Some(e.event_tracking_id),
            Event::ReserveRequested(e) => Some(e.event_tracking_id),
            Event::CancelReservationRequested(e) => Some(e.event_tracking_id),
            Event::RemoteStartRequested(e) => Some(e.event_tracking_id),
            Event::RemoteStopRequested(e) => Some(e.event_tracking_id),
            Event::ReserveResponded(e)
            | Event::CancelReservationResponded(e)
            | Event::RemoteStartResponded(e)
            | Event::RemoteStopResponded(e) => Some(e.event_tracking_id),
            Event::ReservationCreated(e) => Some(e.event_tracking_id),
            Event::ReservationCancelled(e) => e.event_tracking_id,
            Event::SessionCreated(e) => Some(e.event_tracking_id),
            Event::ChargeDetailRecordCreated(e) => e.event_tracking_id,
            Event::EvseDataChanged(_) => None,
        }
    }
}

/// Current value of a status schedule changed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangedEvent<I, T> {
    pub id: I,
    pub old: Timestamped<T>,
    pub new: Timestamped<T>,
    pub event_tracking_id: EventTrackingId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataChangedEvent {
    pub evse_id: EvseId,
    pub change: PropertyChange,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveRequestedEvent {
    pub evse_id: EvseId,
    pub reservation_id: Option<ReservationId>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_secs: i64,
    pub ema_id: Option<String>,
    pub auth_tokens: Vec<String>,
    pub event_tracking_id: EventTrackingId,
    pub request_timeout_ms: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelReservationRequestedEvent {
    pub evse_id: EvseId,
    pub reservation_id: ReservationId,
    pub reason: CancellationReason,
    pub event_tracking_id: EventTrackingId,
    pub request_timeout_ms: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStartRequestedEvent {
    pub evse_id: EvseId,
    pub session_id: Option<ChargingSessionId>,
    pub reservation_id: Option<ReservationId>,
    pub ema_id: Option<String>,
    pub auth_token: Option<String>,
    pub event_tracking_id: EventTrackingId,
    pub request_timeout_ms: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteStopRequestedEvent {
    pub evse_id: EvseId,
    pub session_id: ChargingSessionId,
    pub event_tracking_id: EventTrackingId,
    pub request_timeout_ms: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a gated operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEvent {
    pub evse_id: EvseId,
    pub event_tracking_id: EventTrackingId,
    /// Result kind, e.g. "Success", "OutOfService", "Offline"
    pub result: String,
    pub runtime_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationCreatedEvent {
    pub reservation: Reservation,
    pub event_tracking_id: EventTrackingId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationCancelledEvent {
    pub reservation: Reservation,
    pub reason: CancellationReason,
    /// Absent when the expiry sweep cancelled the reservation
    pub event_tracking_id: Option<EventTrackingId>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreatedEvent {
    pub session: ChargingSession,
    pub event_tracking_id: EventTrackingId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeDetailRecordEvent {
    pub charge_detail_record: ChargeDetailRecord,
    pub event_tracking_id: Option<EventTrackingId>,
    pub timestamp: DateTime<Utc>,
}

/// Wrapper for sending events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_with_type_tag() {
        let evse_id: EvseId = "DE*GEF*E1*1".parse().unwrap();
        let now = Utc::now();
        let event = Event::EvseStatusChanged(StatusChangedEvent {
            id: evse_id.clone(),
            old: Timestamped::new(now, EvseStatusType::Available),
            new: Timestamped::new(now, EvseStatusType::Charging),
            event_tracking_id: EventTrackingId::new(),
            timestamp: now,
        });
        assert_eq!(event.evse_id(), Some(&evse_id));

        let json = serde_json::to_value(EventMessage::new(event)).unwrap();
        assert_eq!(json["type"], "EvseStatusChanged");
        assert_eq!(json["data"]["id"], "DE*GEF*E1*1");
        assert_eq!(json["data"]["new"]["value"], "Charging");
    }
}
