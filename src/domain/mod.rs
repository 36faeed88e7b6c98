//! Entity graph of the roaming network: identifiers, status schedules,
//! entities and the events they emit.

pub mod charging_pool;
pub mod charging_session;
pub mod charging_station;
pub mod events;
pub mod evse;
pub mod ids;
pub mod operator;
pub mod reservation;
pub mod status;
pub mod timestamped;

// Re-export commonly used types
pub use evse::{
    Evse, EvseAdminStatus, EvseAdminStatusType, EvseAdminStatusUpdate, EvseSettings, EvseStatus,
    EvseStatusType, EvseStatusUpdate,
};
pub use ids::{
    ChargingPoolId, ChargingSessionId, ChargingStationId, EventTrackingId, EvseId, OperatorId,
    ReservationId,
};
pub use status::{ChangeMethod, HistoryLimits, ScheduleChange, StatusSchedule, StatusTracker};
pub use timestamped::Timestamped;

// Re-export DomainError from support for convenience
pub use crate::support::errors::{DomainError, DomainResult};
