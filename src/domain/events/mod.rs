//! Domain events
//!
//! Event types that represent facts about what happened in the entity
//! graph. The EventBus implementation lives in `application::events`.

pub mod types;

pub use types::{
    CancelReservationRequestedEvent, ChargeDetailRecordEvent, DataChangedEvent, Event,
    EventMessage, RemoteStartRequestedEvent, RemoteStopRequestedEvent, ReservationCancelledEvent,
    ReservationCreatedEvent, ReserveRequestedEvent, ResponseEvent, SessionCreatedEvent,
    StatusChangedEvent,
};
