//! EVSE charging operations: requests, typed results and the controller
//! running them through the admin status gate.

pub mod controller;
pub mod requests;
pub mod results;

pub use controller::{EvseController, SharedEvseController};
pub use requests::{
    CancelReservationRequest, RemoteStartRequest, RemoteStopRequest, RequestContext,
    RequestOptions, ReserveRequest,
};
pub use results::{
    CancelReservationResult, CancelReservationResultKind, CommandResult, RemoteStartResult,
    RemoteStartResultKind, RemoteStopResult, RemoteStopResultKind, ReservationResult,
    ReservationResultKind, ResultKind,
};
