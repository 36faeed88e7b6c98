//! Outbound ports: interfaces for executing EVSE operations remotely
//!
//! [`RemoteEvsePort`] is the contract between an
//! [`EvseController`](crate::application::charging::EvseController) and
//! whatever actually talks to the charging station (a protocol adapter, a
//! roaming partner, a simulator). The controller only calls it once the
//! admin status gate is open and its own entity checks passed.

use async_trait::async_trait;

use crate::application::charging::requests::{
    CancelReservationRequest, RemoteStartRequest, RemoteStopRequest, RequestContext, ReserveRequest,
};
use crate::application::charging::results::{
    CancelReservationResult, RemoteStartResult, RemoteStopResult, ReservationResult,
};
use crate::domain::ids::EvseId;

/// Remote execution path of an EVSE.
///
/// Implementations report every failure as a result kind (`Rejected`,
/// `Timeout`, `Error`) instead of an error value. The request timeout and
/// cancellation signal in [`RequestContext`] are theirs to honour; the
/// `runtime` field of the returned result is overwritten by the caller.
#[async_trait]
pub trait RemoteEvsePort: Send + Sync {
    /// Reserve the EVSE. A `Success` without payload means the request's
    /// own reservation was accepted unchanged.
    async fn reserve(
        &self,
        evse_id: &EvseId,
        request: &ReserveRequest,
        ctx: &RequestContext,
    ) -> ReservationResult;

    /// Cancel the EVSE's active reservation.
    async fn cancel_reservation(
        &self,
        evse_id: &EvseId,
        request: &CancelReservationRequest,
        ctx: &RequestContext,
    ) -> CancelReservationResult;

    /// Start charging. A `Success` without payload means the session
    /// described by the request was started.
    async fn remote_start(
        &self,
        evse_id: &EvseId,
        request: &RemoteStartRequest,
        ctx: &RequestContext,
    ) -> RemoteStartResult;

    /// Stop the given charging session, optionally returning its CDR.
    async fn remote_stop(
        &self,
        evse_id: &EvseId,
        request: &RemoteStopRequest,
        ctx: &RequestContext,
    ) -> RemoteStopResult;
}
