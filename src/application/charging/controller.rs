//! EVSE controller
//!
//! Owns one [`Evse`] and runs everything that touches it: status and
//! property setters that publish change events, and the gated operations
//! (reserve, cancel reservation, remote start, remote stop) that go through
//! the admin status gate before reaching the attached [`RemoteEvsePort`].

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::requests::{
    CancelReservationRequest, RemoteStartRequest, RemoteStopRequest, RequestContext,
    RequestOptions, ReserveRequest,
};
use super::results::{
    CancelReservationResult, CancelReservationResultKind, CommandResult, RemoteStartResult,
    RemoteStartResultKind, RemoteStopResult, RemoteStopResultKind, ReservationResult,
    ReservationResultKind, ResultKind,
};
use crate::application::events::{
    CancelReservationRequestedEvent, ChargeDetailRecordEvent, DataChangedEvent, Event,
    RemoteStartRequestedEvent, RemoteStopRequestedEvent, ReservationCancelledEvent,
    ReservationCreatedEvent, ReserveRequestedEvent, ResponseEvent, SessionCreatedEvent,
    SharedEventBus, StatusChangedEvent,
};
use crate::application::ports::RemoteEvsePort;
use crate::domain::charging_session::{ChargeDetailRecord, ChargingSession};
use crate::domain::evse::{
    Evse, EvseActivity, EvseAdminStatus, EvseAdminStatusType, EvseAdminStatusUpdate,
    EvseStatus, EvseStatusType, EvseStatusUpdate, PropertyChange, SocketOutlet,
};
use crate::domain::ids::{
    ChargingSessionId, ChargingStationId, EventTrackingId, EvseId, ReservationId,
};
use crate::domain::reservation::{CancellationReason, Reservation};
use crate::domain::status::{ChangeMethod, ScheduleChange, ScheduleListener};
use crate::domain::timestamped::Timestamped;
use crate::support::errors::{DomainError, DomainResult};

/// Shared EVSE controller type
pub type SharedEvseController = Arc<EvseController>;

/// Concurrency wrapper and operation runner for a single EVSE.
///
/// State reads and setters use a reader/writer lock; gated operations are
/// additionally serialized by a per-EVSE operation lock so that the entity
/// checks, the remote call and the resulting mutation happen as one step.
pub struct EvseController {
    id: EvseId,
    station_id: ChargingStationId,
    evse: RwLock<Evse>,
    operation_lock: Mutex<()>,
    remote: RwLock<Option<Arc<dyn RemoteEvsePort>>>,
    events: SharedEventBus,
}

impl EvseController {
    pub fn new(evse: Evse, events: SharedEventBus) -> Self {
        Self {
            id: evse.id().clone(),
            station_id: evse.station_id().clone(),
            evse: RwLock::new(evse),
            operation_lock: Mutex::new(()),
            remote: RwLock::new(None),
            events,
        }
    }

    pub fn id(&self) -> &EvseId {
        &self.id
    }

    pub fn events(&self) -> &SharedEventBus {
        &self.events
    }

    // ── Remote execution path ──────────────────────────────────

    pub async fn attach_remote(&self, remote: Arc<dyn RemoteEvsePort>) {
        *self.remote.write().await = Some(remote);
        info!(evse_id = %self.id, "Remote execution path attached");
    }

    pub async fn detach_remote(&self) -> Option<Arc<dyn RemoteEvsePort>> {
        let previous = self.remote.write().await.take();
        if previous.is_some() {
            info!(evse_id = %self.id, "Remote execution path detached");
        }
        previous
    }

    pub async fn has_remote(&self) -> bool {
        self.remote.read().await.is_some()
    }

    // ── Reads ──────────────────────────────────────────────────

    /// Run `f` against a read-locked view of the EVSE
    pub async fn read<R>(&self, f: impl FnOnce(&Evse) -> R) -> R {
        f(&*self.evse.read().await)
    }

    /// Parent charging station; fixed for the lifetime of the EVSE
    pub fn station_id(&self) -> &ChargingStationId {
        &self.station_id
    }

    pub async fn status(&self) -> Timestamped<EvseStatusType> {
        self.read(Evse::status).await
    }

    pub async fn admin_status(&self) -> Timestamped<EvseAdminStatusType> {
        self.read(Evse::admin_status).await
    }

    pub async fn status_schedule(
        &self,
        history_size: Option<usize>,
    ) -> Vec<Timestamped<EvseStatusType>> {
        self.read(|evse| evse.status_schedule(history_size)).await
    }

    pub async fn admin_status_schedule(
        &self,
        history_size: Option<usize>,
    ) -> Vec<Timestamped<EvseAdminStatusType>> {
        self.read(|evse| evse.admin_status_schedule(history_size)).await
    }

    pub async fn status_record(&self) -> EvseStatus {
        self.read(EvseStatus::snapshot).await
    }

    pub async fn admin_status_record(&self) -> EvseAdminStatus {
        self.read(EvseAdminStatus::snapshot).await
    }

    pub async fn status_update(&self) -> EvseStatusUpdate {
        self.read(EvseStatusUpdate::snapshot).await
    }

    pub async fn admin_status_update(&self) -> EvseAdminStatusUpdate {
        self.read(EvseAdminStatusUpdate::snapshot).await
    }

    pub async fn reservation(&self) -> Option<Reservation> {
        self.read(|evse| evse.reservation().cloned()).await
    }

    pub async fn session(&self) -> Option<ChargingSession> {
        self.read(|evse| evse.session().cloned()).await
    }

    pub async fn activity(&self) -> EvseActivity {
        self.read(Evse::activity).await
    }

    // ── Status setters ─────────────────────────────────────────

    /// Register a synchronous listener on the raw status schedule
    pub async fn subscribe_status(&self, listener: ScheduleListener<EvseStatusType>) {
        self.evse
            .write()
            .await
            .tracker_mut()
            .status_schedule_mut()
            .subscribe(listener);
    }

    /// Register a synchronous listener on the admin status schedule
    pub async fn subscribe_admin_status(&self, listener: ScheduleListener<EvseAdminStatusType>) {
        self.evse
            .write()
            .await
            .tracker_mut()
            .admin_status_schedule_mut()
            .subscribe(listener);
    }

    pub async fn set_status(
        &self,
        status: EvseStatusType,
        options: RequestOptions,
    ) -> Option<ScheduleChange<EvseStatusType>> {
        let ctx = options.resolve();
        let mut evse = self.evse.write().await;
        let change = evse.set_status(status, ctx.timestamp, ctx.event_tracking_id);
        if let Some(change) = &change {
            self.publish_status_change(change);
        }
        change
    }

    pub async fn set_admin_status(
        &self,
        admin_status: EvseAdminStatusType,
        options: RequestOptions,
    ) -> Option<ScheduleChange<EvseAdminStatusType>> {
        let ctx = options.resolve();
        let mut evse = self.evse.write().await;
        let change = evse.set_admin_status(admin_status, ctx.timestamp, ctx.event_tracking_id);
        if let Some(change) = &change {
            self.publish_admin_status_change(change);
        }
        change
    }

    pub async fn set_status_list(
        &self,
        entries: Vec<Timestamped<EvseStatusType>>,
        method: ChangeMethod,
    ) -> DomainResult<Option<ScheduleChange<EvseStatusType>>> {
        let mut evse = self.evse.write().await;
        let change = evse.set_status_list(entries, method)?;
        if let Some(change) = &change {
            self.publish_status_change(change);
        }
        Ok(change)
    }

    pub async fn set_admin_status_list(
        &self,
        entries: Vec<Timestamped<EvseAdminStatusType>>,
        method: ChangeMethod,
    ) -> DomainResult<Option<ScheduleChange<EvseAdminStatusType>>> {
        let mut evse = self.evse.write().await;
        let change = evse.set_admin_status_list(entries, method)?;
        if let Some(change) = &change {
            self.publish_admin_status_change(change);
        }
        Ok(change)
    }

    fn publish_status_change(&self, change: &ScheduleChange<EvseStatusType>) {
        debug!(
            evse_id = %self.id,
            old = %change.old.value,
            new = %change.new.value,
            "EVSE status changed"
        );
        self.events.publish(Event::EvseStatusChanged(StatusChangedEvent {
            id: self.id.clone(),
            old: change.old,
            new: change.new,
            event_tracking_id: change.event_tracking_id,
            timestamp: change.timestamp,
        }));
    }

    fn publish_admin_status_change(&self, change: &ScheduleChange<EvseAdminStatusType>) {
        info!(
            evse_id = %self.id,
            old = %change.old.value,
            new = %change.new.value,
            "EVSE admin status changed"
        );
        self.events
            .publish(Event::EvseAdminStatusChanged(StatusChangedEvent {
                id: self.id.clone(),
                old: change.old,
                new: change.new,
                event_tracking_id: change.event_tracking_id,
                timestamp: change.timestamp,
            }));
    }

    // ── Property setters ───────────────────────────────────────

    pub async fn set_description(&self, description: Option<String>) -> Option<PropertyChange> {
        let mut evse = self.evse.write().await;
        let change = evse.set_description(description);
        if let Some(change) = &change {
            self.publish_data_change(change.clone());
        }
        change
    }

    pub async fn set_max_power(&self, max_power: Option<f64>) -> DomainResult<Option<PropertyChange>> {
        let mut evse = self.evse.write().await;
        let change = evse.set_max_power(max_power)?;
        if let Some(change) = &change {
            self.publish_data_change(change.clone());
        }
        Ok(change)
    }

    pub async fn add_socket_outlet(&self, outlet: SocketOutlet) -> PropertyChange {
        let mut evse = self.evse.write().await;
        let change = evse.add_socket_outlet(outlet);
        self.publish_data_change(change.clone());
        change
    }

    fn publish_data_change(&self, change: PropertyChange) {
        self.events.publish(Event::EvseDataChanged(DataChangedEvent {
            evse_id: self.id.clone(),
            change,
            timestamp: Utc::now(),
        }));
    }

    // ── Gated operations ───────────────────────────────────────

    /// Admin status gate: the remote to delegate to, or the short-circuit
    /// result (`OutOfService` while closed, `Offline` without a remote).
    async fn gate<K: ResultKind, P>(&self) -> Result<Arc<dyn RemoteEvsePort>, CommandResult<K, P>> {
        if !self.evse.read().await.is_operational() {
            return Err(CommandResult::out_of_service());
        }
        match self.remote.read().await.clone() {
            Some(remote) => Ok(remote),
            None => Err(CommandResult::offline()),
        }
    }

    /// Stamp the runtime, record metrics and build the response event
    fn finish<K: ResultKind, P>(
        &self,
        operation: &'static str,
        ctx: &RequestContext,
        started: Instant,
        result: CommandResult<K, P>,
    ) -> (CommandResult<K, P>, ResponseEvent) {
        let runtime = started.elapsed();
        let result = result.with_runtime(runtime);

        metrics::counter!(
            "evse_operations_total",
            "operation" => operation,
            "result" => result.kind.to_string()
        )
        .increment(1);
        metrics::histogram!("evse_operation_duration_seconds", "operation" => operation)
            .record(runtime.as_secs_f64());

        if result.is_success() {
            info!(
                evse_id = %self.id,
                operation,
                event_tracking_id = %ctx.event_tracking_id,
                runtime_ms = runtime.as_millis() as u64,
                "EVSE operation succeeded"
            );
        } else {
            warn!(
                evse_id = %self.id,
                operation,
                event_tracking_id = %ctx.event_tracking_id,
                result = %result.kind,
                description = ?result.description,
                "EVSE operation not successful"
            );
        }

        let response = ResponseEvent {
            evse_id: self.id.clone(),
            event_tracking_id: ctx.event_tracking_id,
            result: result.kind.to_string(),
            runtime_ms: runtime.as_millis() as u64,
            timestamp: Utc::now(),
        };
        (result, response)
    }

    /// Reserve this EVSE.
    ///
    /// Invalid input is rejected before any event is published. A request
    /// without reservation id gets a fresh one, so the request event, the
    /// remote call and the installed reservation all agree on it.
    pub async fn reserve(
        &self,
        mut request: ReserveRequest,
        options: RequestOptions,
    ) -> DomainResult<ReservationResult> {
        let ctx = options.resolve();
        request.validate(ctx.timestamp)?;
        request
            .reservation_id
            .get_or_insert_with(ReservationId::new_random);

        let _guard = self.operation_lock.lock().await;
        let started = Instant::now();

        self.events.publish(Event::ReserveRequested(ReserveRequestedEvent {
            evse_id: self.id.clone(),
            reservation_id: request.reservation_id.clone(),
            start_time: request.start_time,
            duration_secs: request.duration.num_seconds(),
            ema_id: request.ema_id.clone(),
            auth_tokens: request.auth_tokens.clone(),
            event_tracking_id: ctx.event_tracking_id,
            request_timeout_ms: ctx.request_timeout_ms(),
            timestamp: ctx.timestamp,
        }));

        let result = match self.gate().await {
            Err(short_circuit) => short_circuit,
            Ok(remote) => self.reserve_remotely(remote, &request, &ctx).await,
        };

        let (result, response) = self.finish("reserve", &ctx, started, result);
        self.events.publish(Event::ReserveResponded(response));
        Ok(result)
    }

    async fn reserve_remotely(
        &self,
        remote: Arc<dyn RemoteEvsePort>,
        request: &ReserveRequest,
        ctx: &RequestContext,
    ) -> ReservationResult {
        {
            let mut evse = self.evse.write().await;
            self.drop_expired_reservation(&mut evse, ctx.timestamp, Some(ctx.event_tracking_id));
            if let Some(active) = evse.reservation() {
                if request.reservation_id.as_ref() != Some(&active.id) {
                    return ReservationResult::new(ReservationResultKind::AlreadyReserved)
                        .with_description(format!("reserved by {}", active.id));
                }
            }
            if let Some(session) = evse.session() {
                return ReservationResult::new(ReservationResultKind::AlreadyInUse)
                    .with_description(format!("in use by session {}", session.id));
            }
        }

        let mut result = remote.reserve(&self.id, request, ctx).await;
        if !result.is_success() {
            return result;
        }

        let reservation = result
            .payload
            .take()
            .unwrap_or_else(|| request.to_reservation(&self.id, ctx));

        let mut evse = self.evse.write().await;
        if let Err(e) = evse.install_reservation(reservation.clone()) {
            warn!(evse_id = %self.id, error = %e, "Accepted reservation could not be installed");
            return ReservationResult::new(ReservationResultKind::AlreadyReserved)
                .with_description(e.to_string());
        }
        self.events
            .publish(Event::ReservationCreated(ReservationCreatedEvent {
                reservation: reservation.clone(),
                event_tracking_id: ctx.event_tracking_id,
                timestamp: ctx.timestamp,
            }));
        result.with_payload(reservation)
    }

    /// Cancel the active reservation.
    ///
    /// Returns `Success` without touching anything when no reservation is
    /// active, and `UnknownReservationId` when another one is; both before
    /// the gate is consulted.
    pub async fn cancel_reservation(
        &self,
        request: CancelReservationRequest,
        options: RequestOptions,
    ) -> DomainResult<CancelReservationResult> {
        let ctx = options.resolve();

        let _guard = self.operation_lock.lock().await;
        let started = Instant::now();

        self.events
            .publish(Event::CancelReservationRequested(CancelReservationRequestedEvent {
                evse_id: self.id.clone(),
                reservation_id: request.reservation_id.clone(),
                reason: request.reason,
                event_tracking_id: ctx.event_tracking_id,
                request_timeout_ms: ctx.request_timeout_ms(),
                timestamp: ctx.timestamp,
            }));

        let active = self.read(|evse| evse.reservation().map(|r| r.id.clone())).await;
        let result = match active {
            None => CancelReservationResult::new(CancelReservationResultKind::Success),
            Some(id) if id != request.reservation_id => {
                CancelReservationResult::new(CancelReservationResultKind::UnknownReservationId)
                    .with_description(format!("active reservation is {id}"))
            }
            Some(_) => match self.gate().await {
                Err(short_circuit) => short_circuit,
                Ok(remote) => self.cancel_remotely(remote, &request, &ctx).await,
            },
        };

        let (result, response) = self.finish("cancel_reservation", &ctx, started, result);
        self.events.publish(Event::CancelReservationResponded(response));
        Ok(result)
    }

    async fn cancel_remotely(
        &self,
        remote: Arc<dyn RemoteEvsePort>,
        request: &CancelReservationRequest,
        ctx: &RequestContext,
    ) -> CancelReservationResult {
        let result = remote.cancel_reservation(&self.id, request, ctx).await;
        if !result.is_success() {
            return result;
        }

        let mut evse = self.evse.write().await;
        match evse.cancel_reservation(&request.reservation_id) {
            Some(reservation) => {
                self.events
                    .publish(Event::ReservationCancelled(ReservationCancelledEvent {
                        reservation: reservation.clone(),
                        reason: request.reason,
                        event_tracking_id: Some(ctx.event_tracking_id),
                        timestamp: ctx.timestamp,
                    }));
                result.with_payload(reservation)
            }
            None => result,
        }
    }

    /// Start a charging session.
    pub async fn remote_start(
        &self,
        mut request: RemoteStartRequest,
        options: RequestOptions,
    ) -> DomainResult<RemoteStartResult> {
        request.validate()?;
        request
            .session_id
            .get_or_insert_with(ChargingSessionId::new_random);
        let ctx = options.resolve();

        let _guard = self.operation_lock.lock().await;
        let started = Instant::now();

        self.events
            .publish(Event::RemoteStartRequested(RemoteStartRequestedEvent {
                evse_id: self.id.clone(),
                session_id: request.session_id.clone(),
                reservation_id: request.reservation_id.clone(),
                ema_id: request.ema_id.clone(),
                auth_token: request.auth_token.clone(),
                event_tracking_id: ctx.event_tracking_id,
                request_timeout_ms: ctx.request_timeout_ms(),
                timestamp: ctx.timestamp,
            }));

        let result = match self.gate().await {
            Err(short_circuit) => short_circuit,
            Ok(remote) => self.start_remotely(remote, &request, &ctx).await,
        };

        let (result, response) = self.finish("remote_start", &ctx, started, result);
        self.events.publish(Event::RemoteStartResponded(response));
        Ok(result)
    }

    async fn start_remotely(
        &self,
        remote: Arc<dyn RemoteEvsePort>,
        request: &RemoteStartRequest,
        ctx: &RequestContext,
    ) -> RemoteStartResult {
        {
            let mut evse = self.evse.write().await;
            self.drop_expired_reservation(&mut evse, ctx.timestamp, Some(ctx.event_tracking_id));
            if let Some(session) = evse.session() {
                return RemoteStartResult::new(RemoteStartResultKind::AlreadyInUse)
                    .with_description(format!("in use by session {}", session.id));
            }
            if let Some(reservation) = evse.reservation() {
                if request.reservation_id.as_ref() != Some(&reservation.id) {
                    return RemoteStartResult::new(RemoteStartResultKind::Reserved)
                        .with_description(format!("reserved by {}", reservation.id));
                }
            }
        }

        let mut result = remote.remote_start(&self.id, request, ctx).await;
        if !result.is_success() {
            return result;
        }

        let session = result
            .payload
            .take()
            .unwrap_or_else(|| request.to_session(&self.id, ctx));

        let mut evse = self.evse.write().await;
        match evse.start_session(session.clone()) {
            Ok(consumed) => {
                if let Some(reservation) = consumed {
                    debug!(
                        evse_id = %self.id,
                        reservation_id = %reservation.id,
                        "Reservation consumed by session"
                    );
                }
                self.events.publish(Event::SessionCreated(SessionCreatedEvent {
                    session: session.clone(),
                    event_tracking_id: ctx.event_tracking_id,
                    timestamp: ctx.timestamp,
                }));
                result.with_payload(session)
            }
            Err(e) => {
                warn!(evse_id = %self.id, error = %e, "Started session could not be installed");
                RemoteStartResult::new(RemoteStartResultKind::AlreadyInUse)
                    .with_description(e.to_string())
            }
        }
    }

    /// Stop the active charging session.
    pub async fn remote_stop(
        &self,
        request: RemoteStopRequest,
        options: RequestOptions,
    ) -> DomainResult<RemoteStopResult> {
        let ctx = options.resolve();

        let _guard = self.operation_lock.lock().await;
        let started = Instant::now();

        self.events
            .publish(Event::RemoteStopRequested(RemoteStopRequestedEvent {
                evse_id: self.id.clone(),
                session_id: request.session_id.clone(),
                event_tracking_id: ctx.event_tracking_id,
                request_timeout_ms: ctx.request_timeout_ms(),
                timestamp: ctx.timestamp,
            }));

        let result = match self.gate().await {
            Err(short_circuit) => short_circuit,
            Ok(remote) => self.stop_remotely(remote, &request, &ctx).await,
        };

        let (result, response) = self.finish("remote_stop", &ctx, started, result);
        self.events.publish(Event::RemoteStopResponded(response));
        Ok(result)
    }

    async fn stop_remotely(
        &self,
        remote: Arc<dyn RemoteEvsePort>,
        request: &RemoteStopRequest,
        ctx: &RequestContext,
    ) -> RemoteStopResult {
        let active = self.read(|evse| evse.session().map(|s| s.id.clone())).await;
        if active.as_ref() != Some(&request.session_id) {
            return RemoteStopResult::new(RemoteStopResultKind::InvalidSessionId)
                .with_description(format!("no active session {}", request.session_id));
        }

        let result = remote.remote_stop(&self.id, request, ctx).await;
        if !result.is_success() {
            return result;
        }

        let mut evse = self.evse.write().await;
        evse.stop_session(&request.session_id);
        if let Some(cdr) = &result.payload {
            self.publish_charge_detail_record(cdr.clone(), Some(ctx), ctx.timestamp);
        }
        result
    }

    /// Close the active session with a charge detail record reported by
    /// the station.
    pub async fn receive_charge_detail_record(&self, cdr: ChargeDetailRecord) -> DomainResult<()> {
        if cdr.evse_id != self.id {
            return Err(DomainError::invalid_argument(format!(
                "charge detail record for EVSE {} sent to EVSE {}",
                cdr.evse_id, self.id
            )));
        }

        let _guard = self.operation_lock.lock().await;
        let mut evse = self.evse.write().await;
        if evse.stop_session(&cdr.session_id).is_none() {
            return Err(DomainError::invalid_argument(format!(
                "no active charging session {} on EVSE {}",
                cdr.session_id, self.id
            )));
        }

        info!(
            evse_id = %self.id,
            session_id = %cdr.session_id,
            energy_kwh = cdr.energy_kwh,
            "Charge detail record received"
        );
        self.publish_charge_detail_record(cdr, None, Utc::now());
        Ok(())
    }

    fn publish_charge_detail_record(
        &self,
        charge_detail_record: ChargeDetailRecord,
        ctx: Option<&RequestContext>,
        timestamp: DateTime<Utc>,
    ) {
        self.events
            .publish(Event::ChargeDetailRecordCreated(ChargeDetailRecordEvent {
                charge_detail_record,
                event_tracking_id: ctx.map(|c| c.event_tracking_id),
                timestamp,
            }));
    }

    /// Drop the active reservation if it ran past its end time
    pub async fn expire_reservation(&self, now: DateTime<Utc>) -> Option<Reservation> {
        let _guard = self.operation_lock.lock().await;
        let mut evse = self.evse.write().await;
        self.drop_expired_reservation(&mut evse, now, None)
    }

    /// Caller holds the operation lock.
    fn drop_expired_reservation(
        &self,
        evse: &mut Evse,
        now: DateTime<Utc>,
        event_tracking_id: Option<EventTrackingId>,
    ) -> Option<Reservation> {
        let expired = evse.expire_reservation(now)?;

        info!(
            evse_id = %self.id,
            reservation_id = %expired.id,
            "Reservation expired"
        );
        self.events
            .publish(Event::ReservationCancelled(ReservationCancelledEvent {
                reservation: expired.clone(),
                reason: CancellationReason::Expired,
                event_tracking_id,
                timestamp: now,
            }));
        Some(expired)
    }
}

impl std::fmt::Debug for EvseController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvseController")
            .field("id", &self.id)
            .field("station_id", &self.station_id)
            .finish_non_exhaustive()
    }
}

// ── Tests ──────────────────────────────────────────────────────
