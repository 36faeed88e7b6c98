//! Request payloads and the optional envelope of the gated EVSE operations

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::charging_session::ChargingSession;
use crate::domain::ids::{ChargingSessionId, EventTrackingId, EvseId, ReservationId};
use crate::domain::reservation::{CancellationReason, Reservation};
use crate::support::cancellation::CancellationSignal;
use crate::support::errors::{DomainError, DomainResult};

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

// ── Envelope ───────────────────────────────────────────────────

/// Optional envelope accepted by every gated operation
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub timestamp: Option<DateTime<Utc>>,
    pub event_tracking_id: Option<EventTrackingId>,
    pub request_timeout: Option<StdDuration>,
    pub cancellation: Option<CancellationSignal>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn tracked_by(mut self, event_tracking_id: EventTrackingId) -> Self {
        self.event_tracking_id = Some(event_tracking_id);
        self
    }

    pub fn with_timeout(mut self, request_timeout: StdDuration) -> Self {
        self.request_timeout = Some(request_timeout);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationSignal) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// Fill in the current time and a fresh tracking id where absent
    pub fn resolve(self) -> RequestContext {
        RequestContext {
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            event_tracking_id: self.event_tracking_id.unwrap_or_default(),
            request_timeout: self.request_timeout,
            cancellation: self.cancellation,
        }
    }
}

/// Resolved envelope, forwarded as-is to the remote execution path
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub timestamp: DateTime<Utc>,
    pub event_tracking_id: EventTrackingId,
    pub request_timeout: Option<StdDuration>,
    pub cancellation: Option<CancellationSignal>,
}

impl RequestContext {
    pub fn request_timeout_ms(&self) -> Option<u64> {
        self.request_timeout.map(|t| t.as_millis() as u64)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(|c| c.is_cancelled())
    }
}

// ── Reserve ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveRequest {
    /// Reusing the active reservation's id updates that reservation
    pub reservation_id: Option<ReservationId>,
    /// Defaults to the request timestamp
    pub start_time: Option<DateTime<Utc>>,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub ema_id: Option<String>,
    #[serde(default)]
    pub auth_tokens: Vec<String>,
}

impl ReserveRequest {
    pub fn new(duration: Duration) -> Self {
        Self {
            reservation_id: None,
            start_time: None,
            duration,
            ema_id: None,
            auth_tokens: Vec::new(),
        }
    }

    pub fn with_id(mut self, reservation_id: ReservationId) -> Self {
        self.reservation_id = Some(reservation_id);
        self
    }

    pub fn starting_at(mut self, start_time: DateTime<Utc>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn with_ema_id(mut self, ema_id: impl Into<String>) -> Self {
        self.ema_id = Some(ema_id.into());
        self
    }

    pub fn with_auth_tokens(mut self, auth_tokens: Vec<String>) -> Self {
        self.auth_tokens = auth_tokens;
        self
    }

    /// Checks the request as of `now`: the duration must be positive, the
    /// reservation must not have ended already, and identifiers that are
    /// supplied must not be blank.
    pub fn validate(&self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.duration <= Duration::zero() {
            return Err(DomainError::invalid_argument(format!(
                "reservation duration must be positive, got {}s",
                self.duration.num_seconds()
            )));
        }
        let end_time = self.start_time.unwrap_or(now) + self.duration;
        if end_time <= now {
            return Err(DomainError::invalid_argument(format!(
                "reservation would have ended at {end_time}"
            )));
        }
        if self.ema_id.as_deref().is_some_and(blank) {
            return Err(DomainError::invalid_argument("eMA id must not be blank"));
        }
        if self.auth_tokens.iter().any(|t| blank(t)) {
            return Err(DomainError::invalid_argument("auth tokens must not be blank"));
        }
        Ok(())
    }

    /// The reservation this request describes, as installed on success
    pub fn to_reservation(&self, evse_id: &EvseId, ctx: &RequestContext) -> Reservation {
        let mut reservation = Reservation::new(
            self.reservation_id.clone().unwrap_or_else(ReservationId::new_random),
            evse_id.clone(),
            self.start_time.unwrap_or(ctx.timestamp),
            self.duration,
        );
        if let Some(ema_id) = &self.ema_id {
            reservation = reservation.with_ema_id(ema_id.clone());
        }
        reservation.with_auth_tokens(self.auth_tokens.clone())
    }
}

mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        i64::deserialize(deserializer).map(Duration::seconds)
    }
}

// ── Cancel reservation ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReservationRequest {
    pub reservation_id: ReservationId,
    pub reason: CancellationReason,
}

impl CancelReservationRequest {
    pub fn new(reservation_id: ReservationId, reason: CancellationReason) -> Self {
        Self {
            reservation_id,
            reason,
        }
    }
}

// ── Remote start / stop ────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStartRequest {
    pub session_id: Option<ChargingSessionId>,
    /// Must name the active reservation when the EVSE is reserved
    pub reservation_id: Option<ReservationId>,
    pub ema_id: Option<String>,
    pub auth_token: Option<String>,
}

impl RemoteStartRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session_id(mut self, session_id: ChargingSessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_reservation(mut self, reservation_id: ReservationId) -> Self {
        self.reservation_id = Some(reservation_id);
        self
    }

    pub fn with_ema_id(mut self, ema_id: impl Into<String>) -> Self {
        self.ema_id = Some(ema_id.into());
        self
    }

    pub fn with_auth_token(mut self, auth_token: impl Into<String>) -> Self {
        self.auth_token = Some(auth_token.into());
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.ema_id.as_deref().is_some_and(blank) {
            return Err(DomainError::invalid_argument("eMA id must not be empty"));
        }
        if self.auth_token.as_deref().is_some_and(blank) {
            return Err(DomainError::invalid_argument("auth token must not be empty"));
        }
        Ok(())
    }

    /// The session this request describes, as installed on success
    pub fn to_session(&self, evse_id: &EvseId, ctx: &RequestContext) -> ChargingSession {
        let mut session = ChargingSession::new(
            self.session_id.clone().unwrap_or_else(ChargingSessionId::new_random),
            evse_id.clone(),
            ctx.timestamp,
        );
        session.reservation_id = self.reservation_id.clone();
        session.ema_id = self.ema_id.clone();
        session.auth_token = self.auth_token.clone();
        session
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStopRequest {
    pub session_id: ChargingSessionId,
}

impl RemoteStopRequest {
    pub fn new(session_id: ChargingSessionId) -> Self {
        Self { session_id }
    }
}
