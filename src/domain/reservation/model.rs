//! Reservation domain entity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{EvseId, ReservationId};

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Reservation accepted for the EVSE
    Accepted,
    /// Reservation cancelled by the provider or the operator
    Cancelled,
    /// Reservation expired (past its end time)
    Expired,
    /// Reservation was used (charging session started)
    Used,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::Cancelled => "Cancelled",
            Self::Expired => "Expired",
            Self::Used => "Used",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a reservation ended without being used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CancellationReason {
    /// Deleted on request of the provider
    Deleted,
    /// Ran past its end time
    Expired,
    /// Aborted by the operator
    Aborted,
}

/// EVSE reservation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub evse_id: EvseId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// e-Mobility account the reservation was made for
    pub ema_id: Option<String>,
    /// Authentication tokens (RFID) allowed to use the reservation
    pub auth_tokens: Vec<String>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(
        id: ReservationId,
        evse_id: EvseId,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            id,
            evse_id,
            start_time,
            end_time: start_time + duration,
            ema_id: None,
            auth_tokens: Vec::new(),
            status: ReservationStatus::Accepted,
            created_at: Utc::now(),
        }
    }

    pub fn with_ema_id(mut self, ema_id: impl Into<String>) -> Self {
        self.ema_id = Some(ema_id.into());
        self
    }

    pub fn with_auth_tokens(mut self, auth_tokens: Vec<String>) -> Self {
        self.auth_tokens = auth_tokens;
        self
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn cancel(&mut self) {
        self.status = ReservationStatus::Cancelled;
    }

    pub fn expire(&mut self) {
        self.status = ReservationStatus::Expired;
    }

    pub fn mark_used(&mut self) {
        self.status = ReservationStatus::Used;
    }

    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Accepted
    }

    /// Expired either explicitly or because `now` is past the end time
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Expired || now > self.end_time
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_reservation(start: DateTime<Utc>) -> Reservation {
        Reservation::new(
            "R-1".parse().unwrap(),
            "DE*GEF*E1*1".parse().unwrap(),
            start,
            Duration::minutes(15),
        )
    }

    #[test]
    fn new_reservation_is_active() {
        let now = Utc::now();
        let r = sample_reservation(now);
        assert!(r.is_active());
        assert!(!r.is_expired(now));
        assert_eq!(r.end_time, now + Duration::minutes(15));
        assert_eq!(r.duration(), Duration::minutes(15));
    }

    #[test]
    fn cancel_sets_cancelled() {
        let mut r = sample_reservation(Utc::now());
        r.cancel();
        assert_eq!(r.status, ReservationStatus::Cancelled);
        assert!(!r.is_active());
    }

    #[test]
    fn mark_used_sets_used() {
        let mut r = sample_reservation(Utc::now());
        r.mark_used();
        assert_eq!(r.status, ReservationStatus::Used);
        assert!(!r.is_active());
    }

    #[test]
    fn expired_when_past_end_time() {
        let start = Utc::now() - Duration::hours(1);
        let r = sample_reservation(start);
        assert!(r.is_expired(Utc::now()));

        let mut fresh = sample_reservation(Utc::now());
        fresh.expire();
        assert!(fresh.is_expired(fresh.start_time));
    }

    #[test]
    fn builders_set_authorization() {
        let r = sample_reservation(Utc::now())
            .with_ema_id("DE-GDF-C12345678-X")
            .with_auth_tokens(vec!["AABBCCDD".into()]);
        assert_eq!(r.ema_id.as_deref(), Some("DE-GDF-C12345678-X"));
        assert_eq!(r.auth_tokens, vec!["AABBCCDD".to_string()]);
    }
}
