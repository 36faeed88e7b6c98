//! Charging session and charge detail record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ids::{ChargingSessionId, EvseId, ReservationId};

/// A charging session running on an EVSE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargingSession {
    pub id: ChargingSessionId,
    pub evse_id: EvseId,
    pub start_time: DateTime<Utc>,
    /// Reservation consumed by this session
    pub reservation_id: Option<ReservationId>,
    pub ema_id: Option<String>,
    pub auth_token: Option<String>,
}

impl ChargingSession {
    pub fn new(id: ChargingSessionId, evse_id: EvseId, start_time: DateTime<Utc>) -> Self {
        Self {
            id,
            evse_id,
            start_time,
            reservation_id: None,
            ema_id: None,
            auth_token: None,
        }
    }

    /// Close the session, producing its charge detail record
    pub fn finish(&self, stop_time: DateTime<Utc>, energy_kwh: f64) -> ChargeDetailRecord {
        ChargeDetailRecord {
            session_id: self.id.clone(),
            evse_id: self.evse_id.clone(),
            reservation_id: self.reservation_id.clone(),
            ema_id: self.ema_id.clone(),
            start_time: self.start_time,
            stop_time,
            energy_kwh,
        }
    }
}

/// Final record of a charging session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeDetailRecord {
    pub session_id: ChargingSessionId,
    pub evse_id: EvseId,
    pub reservation_id: Option<ReservationId>,
    pub ema_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub stop_time: DateTime<Utc>,
    /// Consumed energy in kWh
    pub energy_kwh: f64,
}

impl ChargeDetailRecord {
    pub fn duration(&self) -> chrono::Duration {
        self.stop_time - self.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn finish_copies_session_fields() {
        let start = Utc::now();
        let mut session = ChargingSession::new(
            "S-1".parse().unwrap(),
            "DE*GEF*E1*1".parse().unwrap(),
            start,
        );
        session.reservation_id = Some("R-1".parse().unwrap());

        let cdr = session.finish(start + Duration::minutes(42), 17.5);
        assert_eq!(cdr.session_id, session.id);
        assert_eq!(cdr.reservation_id, session.reservation_id);
        assert_eq!(cdr.duration(), Duration::minutes(42));
        assert_eq!(cdr.energy_kwh, 17.5);
    }
}
