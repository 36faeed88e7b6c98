//! Background task that periodically expires overdue reservations.
//!
//! Runs in a tokio::spawn loop, sweeping every EVSE in the registry for an
//! active reservation past its end time and dropping it (which publishes a
//! `ReservationCancelled` event with reason `Expired`).

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info};

use crate::application::registry::SharedEntityRegistry;
use crate::domain::reservation::Reservation;
use crate::support::cancellation::CancellationSignal;

/// Default sweep interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Expire every reservation that ended before `now`; returns what expired
pub async fn expire_reservations(
    registry: &SharedEntityRegistry,
    now: DateTime<Utc>,
) -> Vec<Reservation> {
    let mut expired = Vec::new();
    for evse in registry.evses() {
        if let Some(reservation) = evse.expire_reservation(now).await {
            expired.push(reservation);
        }
    }

    if expired.is_empty() {
        debug!("No overdue reservations");
    } else {
        info!(count = expired.len(), "Expired overdue reservations");
    }
    expired
}

/// Start the reservation expiry background task.
///
/// The task sweeps every `check_interval` until `cancellation` fires.
pub fn start_reservation_expiry_task(
    registry: SharedEntityRegistry,
    cancellation: CancellationSignal,
    check_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            check_interval_secs = check_interval.as_secs(),
            "Reservation expiry task started"
        );

        let mut interval = tokio::time::interval(check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    expire_reservations(&registry, Utc::now()).await;
                }
                _ = cancellation.cancelled() => {
                    info!("Reservation expiry task shutting down");
                    break;
                }
            }
        }

        info!("Reservation expiry task stopped");
    })
}
