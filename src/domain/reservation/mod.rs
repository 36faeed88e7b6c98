//! Reservation aggregate

pub mod model;

pub use model::{CancellationReason, Reservation, ReservationStatus};
