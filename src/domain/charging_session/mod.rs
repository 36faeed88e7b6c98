//! Charging session aggregate

pub mod model;

pub use model::{ChargeDetailRecord, ChargingSession};
