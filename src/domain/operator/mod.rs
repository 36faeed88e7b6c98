//! Charging station operator aggregate

pub mod model;

pub use model::ChargingStationOperator;
