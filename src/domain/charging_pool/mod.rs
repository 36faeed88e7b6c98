//! Charging pool aggregate

pub mod model;

pub use model::{ChargingPool, ChargingPoolAdminStatusType, ChargingPoolStatusType};
