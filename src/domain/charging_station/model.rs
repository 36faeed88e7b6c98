//! Charging station domain entity

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::ids::{ChargingPoolId, ChargingStationId};
use crate::domain::status::{AdminStatusKind, HistoryLimits, StatusKind, StatusTracker};
use crate::domain::timestamped::Timestamped;

/// Charging station status
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ChargingStationStatusType {
    #[default]
    Unspecified,
    Available,
    Faulted,
    Offline,
    OutOfService,
}

impl StatusKind for ChargingStationStatusType {
    fn out_of_service() -> Self {
        Self::OutOfService
    }
}

impl fmt::Display for ChargingStationStatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Charging station admin status
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ChargingStationAdminStatusType {
    #[default]
    Unspecified,
    Operational,
    InternalUse,
    OutOfService,
    Planned,
    Removed,
}

impl AdminStatusKind for ChargingStationAdminStatusType {
    fn is_operational(&self) -> bool {
        matches!(self, Self::Operational | Self::InternalUse)
    }
}

impl fmt::Display for ChargingStationAdminStatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Charging station entity, grouping EVSEs at one physical location
#[derive(Debug)]
pub struct ChargingStation {
    pub id: ChargingStationId,
    pub pool_id: ChargingPoolId,
    pub name: Option<String>,
    pub tracker: StatusTracker<ChargingStationStatusType, ChargingStationAdminStatusType>,
}

impl ChargingStation {
    pub fn new(id: ChargingStationId, pool_id: ChargingPoolId, limits: HistoryLimits) -> Self {
        let now = Utc::now();
        Self {
            id,
            pool_id,
            name: None,
            tracker: StatusTracker::new(
                Timestamped::new(now, ChargingStationStatusType::OutOfService),
                Timestamped::new(now, ChargingStationAdminStatusType::OutOfService),
                limits,
            ),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn status(&self) -> Timestamped<ChargingStationStatusType> {
        self.tracker.effective_status()
    }

    pub fn admin_status(&self) -> Timestamped<ChargingStationAdminStatusType> {
        *self.tracker.admin_status()
    }
}
