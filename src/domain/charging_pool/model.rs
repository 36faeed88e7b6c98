//! Charging pool domain entity

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::ids::{ChargingPoolId, OperatorId};
use crate::domain::status::{AdminStatusKind, HistoryLimits, StatusKind, StatusTracker};
use crate::domain::timestamped::Timestamped;

/// Charging pool status
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ChargingPoolStatusType {
    #[default]
    Unspecified,
    Available,
    Faulted,
    Offline,
    OutOfService,
}

impl StatusKind for ChargingPoolStatusType {
    fn out_of_service() -> Self {
        Self::OutOfService
    }
}

impl fmt::Display for ChargingPoolStatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Charging pool admin status
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ChargingPoolAdminStatusType {
    #[default]
    Unspecified,
    Operational,
    InternalUse,
    OutOfService,
    Planned,
    Removed,
}

impl AdminStatusKind for ChargingPoolAdminStatusType {
    fn is_operational(&self) -> bool {
        matches!(self, Self::Operational | Self::InternalUse)
    }
}

impl fmt::Display for ChargingPoolAdminStatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Charging pool entity: a site with one or more charging stations
#[derive(Debug)]
pub struct ChargingPool {
    pub id: ChargingPoolId,
    pub operator_id: OperatorId,
    pub name: Option<String>,
    pub tracker: StatusTracker<ChargingPoolStatusType, ChargingPoolAdminStatusType>,
}

impl ChargingPool {
    pub fn new(id: ChargingPoolId, limits: HistoryLimits) -> Self {
        let now = Utc::now();
        Self {
            operator_id: id.operator_id().clone(),
            id,
            name: None,
            tracker: StatusTracker::new(
                Timestamped::new(now, ChargingPoolStatusType::OutOfService),
                Timestamped::new(now, ChargingPoolAdminStatusType::OutOfService),
                limits,
            ),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn status(&self) -> Timestamped<ChargingPoolStatusType> {
        self.tracker.effective_status()
    }

    pub fn admin_status(&self) -> Timestamped<ChargingPoolAdminStatusType> {
        *self.tracker.admin_status()
    }
}
