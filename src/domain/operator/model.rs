//! Charging station operator entity

use serde::{Deserialize, Serialize};

use crate::domain::ids::OperatorId;

/// Operator owning charging pools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargingStationOperator {
    pub id: OperatorId,
    pub name: String,
}

impl ChargingStationOperator {
    pub fn new(id: OperatorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
