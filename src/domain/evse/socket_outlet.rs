//! Socket outlets of an EVSE

use std::fmt;

use serde::{Deserialize, Serialize};

/// Plug standard of a socket outlet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlugType {
    Type2Outlet,
    Type2Connector,
    Ccs,
    Chademo,
    SchukoTypeF,
    Tesla,
}

impl fmt::Display for PlugType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Type2Outlet => "Type 2 outlet",
            Self::Type2Connector => "Type 2 connector",
            Self::Ccs => "CCS",
            Self::Chademo => "CHAdeMO",
            Self::SchukoTypeF => "Schuko (Type F)",
            Self::Tesla => "Tesla",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketOutlet {
    pub plug: PlugType,
    pub cable_attached: bool,
    /// Cable length in meters
    pub cable_length: Option<f64>,
}

impl SocketOutlet {
    pub fn new(plug: PlugType) -> Self {
        Self {
            plug,
            cable_attached: false,
            cable_length: None,
        }
    }

    pub fn with_cable(mut self, length: f64) -> Self {
        self.cable_attached = true;
        self.cable_length = Some(length);
        self
    }
}
