//! Configuration module
//!
//! Loaded from a TOML file; every section and field has a default, so an
//! empty (or missing) file yields [`AppConfig::default`].
//!
//! ```toml
//! [schedule]
//! max_status_history = 50
//! max_admin_status_history = 50
//!
//! [evse]
//! initial_status = "OutOfService"
//! initial_admin_status = "OutOfService"
//!
//! [events]
//! capacity = 1024
//!
//! [reservations]
//! expiry_check_interval_secs = 60
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::events::event_bus::DEFAULT_CAPACITY;
use crate::domain::evse::{EvseAdminStatusType, EvseSettings, EvseStatusType};
use crate::domain::status::{HistoryLimits, DEFAULT_MAX_STATUS_HISTORY};
use crate::support::errors::ConfigError;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ROAMING_GRAPH_CONFIG";

/// Default config location: `<user config dir>/roaming-graph/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("roaming-graph")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub schedule: ScheduleConfig,
    pub evse: EvseConfig,
    pub events: EventsConfig,
    pub reservations: ReservationsConfig,
    pub logging: LoggingConfig,
}

/// Status history capacities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub max_status_history: usize,
    pub max_admin_status_history: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            max_status_history: DEFAULT_MAX_STATUS_HISTORY,
            max_admin_status_history: DEFAULT_MAX_STATUS_HISTORY,
        }
    }
}

/// Initial state of newly created EVSEs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvseConfig {
    pub initial_status: EvseStatusType,
    pub initial_admin_status: EvseAdminStatusType,
}

impl Default for EvseConfig {
    fn default() -> Self {
        Self {
            initial_status: EvseStatusType::OutOfService,
            initial_admin_status: EvseAdminStatusType::OutOfService,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Messages retained for slow subscribers
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationsConfig {
    pub expiry_check_interval_secs: u64,
}

impl Default for ReservationsConfig {
    fn default() -> Self {
        Self {
            expiry_check_interval_secs: 60,
        }
    }
}

impl ReservationsConfig {
    pub fn expiry_check_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_check_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn history_limits(&self) -> HistoryLimits {
        HistoryLimits {
            status: self.schedule.max_status_history.max(1),
            admin_status: self.schedule.max_admin_status_history.max(1),
        }
    }

    pub fn evse_settings(&self) -> EvseSettings {
        EvseSettings {
            initial_status: self.evse.initial_status,
            initial_admin_status: self.evse.initial_admin_status,
            history: self.history_limits(),
        }
    }
}
