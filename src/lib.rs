//! # roaming-graph
//!
//! Entity graph of an e-mobility roaming network (operators, charging
//! pools, charging stations, EVSEs) built around bounded, timestamped
//! status histories and an admin status gate in front of every stateful
//! EVSE operation.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: identifiers, status schedules, entities and event types
//! - **application**: EVSE controller, entity registry, event bus,
//!   outbound port and background services
//! - **support**: errors, cancellation and logging setup
//! - **config**: TOML configuration

pub mod application;
pub mod config;
pub mod domain;
pub mod support;

pub use config::{default_config_path, AppConfig};

// Re-export the entry points
pub use application::{
    create_event_bus, EntityRegistry, Event, EventBus, EvseController, RemoteEvsePort,
    SharedEntityRegistry, SharedEventBus,
};
pub use support::errors::{DomainError, DomainResult};
