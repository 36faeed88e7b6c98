//! EVSE aggregate
//!
//! Contains the EVSE entity, its status enumerations, socket outlets and
//! the status value objects handed to downstream receivers.

pub mod model;
pub mod socket_outlet;
pub mod status;

pub use model::{
    Evse, EvseActivity, EvseAdminStatusType, EvseSettings, EvseStatusType, PropertyChange,
};
pub use socket_outlet::{PlugType, SocketOutlet};
pub use status::{
    EvseAdminStatus, EvseAdminStatusUpdate, EvseStatus, EvseStatusUpdate, StatusRecord,
    StatusUpdate,
};
