//! Status schedules
//!
//! Every status and admin status in the entity graph is kept as a
//! bounded [`StatusSchedule`]; a [`StatusTracker`] pairs the two and
//! derives the effective status.

pub mod schedule;
pub mod tracker;

pub use schedule::{
    ChangeMethod, ListenerError, ScheduleChange, ScheduleListener, StatusSchedule,
    DEFAULT_MAX_STATUS_HISTORY,
};
pub use tracker::{AdminStatusKind, HistoryLimits, StatusKind, StatusTracker};
