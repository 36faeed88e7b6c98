//! Background services

pub mod reservation_expiry;

pub use reservation_expiry::{
    expire_reservations, start_reservation_expiry_task, DEFAULT_CHECK_INTERVAL,
};
