pub mod cancellation;
pub mod errors;
pub mod logging;
