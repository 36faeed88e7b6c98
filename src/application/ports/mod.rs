//! Ports of the application layer

pub mod outbound;

pub use outbound::RemoteEvsePort;
