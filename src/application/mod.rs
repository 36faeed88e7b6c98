pub mod charging;
pub mod events;
pub mod ports;
pub mod registry;
pub mod services;

// Re-export key types for convenience
pub use charging::{
    CommandResult, EvseController, RequestContext, RequestOptions, ResultKind,
    SharedEvseController,
};
pub use events::{create_event_bus, Event, EventBus, EventSubscriber, SharedEventBus};
pub use ports::RemoteEvsePort;
pub use registry::{EntityRegistry, SharedEntityRegistry};
pub use services::{expire_reservations, start_reservation_expiry_task};
