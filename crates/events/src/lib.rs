//! Session-level events fanned out to feature modules.

pub mod bus;
pub mod in_memory_bus;
pub mod session;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use session::SessionEvent;
