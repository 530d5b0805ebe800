//! In-process event bus for generation job observers.

pub mod bus;

pub use bus::{EventBus, JobSubscription, PlatformEvent};
