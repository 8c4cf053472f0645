//! Typed event bus and filesystem watcher (`spec.md` §4.F).

pub mod bus;
pub mod watcher;

pub use bus::{Event, EventBus};
