//! Command Center: fleet registry, heartbeat, awareness aggregation,
//! directives, and the action dispatcher (`spec.md` §4.H–§4.K).

pub mod actions;
pub mod aggregator;
pub mod directives;
pub mod heartbeat;
pub mod registry;

pub use aggregator::{Aggregator, AwarenessSnapshot, NodeStatus};
pub use registry::Registry;
