//! Broadcasting modules for real-time event streaming.
//!
//! Boundary layers that want push updates (server-sent events, websockets)
//! subscribe here instead of polling the status query.

pub mod batch_events;

pub use batch_events::{BatchEvent, BatchEventBroadcaster};
