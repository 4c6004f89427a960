//! Lifecycle events emitted by the planner and the executor.
//!
//! Event names:
//!
//! - `flow.composed`, `flow.compose_failed`
//! - `execution.started`, `execution.completed`
//! - `substage.started`, `substage.completed`, `substage.failed`,
//!   `substage.skipped`, `substage.cancelled`, `substage.blocked`

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
