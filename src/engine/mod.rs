//! Engine module housing the sensor session core.
//!
//! `core` exposes the `EngineHandle` facade used by the CLI and by embedding
//! applications; `worker` is the background loop that owns the transport.

pub mod core;
mod worker;

pub use self::core::EngineHandle;
pub use crate::telemetry::{TelemetryEvent, TelemetryEventKind};
