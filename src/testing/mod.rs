//! Testability harness utilities.
//!
//! The real BLE transport needs a powered adapter and a sensor in range,
//! which makes local testing painful. This namespace provides a
//! deterministic, inspectable [`ScriptedTransport`] that unit tests and the
//! `tests/` integration suite drive the engine with.
//!
//! Only compiled for unit tests or when the `test_fixtures` Cargo feature
//! is enabled, so release builds of the library do not ship it.

pub mod scripted;

pub use scripted::{ScriptedLink, ScriptedTransport};
