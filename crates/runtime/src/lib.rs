//! adb daemon lifecycle and per-device primitives.
//!
//! This crate owns everything between the process and the adb daemon:
//!
//! - [`Bridge`]: idempotent daemon start and initial enumeration
//! - [`DeviceRegistry`]: serial lookup over the live presence snapshot
//! - [`CommandChannel`]: shell execution with contained faults
//! - [`PortForwards`]: `tcp:` to `localabstract:` forwards
//! - [`PushPool`]: bounded background file transfers
//!
//! All device I/O goes through the [`Transport`] trait. [`AdbTransport`] drives
//! the `adb` client; the `testing` feature exposes an in-memory fake.

pub mod bridge;
pub mod command;
pub mod config;
pub mod daemon;
pub mod error;
pub mod forward;
pub mod push;
pub mod registry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use bridge::{Bridge, BridgeHandle};
pub use command::{CommandChannel, CommandFault, LoggingSink, OutputSink, StreamEnd};
pub use config::BridgeConfig;
pub use error::{Error, Result};
pub use forward::{ForwardFault, PortForwards};
pub use push::{DEFAULT_PUSH_CONCURRENCY, PushPool};
pub use registry::{DeviceRegistry, DeviceSnapshot};
pub use transport::{AdbTransport, OutputStream, PresenceListener, Transport};

#[cfg(test)]
mod tests;
