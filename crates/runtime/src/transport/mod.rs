//! Transport seam between droidbridge and the adb daemon.
//!
//! [`Transport`] is the capability the rest of the crate is written against:
//! daemon start, presence notifications, and per-device command primitives.
//! [`AdbTransport`] implements it by driving the `adb` client executable; the
//! `testing` feature adds an in-memory fake with scripted devices.
//!
//! Presence is push-based: the transport calls every registered
//! [`PresenceListener`] with the full device list whenever it changes. The
//! listener is the only writer of device state in the process.

mod adb;
mod framing;


use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use droidbridge_protocol::{DeviceHandle, ForwardBinding};
use futures_util::Stream;

pub use adb::AdbTransport;
pub use framing::TrackDevicesReader;

use crate::error::Result;

/// Lazy, unbounded, non-restartable sequence of raw output fragments.
pub type OutputStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Receives the full device list on every presence change.
pub trait PresenceListener: Send + Sync {
	fn device_list_changed(&self, devices: Vec<DeviceHandle>);
}

/// Primitives offered by the debug transport.
///
/// Every per-device call addresses the device by serial. Implementations do
/// not enforce deadlines; callers that need bounded waits poll.
#[async_trait]
pub trait Transport: Send + Sync {
	/// Registers a presence listener. Call before [`start_daemon`](Self::start_daemon)
	/// so the first enumeration is not missed.
	fn add_presence_listener(&self, listener: Arc<dyn PresenceListener>);

	/// Starts the daemon, restarting it if one is already running, and begins
	/// presence tracking.
	async fn start_daemon(&self) -> Result<()>;

	/// Whether the first device enumeration after start has been delivered.
	fn has_initial_device_list(&self) -> bool;

	/// Runs a shell command and collects its standard output.
	async fn shell(&self, serial: &str, command: &str) -> Result<String>;

	/// Runs a shell command and streams its standard output.
	async fn shell_stream(&self, serial: &str, command: &str) -> Result<OutputStream>;

	/// Reads a system property; `None` when unset.
	async fn property(&self, serial: &str, key: &str) -> Result<Option<String>>;

	async fn create_forward(&self, binding: &ForwardBinding) -> Result<()>;

	async fn remove_forward(&self, binding: &ForwardBinding) -> Result<()>;

	/// Copies a host file to the device, returning once the transfer ends.
	async fn push(&self, serial: &str, local: &Path, remote: &str) -> Result<()>;
}
