//! Error types for the droidbridge runtime.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the adb daemon.
#[derive(Debug, Error)]
pub enum Error {
	/// No daemon path could be derived from configuration or environment.
	#[error("adb daemon path is not configured: {0}")]
	Configuration(String),

	/// The configured daemon executable does not exist.
	#[error("adb executable not found at {}", .0.display())]
	DaemonNotFound(PathBuf),

	/// Starting or restarting the daemon failed.
	#[error("failed to start adb daemon: {0}")]
	DaemonStart(String),

	/// The device is absent or not in the online state.
	#[error("device {serial} is unavailable")]
	DeviceUnavailable { serial: String },

	/// The transport reported a failure for a device operation.
	#[error("transport error: {0}")]
	Transport(String),

	/// I/O error while spawning or reading the adb client.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl Error {
	pub fn device_unavailable(serial: impl Into<String>) -> Self {
		Error::DeviceUnavailable { serial: serial.into() }
	}

	/// Returns true if the error means the device went away.
	pub fn is_device_unavailable(&self) -> bool {
		matches!(self, Error::DeviceUnavailable { .. })
	}

	/// Returns true if the error is a startup configuration problem.
	pub fn is_configuration(&self) -> bool {
		matches!(self, Error::Configuration(_) | Error::DaemonNotFound(_))
	}
}
