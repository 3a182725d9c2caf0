//! Shell command execution against a single device.
//!
//! Remote shell execution is unreliable: the process can die and the device
//! can vanish mid-call. This layer contains those faults. [`CommandChannel::try_run`]
//! returns them as [`CommandFault`] values; [`CommandChannel::run`] logs them and
//! yields an empty string. Neither enforces a deadline.

use std::sync::Arc;

use droidbridge_protocol::DeviceHandle;
use futures_util::StreamExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::registry::DeviceRegistry;
use crate::transport::Transport;

/// A contained failure at the command boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandFault {
	/// The device was not online when the command was issued.
	#[error("device {serial} is unavailable")]
	DeviceUnavailable { serial: String },

	/// The local client process could not be started.
	#[error("could not start `{command}` for {serial}: {detail}")]
	Spawn {
		serial: String,
		command: String,
		detail: String,
	},

	/// The command ran but failed, or its output could not be read.
	#[error("`{command}` failed on {serial}: {detail}")]
	Exec {
		serial: String,
		command: String,
		detail: String,
	},
}

impl CommandFault {
	fn from_error(serial: &str, command: &str, err: Error) -> Self {
		match err {
			Error::DeviceUnavailable { serial } => CommandFault::DeviceUnavailable { serial },
			Error::Io(e) => CommandFault::Spawn {
				serial: serial.to_string(),
				command: command.to_string(),
				detail: e.to_string(),
			},
			other => CommandFault::Exec {
				serial: serial.to_string(),
				command: command.to_string(),
				detail: other.to_string(),
			},
		}
	}

	pub fn is_device_unavailable(&self) -> bool {
		matches!(self, CommandFault::DeviceUnavailable { .. })
	}
}

/// How a streaming command stopped delivering output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
	/// The remote process exited or the device disconnected.
	Closed,
	/// The caller cancelled; the remote process was left running.
	Cancelled,
	/// The stream could not be opened or failed mid-read.
	Failed(CommandFault),
}

/// Receives raw output fragments from a streaming command.
pub trait OutputSink: Send {
	fn on_output(&mut self, chunk: &[u8]);
}

impl<F> OutputSink for F
where
	F: FnMut(&[u8]) + Send,
{
	fn on_output(&mut self, chunk: &[u8]) {
		self(chunk)
	}
}

/// Sink that logs every fragment at info level.
#[derive(Debug, Clone)]
pub struct LoggingSink {
	serial: String,
	label: String,
}

impl LoggingSink {
	pub fn new(serial: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			serial: serial.into(),
			label: label.into(),
		}
	}
}

impl OutputSink for LoggingSink {
	fn on_output(&mut self, chunk: &[u8]) {
		let text = String::from_utf8_lossy(chunk);
		let text = text.trim_end();
		if !text.is_empty() {
			info!(target: "droidbridge.service", serial = %self.serial, service = %self.label, "{text}");
		}
	}
}

/// Executes shell commands on online devices.
#[derive(Clone)]
pub struct CommandChannel {
	transport: Arc<dyn Transport>,
	registry: DeviceRegistry,
}

impl CommandChannel {
	pub fn new(transport: Arc<dyn Transport>, registry: DeviceRegistry) -> Self {
		Self { transport, registry }
	}

	fn ensure_online(&self, device: &DeviceHandle) -> Result<(), CommandFault> {
		if device.is_online() && self.registry.is_online(&device.serial) {
			Ok(())
		} else {
			Err(CommandFault::DeviceUnavailable {
				serial: device.serial.clone(),
			})
		}
	}

	/// Runs `command` and returns its output, or the fault that prevented it.
	pub async fn try_run(&self, device: &DeviceHandle, command: &str) -> Result<String, CommandFault> {
		self.ensure_online(device)?;
		debug!(target: "droidbridge.shell", serial = %device.serial, command, "shell");
		self.transport
			.shell(&device.serial, command)
			.await
			.map_err(|e| CommandFault::from_error(&device.serial, command, e))
	}

	/// Runs `command` and returns its output; faults are logged and yield `""`.
	pub async fn run(&self, device: &DeviceHandle, command: &str) -> String {
		match self.try_run(device, command).await {
			Ok(output) => output,
			Err(fault) => {
				warn!(target: "droidbridge.shell", serial = %device.serial, command, error = %fault, "shell command failed");
				String::new()
			}
		}
	}

	/// Reads a device property; faults are logged and yield `None`.
	pub async fn property(&self, device: &DeviceHandle, key: &str) -> Option<String> {
		if let Err(fault) = self.ensure_online(device) {
			warn!(target: "droidbridge.shell", serial = %device.serial, key, error = %fault, "property read skipped");
			return None;
		}
		match self.transport.property(&device.serial, key).await {
			Ok(value) => value,
			Err(e) => {
				warn!(target: "droidbridge.shell", serial = %device.serial, key, error = %e, "property read failed");
				None
			}
		}
	}

	/// Streams output of `command` into `sink` until the remote side closes or
	/// `cancel` fires.
	///
	/// Cancellation only detaches the sink; no kill is sent to the device.
	pub async fn run_streaming<S>(&self, device: &DeviceHandle, command: &str, mut sink: S, cancel: &CancellationToken) -> StreamEnd
	where
		S: OutputSink,
	{
		if let Err(fault) = self.ensure_online(device) {
			warn!(target: "droidbridge.shell", serial = %device.serial, command, error = %fault, "streaming shell refused");
			return StreamEnd::Failed(fault);
		}

		let opened = tokio::select! {
			biased;
			_ = cancel.cancelled() => return StreamEnd::Cancelled,
			opened = self.transport.shell_stream(&device.serial, command) => opened,
		};
		let mut stream = match opened {
			Ok(stream) => stream,
			Err(e) => {
				let fault = CommandFault::from_error(&device.serial, command, e);
				warn!(target: "droidbridge.shell", serial = %device.serial, command, error = %fault, "streaming shell failed to start");
				return StreamEnd::Failed(fault);
			}
		};
		debug!(target: "droidbridge.shell", serial = %device.serial, command, "streaming shell started");

		loop {
			tokio::select! {
				biased;
				_ = cancel.cancelled() => {
					debug!(target: "droidbridge.shell", serial = %device.serial, command, "streaming shell detached");
					return StreamEnd::Cancelled;
				}
				next = stream.next() => match next {
					Some(Ok(chunk)) => sink.on_output(&chunk),
					Some(Err(e)) => {
						let fault = CommandFault::from_error(&device.serial, command, Error::Transport(e.to_string()));
						warn!(target: "droidbridge.shell", serial = %device.serial, command, error = %fault, "streaming shell read failed");
						return StreamEnd::Failed(fault);
					}
					None => {
						debug!(target: "droidbridge.shell", serial = %device.serial, command, "streaming shell closed");
						return StreamEnd::Closed;
					}
				}
			}
		}
	}
}
