//! Errors raised while bootstrapping a device service.

use std::time::Duration;

use droidbridge_protocol::ServiceKind;
use droidbridge_runtime::CommandFault;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BootstrapError>;

/// Why a bootstrap did not reach the streaming state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
	/// The device is absent or not online.
	#[error("device {serial} is unavailable")]
	DeviceUnavailable { serial: String },

	/// A capability property was missing or unparseable.
	#[error("device {serial} reported unusable {property}: {value:?}")]
	Capability {
		serial: String,
		property: &'static str,
		value: Option<String>,
	},

	/// Pushed artifacts never appeared in the staging directory.
	#[error("{missing:?} did not appear on {serial} within {waited:?}")]
	ConvergenceStall {
		serial: String,
		missing: Vec<String>,
		waited: Duration,
	},

	/// `wm size` output could not be parsed into a resolution.
	#[error("screen size of {serial} is unknown (wm size reported {raw:?})")]
	ScreenSize { serial: String, raw: String },

	/// A session for the same device and service is still streaming.
	#[error("{kind} service is already active on {serial}")]
	AlreadyActive { serial: String, kind: ServiceKind },

	#[error("{kind} bootstrap on {serial} cancelled")]
	Cancelled { serial: String, kind: ServiceKind },

	#[error(transparent)]
	Command(CommandFault),

	#[error("capture quality {0} is outside 0..=100")]
	InvalidQuality(u32),
}

impl BootstrapError {
	pub fn is_device_unavailable(&self) -> bool {
		matches!(self, Self::DeviceUnavailable { .. })
	}
}

impl From<CommandFault> for BootstrapError {
	fn from(fault: CommandFault) -> Self {
		match fault {
			CommandFault::DeviceUnavailable { serial } => Self::DeviceUnavailable { serial },
			other => Self::Command(other),
		}
	}
}
