use droidbridge::{BootstrapError, CommandFault, ForwardFault};
use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Runtime(#[from] droidbridge_runtime::Error),

	#[error(transparent)]
	Bootstrap(#[from] BootstrapError),

	#[error(transparent)]
	Command(#[from] CommandFault),

	#[error(transparent)]
	Forward(#[from] ForwardFault),
}

impl CliError {
	/// Convert this error to a CommandError for structured output
	pub fn to_command_error(&self) -> CommandError {
		let (code, details) = match self {
			CliError::Runtime(err) => (runtime_code(err), None),
			CliError::Bootstrap(err) => bootstrap_code(err),
			CliError::Command(CommandFault::DeviceUnavailable { serial }) => {
				(ErrorCode::DeviceUnavailable, Some(serde_json::json!({ "serial": serial })))
			}
			CliError::Command(CommandFault::Spawn { command, .. } | CommandFault::Exec { command, .. }) => {
				(ErrorCode::CommandFailed, Some(serde_json::json!({ "command": command })))
			}
			CliError::Forward(ForwardFault::DeviceUnavailable { serial }) => {
				(ErrorCode::DeviceUnavailable, Some(serde_json::json!({ "serial": serial })))
			}
			CliError::Forward(ForwardFault::Rejected { binding, .. }) => {
				(ErrorCode::ForwardFailed, Some(serde_json::json!({ "binding": binding })))
			}
		};

		CommandError {
			code,
			message: self.to_string(),
			details,
		}
	}
}

fn runtime_code(err: &droidbridge_runtime::Error) -> ErrorCode {
	use droidbridge_runtime::Error;
	match err {
		Error::Configuration(_) | Error::DaemonNotFound(_) => ErrorCode::Configuration,
		Error::DaemonStart(_) => ErrorCode::DaemonFailed,
		Error::DeviceUnavailable { .. } => ErrorCode::DeviceUnavailable,
		Error::Transport(_) => ErrorCode::CommandFailed,
		Error::Io(_) => ErrorCode::IoError,
	}
}

fn bootstrap_code(err: &BootstrapError) -> (ErrorCode, Option<serde_json::Value>) {
	match err {
		BootstrapError::DeviceUnavailable { serial } => {
			(ErrorCode::DeviceUnavailable, Some(serde_json::json!({ "serial": serial })))
		}
		BootstrapError::Capability { property, value, .. } => (
			ErrorCode::UnsupportedDevice,
			Some(serde_json::json!({ "property": property, "value": value })),
		),
		BootstrapError::ScreenSize { raw, .. } => (ErrorCode::UnsupportedDevice, Some(serde_json::json!({ "wmSize": raw }))),
		BootstrapError::ConvergenceStall { missing, waited, .. } => (
			ErrorCode::DeployTimeout,
			Some(serde_json::json!({ "missing": missing, "waitedMs": waited.as_millis() as u64 })),
		),
		BootstrapError::AlreadyActive { kind, .. } => (ErrorCode::AlreadyActive, Some(serde_json::json!({ "service": kind }))),
		BootstrapError::Cancelled { .. } => (ErrorCode::Cancelled, None),
		BootstrapError::Command(_) => (ErrorCode::CommandFailed, None),
		BootstrapError::InvalidQuality(_) => (ErrorCode::InvalidInput, None),
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[test]
	fn configuration_errors_map_to_configuration() {
		let err = CliError::from(droidbridge_runtime::Error::Configuration("ANDROID_HOME is not set".into()));
		let cmd = err.to_command_error();
		assert_eq!(cmd.code, ErrorCode::Configuration);
		assert!(cmd.message.contains("ANDROID_HOME"));
	}

	#[test]
	fn stall_carries_missing_files() {
		let err = CliError::from(BootstrapError::ConvergenceStall {
			serial: "ABC123".into(),
			missing: vec!["minicap.so".into()],
			waited: Duration::from_secs(60),
		});
		let cmd = err.to_command_error();
		assert_eq!(cmd.code, ErrorCode::DeployTimeout);
		let details = cmd.details.unwrap();
		assert_eq!(details["missing"][0], "minicap.so");
		assert_eq!(details["waitedMs"], 60_000);
	}

	#[test]
	fn runtime_failures_keep_distinct_codes() {
		let io = CliError::from(droidbridge_runtime::Error::Io(std::io::Error::other("broken pipe")));
		assert_eq!(io.to_command_error().code, ErrorCode::IoError);

		let start = CliError::from(droidbridge_runtime::Error::DaemonStart("exit status 1".into()));
		assert_eq!(start.to_command_error().code, ErrorCode::DaemonFailed);

		let quality = CliError::from(BootstrapError::InvalidQuality(250));
		assert_eq!(quality.to_command_error().code, ErrorCode::InvalidInput);
	}

	#[test]
	fn forward_rejection() {
		let err = CliError::from(ForwardFault::Rejected {
			binding: "tcp:1717 -> localabstract:minicap".into(),
			detail: "port in use".into(),
		});
		assert_eq!(err.to_command_error().code, ErrorCode::ForwardFailed);
	}

	#[test]
	fn unavailable_device_from_any_layer() {
		let serial = || "ABC123".to_string();
		let errors = [
			CliError::from(droidbridge_runtime::Error::DeviceUnavailable { serial: serial() }),
			CliError::from(BootstrapError::DeviceUnavailable { serial: serial() }),
			CliError::from(CommandFault::DeviceUnavailable { serial: serial() }),
			CliError::from(ForwardFault::DeviceUnavailable { serial: serial() }),
		];
		for err in errors {
			assert_eq!(err.to_command_error().code, ErrorCode::DeviceUnavailable);
		}
	}
}
