//! Result envelope printed by every command.
//!
//! With `--format json` each command writes one envelope to stdout:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "ok": true,
//!   "command": "devices",
//!   "data": [ ... ],
//!   "timings": { "durationMs": 812 }
//! }
//! ```
//!
//! On failure `data` is replaced by `error: { code, message, details }`.
//! Text format prints only the payload.


use std::io::{self, Write};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Bumped on breaking changes to the envelope.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON envelope
	Json,
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	pub schema_version: u32,
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timings: Option<Timings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Stable error codes for scripted callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// No adb executable could be located or configured
	Configuration,
	/// The adb daemon could not be started
	DaemonFailed,
	/// Device absent or not online
	DeviceUnavailable,
	/// Device properties unusable for artifact selection
	UnsupportedDevice,
	/// Pushed artifacts never appeared on the device
	DeployTimeout,
	/// A session for this device and service is already running
	AlreadyActive,
	/// Remote command failed
	CommandFailed,
	/// Forward rejected by adb
	ForwardFailed,
	Cancelled,
	InvalidInput,
	IoError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let code = match self {
			ErrorCode::Configuration => "CONFIGURATION",
			ErrorCode::DaemonFailed => "DAEMON_FAILED",
			ErrorCode::DeviceUnavailable => "DEVICE_UNAVAILABLE",
			ErrorCode::UnsupportedDevice => "UNSUPPORTED_DEVICE",
			ErrorCode::DeployTimeout => "DEPLOY_TIMEOUT",
			ErrorCode::AlreadyActive => "ALREADY_ACTIVE",
			ErrorCode::CommandFailed => "COMMAND_FAILED",
			ErrorCode::ForwardFailed => "FORWARD_FAILED",
			ErrorCode::Cancelled => "CANCELLED",
			ErrorCode::InvalidInput => "INVALID_INPUT",
			ErrorCode::IoError => "IO_ERROR",
		};
		f.write_str(code)
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
	pub duration_ms: u64,
}

impl From<Duration> for Timings {
	fn from(duration: Duration) -> Self {
		Timings {
			duration_ms: duration.as_millis() as u64,
		}
	}
}

/// Builder for command results
pub struct ResultBuilder<T: Serialize> {
	command: String,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			data: None,
			error: None,
			start_time: Instant::now(),
		}
	}

	/// Starts timing from `start` instead of now.
	pub fn started_at(mut self, start: Instant) -> Self {
		self.start_time = start;
		self
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, error: CommandError) -> Self {
		self.error = Some(error);
		self
	}

	pub fn build(self) -> CommandResult<T> {
		CommandResult {
			schema_version: SCHEMA_VERSION,
			ok: self.error.is_none(),
			command: self.command,
			data: self.data,
			error: self.error,
			timings: Some(self.start_time.elapsed().into()),
		}
	}
}

pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => print_result_text(result),
	}
}

fn print_result_text<T: Serialize>(result: &CommandResult<T>) {
	let mut stdout = io::stdout().lock();
	if let Some(ref data) = result.data {
		if let Some(text) = render_text(data) {
			let _ = write!(stdout, "{text}");
		}
	} else if let Some(ref error) = result.error {
		let _ = writeln!(stdout, "Error [{}]: {}", error.code, error.message);
	}
}

/// Text rendering of a payload: strings verbatim, unit as nothing, the rest
/// as pretty JSON.
pub fn render_text<T: Serialize>(data: &T) -> Option<String> {
	match serde_json::to_value(data).ok()? {
		serde_json::Value::Null => None,
		serde_json::Value::String(s) if s.ends_with('\n') || s.is_empty() => Some(s),
		serde_json::Value::String(s) => Some(format!("{s}\n")),
		other => serde_json::to_string_pretty(&other).ok().map(|json| format!("{json}\n")),
	}
}

pub fn print_error_stderr(error: &CommandError) {
	eprintln!("Error [{}]: {}", error.code, error.message);
}

/// What a command produced, before formatting.
#[derive(Debug)]
pub struct CommandOutput<T: Serialize> {
	pub command: &'static str,
	pub data: T,
	/// Replaces the generic text rendering of `data`.
	pub text: Option<String>,
}

impl<T: Serialize> CommandOutput<T> {
	pub fn new(command: &'static str, data: T) -> Self {
		Self { command, data, text: None }
	}

	pub fn with_text(mut self, text: impl Into<String>) -> Self {
		self.text = Some(text.into());
		self
	}
}

/// Prints `output` in `format`, timing from `started`.
pub fn emit<T: Serialize>(output: CommandOutput<T>, started: Instant, format: OutputFormat) {
	match (format, output.text) {
		(OutputFormat::Text, Some(text)) => {
			let mut stdout = io::stdout().lock();
			let _ = write!(stdout, "{text}");
		}
		_ => {
			let result = ResultBuilder::new(output.command).started_at(started).data(output.data).build();
			print_result(&result, format);
		}
	}
}
