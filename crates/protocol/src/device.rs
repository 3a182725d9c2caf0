//! Device presence types as reported by `adb track-devices -l`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Connection state of a device as seen by the adb daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
	/// Device is known but not responding.
	Offline,
	/// Device is connected and accepts commands (`device` in adb output).
	Online,
	/// Device is waiting for the host key to be accepted.
	Unauthorized,
	/// Device is in bootloader mode.
	Bootloader,
	/// Device is in recovery mode.
	Recovery,
	/// Device is in sideload mode.
	Sideload,
	/// Authorization handshake in progress.
	Authorizing,
	/// Transport is still being set up.
	Connecting,
	/// Host lacks permission to open the USB device.
	NoPermissions,
}

impl DeviceState {
	/// Parses the state token adb prints after the serial.
	///
	/// Unknown tokens map to [`DeviceState::Offline`] so they are never treated
	/// as usable.
	pub fn from_adb(token: &str) -> Self {
		match token {
			"device" => Self::Online,
			"offline" => Self::Offline,
			"unauthorized" => Self::Unauthorized,
			"bootloader" => Self::Bootloader,
			"recovery" => Self::Recovery,
			"sideload" => Self::Sideload,
			"authorizing" => Self::Authorizing,
			"connecting" => Self::Connecting,
			"no" | "no permissions" => Self::NoPermissions,
			_ => Self::Offline,
		}
	}

	pub fn is_online(self) -> bool {
		self == Self::Online
	}
}

impl fmt::Display for DeviceState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Offline => "offline",
			Self::Online => "online",
			Self::Unauthorized => "unauthorized",
			Self::Bootloader => "bootloader",
			Self::Recovery => "recovery",
			Self::Sideload => "sideload",
			Self::Authorizing => "authorizing",
			Self::Connecting => "connecting",
			Self::NoPermissions => "no_permissions",
		};
		f.write_str(s)
	}
}

/// A device entry from the daemon's device list.
///
/// The handle is a snapshot value: the presence listener replaces the whole
/// list on every change, so a cloned handle never observes later transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHandle {
	/// Stable serial number, unique per physical or virtual unit.
	pub serial: String,
	/// Connection state at the time of the snapshot.
	pub state: DeviceState,
	/// Product name (`product:` attribute).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub product: Option<String>,
	/// Model name (`model:` attribute).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub model: Option<String>,
	/// Transport id assigned by the daemon (`transport_id:` attribute).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transport_id: Option<u32>,
}

impl DeviceHandle {
	pub fn new(serial: impl Into<String>, state: DeviceState) -> Self {
		Self {
			serial: serial.into(),
			state,
			product: None,
			model: None,
			transport_id: None,
		}
	}

	pub fn is_online(&self) -> bool {
		self.state.is_online()
	}

	/// Parses one line of `adb devices -l` / `track-devices -l` output.
	///
	/// ```text
	/// emulator-5554          device product:sdk_gphone64 model:Pixel_7 transport_id:1
	/// 0123456789ABCDEF       unauthorized usb:1-1 transport_id:3
	/// ```
	///
	/// Returns `None` for blank lines and headers.
	pub fn parse_line(line: &str) -> Option<Self> {
		let trimmed = line.trim();
		if trimmed.is_empty() || trimmed.starts_with("List of devices") || trimmed.starts_with('*') {
			return None;
		}

		let mut parts = trimmed.split_whitespace();
		let serial = parts.next()?;
		let mut state_token = parts.next()?.to_string();
		let mut handle = Self::new(serial, DeviceState::Offline);

		for token in parts {
			if state_token == "no" && token == "permissions" {
				state_token.push_str(" permissions");
				continue;
			}
			if let Some(product) = token.strip_prefix("product:") {
				handle.product = Some(product.to_string());
			} else if let Some(model) = token.strip_prefix("model:") {
				handle.model = Some(model.to_string());
			} else if let Some(id) = token.strip_prefix("transport_id:") {
				handle.transport_id = id.parse().ok();
			}
		}

		handle.state = DeviceState::from_adb(&state_token);
		Some(handle)
	}
}

/// Parses a full device list payload, one device per line.
pub fn parse_device_list(payload: &str) -> Vec<DeviceHandle> {
	payload.lines().filter_map(DeviceHandle::parse_line).collect()
}
