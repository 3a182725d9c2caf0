//! One-shot device actions.

use droidbridge_protocol::DeviceHandle;
use droidbridge_runtime::{BridgeHandle, CommandChannel, CommandFault, DeviceRegistry};
use tracing::info;

use crate::parse::{parse_app_version, parse_screen_size};

/// Convenience operations built on the command channel.
#[derive(Clone)]
pub struct DeviceActions {
	registry: DeviceRegistry,
	commands: CommandChannel,
}

impl DeviceActions {
	pub fn new(bridge: &BridgeHandle) -> Self {
		Self {
			registry: bridge.registry(),
			commands: bridge.commands(),
		}
	}

	pub async fn reboot(&self, device: &DeviceHandle) -> Result<(), CommandFault> {
		info!(target: "droidbridge.device", serial = %device.serial, "rebooting");
		self.commands.try_run(device, "reboot").await.map(drop)
	}

	/// Injects an Android key event (`KEYCODE_*` numeric value).
	pub async fn press_key(&self, device: &DeviceHandle, keycode: u32) -> Result<(), CommandFault> {
		self.commands.try_run(device, &format!("input keyevent {keycode}")).await.map(drop)
	}

	pub async fn property(&self, device: &DeviceHandle, key: &str) -> Option<String> {
		self.commands.property(device, key).await
	}

	/// Screen resolution as `WxH`, or [`UNKNOWN_SIZE`](crate::UNKNOWN_SIZE).
	pub async fn screen_size(&self, device: &DeviceHandle) -> String {
		parse_screen_size(&self.commands.run(device, "wm size").await)
	}

	/// Installed `versionName` of `package`; `None` when not installed.
	pub async fn app_version(&self, serial: &str, package: &str) -> Result<Option<String>, CommandFault> {
		let device = self.registry.lookup(serial).ok_or_else(|| CommandFault::DeviceUnavailable {
			serial: serial.to_string(),
		})?;
		let output = self
			.commands
			.try_run(&device, &format!("pm dump {package} | grep 'versionName'"))
			.await?;
		Ok(parse_app_version(&output))
	}
}
