use droidbridge::{BridgeHandle, DeviceActions};

use super::require;
use crate::cli::{KeyArgs, SerialArg, VersionArgs};
use crate::error::Result;
use crate::output::CommandOutput;

pub async fn version(handle: &BridgeHandle, args: &VersionArgs) -> Result<CommandOutput<Option<String>>> {
	let version = DeviceActions::new(handle).app_version(&args.serial, &args.package).await?;
	let text = match &version {
		Some(v) => format!("{v}\n"),
		None => format!("{} is not installed\n", args.package),
	};
	Ok(CommandOutput::new("version", version).with_text(text))
}

pub async fn reboot(handle: &BridgeHandle, args: &SerialArg) -> Result<CommandOutput<()>> {
	let device = require(handle, &args.serial)?;
	DeviceActions::new(handle).reboot(&device).await?;
	Ok(CommandOutput::new("reboot", ()))
}

pub async fn key(handle: &BridgeHandle, args: &KeyArgs) -> Result<CommandOutput<()>> {
	let device = require(handle, &args.serial)?;
	DeviceActions::new(handle).press_key(&device, args.code).await?;
	Ok(CommandOutput::new("key", ()))
}
