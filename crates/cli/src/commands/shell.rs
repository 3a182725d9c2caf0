use droidbridge::BridgeHandle;

use super::require;
use crate::cli::ShellArgs;
use crate::error::Result;
use crate::output::CommandOutput;

pub async fn shell(handle: &BridgeHandle, args: &ShellArgs) -> Result<CommandOutput<String>> {
	let device = require(handle, &args.serial)?;
	let output = handle.commands().try_run(&device, &args.command.join(" ")).await?;
	Ok(CommandOutput::new("shell", output))
}
