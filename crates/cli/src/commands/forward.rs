use droidbridge::{BridgeHandle, ForwardBinding};

use super::require;
use crate::cli::ForwardArgs;
use crate::error::Result;
use crate::output::CommandOutput;

pub async fn forward(handle: &BridgeHandle, args: &ForwardArgs) -> Result<CommandOutput<ForwardBinding>> {
	let device = require(handle, &args.serial)?;
	let forwards = handle.forwards();
	if args.remove {
		forwards.remove(&device, args.port, &args.service).await?;
		let binding = ForwardBinding::new(&args.serial, args.port, &args.service);
		let text = format!("removed {binding}\n");
		Ok(CommandOutput::new("forward", binding).with_text(text))
	} else {
		let binding = forwards.create(&device, args.port, &args.service).await?;
		let text = format!("{binding}\n");
		Ok(CommandOutput::new("forward", binding).with_text(text))
	}
}
