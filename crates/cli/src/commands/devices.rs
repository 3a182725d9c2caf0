use std::fmt::Write;

use droidbridge::{BridgeHandle, DeviceHandle};

use crate::output::CommandOutput;

pub fn devices(handle: &BridgeHandle) -> CommandOutput<Vec<DeviceHandle>> {
	let devices = handle.devices();
	let mut text = String::new();
	for device in &devices {
		let _ = write!(text, "{}\t{}", device.serial, device.state);
		if let Some(model) = &device.model {
			let _ = write!(text, "\tmodel:{model}");
		}
		text.push('\n');
	}
	CommandOutput::new("devices", devices).with_text(text)
}
