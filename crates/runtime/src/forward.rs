//! Port forwarding between localhost and device abstract sockets.

use std::sync::Arc;

use droidbridge_protocol::{DeviceHandle, ForwardBinding};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::Error;
use crate::registry::DeviceRegistry;
use crate::transport::Transport;

/// A contained forward failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardFault {
	#[error("device {serial} is unavailable")]
	DeviceUnavailable { serial: String },

	/// adb refused the binding (port in use, unknown forward, ...).
	#[error("forward {binding} rejected: {detail}")]
	Rejected { binding: String, detail: String },
}

/// Creates and removes forwards. Keeps no record of what it created.
#[derive(Clone)]
pub struct PortForwards {
	transport: Arc<dyn Transport>,
	registry: DeviceRegistry,
}

impl PortForwards {
	pub fn new(transport: Arc<dyn Transport>, registry: DeviceRegistry) -> Self {
		Self { transport, registry }
	}

	fn check(&self, device: &DeviceHandle) -> Result<(), ForwardFault> {
		if device.is_online() && self.registry.is_online(&device.serial) {
			Ok(())
		} else {
			Err(ForwardFault::DeviceUnavailable {
				serial: device.serial.clone(),
			})
		}
	}

	fn fault(binding: &ForwardBinding, err: Error) -> ForwardFault {
		match err {
			Error::DeviceUnavailable { serial } => ForwardFault::DeviceUnavailable { serial },
			other => ForwardFault::Rejected {
				binding: binding.to_string(),
				detail: other.to_string(),
			},
		}
	}

	/// Forwards `tcp:<local_port>` to `localabstract:<service>` on the device.
	pub async fn create(&self, device: &DeviceHandle, local_port: u16, service: &str) -> Result<ForwardBinding, ForwardFault> {
		let binding = ForwardBinding::new(&device.serial, local_port, service);
		info!(target: "droidbridge.forward", serial = %device.serial, service, port = local_port, "creating forward");
		let result = match self.check(device) {
			Ok(()) => self.transport.create_forward(&binding).await.map_err(|e| Self::fault(&binding, e)),
			Err(fault) => Err(fault),
		};
		match result {
			Ok(()) => Ok(binding),
			Err(fault) => {
				warn!(target: "droidbridge.forward", serial = %device.serial, error = %fault, "forward failed");
				Err(fault)
			}
		}
	}

	/// Removes a forward previously created with the same arguments.
	pub async fn remove(&self, device: &DeviceHandle, local_port: u16, service: &str) -> Result<(), ForwardFault> {
		let binding = ForwardBinding::new(&device.serial, local_port, service);
		info!(target: "droidbridge.forward", serial = %device.serial, service, port = local_port, "removing forward");
		let result = match self.check(device) {
			Ok(()) => self.transport.remove_forward(&binding).await.map_err(|e| Self::fault(&binding, e)),
			Err(fault) => Err(fault),
		};
		if let Err(fault) = &result {
			warn!(target: "droidbridge.forward", serial = %device.serial, error = %fault, "forward removal failed");
		}
		result
	}
}
