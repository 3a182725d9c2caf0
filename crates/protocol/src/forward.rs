//! Port forward bindings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Device-side socket namespace of a forward target.
///
/// Only the abstract namespace is used: the capture and input services listen
/// on abstract unix sockets, which are reachable neither through the
/// filesystem nor over IPv4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketNamespace {
	#[default]
	Abstract,
}

impl SocketNamespace {
	/// Prefix adb expects in a forward spec.
	pub fn adb_prefix(self) -> &'static str {
		match self {
			Self::Abstract => "localabstract",
		}
	}
}

/// A local TCP port bound to a device-side service socket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForwardBinding {
	pub serial: String,
	pub local_port: u16,
	pub service: String,
	pub namespace: SocketNamespace,
}

impl ForwardBinding {
	pub fn new(serial: impl Into<String>, local_port: u16, service: impl Into<String>) -> Self {
		Self {
			serial: serial.into(),
			local_port,
			service: service.into(),
			namespace: SocketNamespace::Abstract,
		}
	}

	/// Host side of the forward (`tcp:<port>`).
	pub fn local_spec(&self) -> String {
		format!("tcp:{}", self.local_port)
	}

	/// Device side of the forward (`localabstract:<name>`).
	pub fn remote_spec(&self) -> String {
		format!("{}:{}", self.namespace.adb_prefix(), self.service)
	}
}

impl fmt::Display for ForwardBinding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {} -> {}", self.serial, self.local_spec(), self.remote_spec())
	}
}
