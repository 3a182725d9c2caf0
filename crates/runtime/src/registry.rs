//! Device snapshot and serial lookup.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use droidbridge_protocol::DeviceHandle;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::transport::PresenceListener;

/// Process-wide view of attached devices.
///
/// Written only through [`PresenceListener::device_list_changed`]; all other
/// components read it.
#[derive(Debug, Default)]
pub struct DeviceSnapshot {
	devices: RwLock<Vec<DeviceHandle>>,
	generation: AtomicU64,
}

impl DeviceSnapshot {
	pub fn new() -> Self {
		Self::default()
	}

	/// Copy of the current device list.
	pub fn devices(&self) -> Vec<DeviceHandle> {
		self.devices.read().clone()
	}

	/// Number of presence updates received so far.
	pub fn generation(&self) -> u64 {
		self.generation.load(Ordering::SeqCst)
	}
}

impl PresenceListener for DeviceSnapshot {
	fn device_list_changed(&self, devices: Vec<DeviceHandle>) {
		let mut current = self.devices.write();
		for device in &devices {
			match current.iter().find(|d| d.serial == device.serial) {
				None => info!(target: "droidbridge.presence", serial = %device.serial, state = %device.state, "device attached"),
				Some(prev) if prev.state != device.state => info!(
					target: "droidbridge.presence",
					serial = %device.serial,
					from = %prev.state,
					to = %device.state,
					"device state changed"
				),
				Some(_) => {}
			}
		}
		for gone in current.iter().filter(|d| !devices.iter().any(|n| n.serial == d.serial)) {
			info!(target: "droidbridge.presence", serial = %gone.serial, "device detached");
		}
		*current = devices;
		self.generation.fetch_add(1, Ordering::SeqCst);
	}
}

/// Resolves serials to online devices.
///
/// Every lookup re-scans the live snapshot; nothing is cached.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
	snapshot: Arc<DeviceSnapshot>,
}

impl DeviceRegistry {
	pub fn new(snapshot: Arc<DeviceSnapshot>) -> Self {
		Self { snapshot }
	}

	/// Returns the first entry with `serial` that is online.
	///
	/// A matching entry in any other state counts as absent.
	pub fn lookup(&self, serial: &str) -> Option<DeviceHandle> {
		let found = self
			.snapshot
			.devices
			.read()
			.iter()
			.find(|d| d.serial == serial && d.is_online())
			.cloned();
		if found.is_none() {
			debug!(target: "droidbridge.registry", serial, "device not connected");
		}
		found
	}

	/// Like [`lookup`](Self::lookup) but fails fast with [`Error::DeviceUnavailable`].
	pub fn require(&self, serial: &str) -> Result<DeviceHandle> {
		self.lookup(serial).ok_or_else(|| Error::device_unavailable(serial))
	}

	/// Whether `serial` is currently online.
	pub fn is_online(&self, serial: &str) -> bool {
		self.snapshot.devices.read().iter().any(|d| d.serial == serial && d.is_online())
	}

	/// All online devices.
	pub fn online(&self) -> Vec<DeviceHandle> {
		self.snapshot.devices.read().iter().filter(|d| d.is_online()).cloned().collect()
	}

	/// Every device in the snapshot regardless of state.
	pub fn all(&self) -> Vec<DeviceHandle> {
		self.snapshot.devices()
	}
}
