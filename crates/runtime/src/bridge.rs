//! Bridge lifecycle: the single connection to the adb daemon.
//!
//! A [`Bridge`] is the process-scoped context that owns the transport and the
//! device snapshot. It is passed to consumers explicitly rather than living in
//! a global, so tests can run independent bridges over fake transports.
//!
//! # Connect sequence
//!
//! 1. Register the snapshot as presence listener (before the daemon starts, so
//!    no transition is missed)
//! 2. Start the daemon, restarting any running instance
//! 3. Poll for the initial enumeration at a fixed interval, bounded by an
//!    attempt budget; on exhaustion continue with whatever list exists

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use droidbridge_protocol::DeviceHandle;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::command::CommandChannel;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::forward::PortForwards;
use crate::registry::{DeviceRegistry, DeviceSnapshot};
use crate::transport::{AdbTransport, PresenceListener, Transport};

/// Owner of the daemon connection and device snapshot.
pub struct Bridge {
	transport: Arc<dyn Transport>,
	snapshot: Arc<DeviceSnapshot>,
	config: BridgeConfig,
	listener_registered: AtomicBool,
	handle: OnceCell<BridgeHandle>,
}

impl Bridge {
	pub fn new(transport: Arc<dyn Transport>, config: BridgeConfig) -> Self {
		Self {
			transport,
			snapshot: Arc::new(DeviceSnapshot::new()),
			config,
			listener_registered: AtomicBool::new(false),
			handle: OnceCell::new(),
		}
	}

	/// Builds a bridge over the adb client resolved from `config`.
	///
	/// # Errors
	///
	/// Returns [`Error::Configuration`](crate::Error::Configuration) when no
	/// daemon path can be derived, or [`Error::DaemonNotFound`](crate::Error::DaemonNotFound)
	/// when it does not exist.
	pub fn adb(config: BridgeConfig) -> Result<Self> {
		let adb = config.resolve_daemon_path()?;
		Ok(Self::new(Arc::new(AdbTransport::new(adb)), config))
	}

	/// Connects to the daemon, or returns the existing handle if connected.
	pub async fn connect(&self) -> Result<BridgeHandle> {
		self.handle.get_or_try_init(|| self.establish()).await.cloned()
	}

	pub fn is_connected(&self) -> bool {
		self.handle.initialized()
	}

	/// Handle of the live connection, if any.
	pub fn handle(&self) -> Option<&BridgeHandle> {
		self.handle.get()
	}

	/// Current device list; empty when not connected.
	pub fn devices(&self) -> Vec<DeviceHandle> {
		self.handle.get().map(BridgeHandle::devices).unwrap_or_default()
	}

	async fn establish(&self) -> Result<BridgeHandle> {
		if !self.listener_registered.swap(true, Ordering::SeqCst) {
			let listener: Arc<dyn PresenceListener> = self.snapshot.clone();
			self.transport.add_presence_listener(listener);
			debug!(target: "droidbridge.bridge", "presence listener registered");
		}

		self.transport.start_daemon().await?;
		info!(target: "droidbridge.bridge", "device presence tracking started");

		self.wait_for_initial_list().await;

		Ok(BridgeHandle {
			transport: Arc::clone(&self.transport),
			snapshot: Arc::clone(&self.snapshot),
		})
	}

	/// Returns `true` if the enumeration completed within the attempt budget.
	async fn wait_for_initial_list(&self) -> bool {
		let mut attempts = 0;
		while !self.transport.has_initial_device_list() {
			if attempts >= self.config.enumeration_attempts {
				warn!(
					target: "droidbridge.bridge",
					attempts,
					devices = self.snapshot.devices().len(),
					"initial device enumeration timed out; continuing with partial list"
				);
				return false;
			}
			tokio::time::sleep(self.config.enumeration_poll).await;
			attempts += 1;
		}
		debug!(target: "droidbridge.bridge", attempts, "initial device enumeration complete");
		true
	}
}

/// Cheap, cloneable handle to a connected bridge.
#[derive(Clone)]
pub struct BridgeHandle {
	transport: Arc<dyn Transport>,
	snapshot: Arc<DeviceSnapshot>,
}

impl BridgeHandle {
	/// Every device in the snapshot, online or not.
	pub fn devices(&self) -> Vec<DeviceHandle> {
		self.snapshot.devices()
	}

	pub fn registry(&self) -> DeviceRegistry {
		DeviceRegistry::new(Arc::clone(&self.snapshot))
	}

	pub fn commands(&self) -> CommandChannel {
		CommandChannel::new(Arc::clone(&self.transport), self.registry())
	}

	pub fn forwards(&self) -> PortForwards {
		PortForwards::new(Arc::clone(&self.transport), self.registry())
	}

	pub fn transport(&self) -> Arc<dyn Transport> {
		Arc::clone(&self.transport)
	}
}
