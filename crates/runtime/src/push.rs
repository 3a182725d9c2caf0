//! Bounded background pool for host-to-device file transfers.
//!
//! Dispatch returns immediately; the transfer runs on a shared tokio task
//! once a permit is free. Callers that need to know a file arrived observe
//! the device (see the bootstrap presence poll), not the returned handle.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Default number of concurrent transfers across all devices.
pub const DEFAULT_PUSH_CONCURRENCY: usize = 4;

/// Shared, bounded transfer pool.
#[derive(Clone)]
pub struct PushPool {
	transport: Arc<dyn Transport>,
	permits: Arc<Semaphore>,
}

impl PushPool {
	pub fn new(transport: Arc<dyn Transport>, concurrency: usize) -> Self {
		Self {
			transport,
			permits: Arc::new(Semaphore::new(concurrency.max(1))),
		}
	}

	/// Number of transfers that could start right now.
	pub fn available(&self) -> usize {
		self.permits.available_permits()
	}

	/// Queues a transfer of `local` to `remote` on `serial`.
	///
	/// The handle may be dropped; the transfer keeps running. Failures are
	/// logged here and also returned through the handle.
	pub fn dispatch(&self, serial: &str, local: impl Into<PathBuf>, remote: &str) -> JoinHandle<Result<()>> {
		let transport = Arc::clone(&self.transport);
		let permits = Arc::clone(&self.permits);
		let serial = serial.to_string();
		let local = local.into();
		let remote = remote.to_string();

		tokio::spawn(async move {
			let _permit = permits
				.acquire_owned()
				.await
				.map_err(|_| Error::Transport("push pool closed".to_string()))?;
			debug!(target: "droidbridge.push", serial, local = %local.display(), remote, "push started");
			let result = transport.push(&serial, &local, &remote).await;
			match &result {
				Ok(()) => debug!(target: "droidbridge.push", serial, remote, "push finished"),
				Err(e) => warn!(target: "droidbridge.push", serial, remote, error = %e, "push failed"),
			}
			result
		})
	}
}
