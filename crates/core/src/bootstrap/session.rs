//! Handle to a launched service.

use droidbridge_protocol::{ArtifactSet, ServiceKind};
use droidbridge_runtime::{CommandFault, StreamEnd};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Why a session stopped streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
	/// [`ServiceSession::request_stop`] was called; the remote process may still run.
	Detached,
	/// The remote process exited or the device went away.
	RemoteExited,
	Failed(CommandFault),
}

impl From<StreamEnd> for SessionEnd {
	fn from(end: StreamEnd) -> Self {
		match end {
			StreamEnd::Closed => Self::RemoteExited,
			StreamEnd::Cancelled => Self::Detached,
			StreamEnd::Failed(fault) => Self::Failed(fault),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
	Active,
	Ended(SessionEnd),
}

impl SessionState {
	pub fn is_active(&self) -> bool {
		matches!(self, Self::Active)
	}
}

/// A service launched by [`ServiceBootstrap`](super::ServiceBootstrap).
///
/// Dropping the handle does not stop the output stream; call
/// [`request_stop`](Self::request_stop) to detach it.
#[derive(Debug)]
pub struct ServiceSession {
	serial: String,
	kind: ServiceKind,
	artifacts: ArtifactSet,
	command: String,
	state: watch::Receiver<SessionState>,
	cancel: CancellationToken,
}

impl ServiceSession {
	pub(crate) fn new(
		serial: String,
		kind: ServiceKind,
		artifacts: ArtifactSet,
		command: String,
		state: watch::Receiver<SessionState>,
		cancel: CancellationToken,
	) -> Self {
		Self {
			serial,
			kind,
			artifacts,
			command,
			state,
			cancel,
		}
	}

	pub fn serial(&self) -> &str {
		&self.serial
	}

	pub fn kind(&self) -> ServiceKind {
		self.kind
	}

	/// The artifacts deployed for this session.
	pub fn artifacts(&self) -> &ArtifactSet {
		&self.artifacts
	}

	/// Shell command the service was launched with.
	pub fn command(&self) -> &str {
		&self.command
	}

	pub fn state(&self) -> SessionState {
		self.state.borrow().clone()
	}

	pub fn is_active(&self) -> bool {
		self.state.borrow().is_active()
	}

	/// Detaches the output stream. No kill is sent to the device.
	pub fn request_stop(&self) {
		self.cancel.cancel();
	}

	/// Waits until the session ends.
	pub async fn wait(&mut self) -> SessionEnd {
		loop {
			if let SessionState::Ended(end) = &*self.state.borrow_and_update() {
				return end.clone();
			}
			if self.state.changed().await.is_err() {
				// The streaming task is gone without reporting; treat as exited.
				return match &*self.state.borrow() {
					SessionState::Ended(end) => end.clone(),
					SessionState::Active => SessionEnd::RemoteExited,
				};
			}
		}
	}
}
