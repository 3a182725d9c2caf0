//! Service bootstrap: deploy and launch a device service.
//!
//! One run walks a fixed sequence of stages:
//!
//! 1. **Select**: read CPU ABI and API level, pick the artifact variant
//! 2. **Clean**: remove leftovers of earlier runs (failure is only logged)
//! 3. **Push**: hand every artifact to the shared [`PushPool`] without waiting
//! 4. **AwaitPresence**: list the staging directory until every artifact is
//!    there, bounded by [`BootstrapConfig::presence_timeout`]
//! 5. **Authorize**: make the binary executable
//! 6. **Launch**: start the service over a streaming shell
//! 7. **Streaming**: return a [`ServiceSession`] while output is logged
//!
//! Runs for the same device and service are serialized; a run is rejected
//! while an earlier session for that pair is still active. Different
//! services on one device bootstrap concurrently.

mod artifact;
mod config;
mod session;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use droidbridge_protocol::{ArtifactSet, DeviceHandle, STAGING_DIR, ServiceKind};
use droidbridge_runtime::{BridgeHandle, CommandChannel, CommandFault, DeviceRegistry, LoggingSink, PushPool};
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use artifact::{ArtifactLayout, select_artifacts};
pub use config::{BootstrapConfig, DEFAULT_PRESENCE_POLL, DEFAULT_PRESENCE_TIMEOUT};
pub use session::{ServiceSession, SessionEnd, SessionState};

use crate::error::{BootstrapError, Result};
use crate::parse::{UNKNOWN_SIZE, parse_api_level, parse_screen_size};

/// Property holding the primary CPU ABI.
pub const ABI_PROPERTY: &str = "ro.product.cpu.abi";

/// Property holding the API level.
pub const API_LEVEL_PROPERTY: &str = "ro.build.version.sdk";

/// Default JPEG quality for the capture service.
pub const DEFAULT_QUALITY: u32 = 80;

const MAX_QUALITY: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
	Select,
	Clean,
	Push,
	AwaitPresence,
	Authorize,
	Launch,
	Streaming,
}

impl fmt::Display for BootstrapStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Select => "select",
			Self::Clean => "clean",
			Self::Push => "push",
			Self::AwaitPresence => "await-presence",
			Self::Authorize => "authorize",
			Self::Launch => "launch",
			Self::Streaming => "streaming",
		};
		f.write_str(name)
	}
}

/// What to bootstrap, and where.
#[derive(Debug, Clone)]
pub struct BootstrapRequest {
	serial: String,
	kind: ServiceKind,
	quality: u32,
	rotation: u32,
	cancel: CancellationToken,
}

impl BootstrapRequest {
	/// Screen capture at JPEG `quality` (0 to 100).
	pub fn capture(serial: impl Into<String>, quality: u32) -> Self {
		Self::new(serial, ServiceKind::Capture).with_quality(quality)
	}

	pub fn input(serial: impl Into<String>) -> Self {
		Self::new(serial, ServiceKind::Input)
	}

	pub fn new(serial: impl Into<String>, kind: ServiceKind) -> Self {
		Self {
			serial: serial.into(),
			kind,
			quality: DEFAULT_QUALITY,
			rotation: 0,
			cancel: CancellationToken::new(),
		}
	}

	pub fn with_quality(mut self, quality: u32) -> Self {
		self.quality = quality;
		self
	}

	/// Display rotation in degrees passed to the capture service.
	pub fn with_rotation(mut self, rotation: u32) -> Self {
		self.rotation = rotation;
		self
	}

	/// Cancels the presence poll and, once launched, detaches the stream.
	pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
		self.cancel = cancel;
		self
	}

	pub fn serial(&self) -> &str {
		&self.serial
	}

	pub fn kind(&self) -> ServiceKind {
		self.kind
	}
}

type SessionKey = (String, ServiceKind);
type SessionSlot = Arc<Mutex<Option<watch::Receiver<SessionState>>>>;

/// Deploys and launches capture and input services on connected devices.
#[derive(Clone)]
pub struct ServiceBootstrap {
	registry: DeviceRegistry,
	commands: CommandChannel,
	pushes: PushPool,
	config: BootstrapConfig,
	slots: Arc<DashMap<SessionKey, SessionSlot>>,
}

impl ServiceBootstrap {
	pub fn new(bridge: &BridgeHandle, config: BootstrapConfig) -> Self {
		Self {
			registry: bridge.registry(),
			commands: bridge.commands(),
			pushes: PushPool::new(bridge.transport(), config.push_concurrency),
			config,
			slots: Arc::new(DashMap::new()),
		}
	}

	pub fn config(&self) -> &BootstrapConfig {
		&self.config
	}

	/// Runs the bootstrap for `request` and returns the streaming session.
	///
	/// # Errors
	///
	/// See [`BootstrapError`]. Nothing is left running on failure; pushed
	/// files stay in the staging directory until the next clean.
	pub async fn start(&self, request: BootstrapRequest) -> Result<ServiceSession> {
		if request.kind == ServiceKind::Capture && request.quality > MAX_QUALITY {
			return Err(BootstrapError::InvalidQuality(request.quality));
		}

		let key = (request.serial.clone(), request.kind);
		let slot = Arc::clone(self.slots.entry(key).or_default().value());
		let mut slot = tokio::select! {
			biased;
			_ = request.cancel.cancelled() => return Err(self.cancelled(&request)),
			guard = slot.lock_owned() => guard,
		};

		if (*slot).as_ref().is_some_and(|state| state.borrow().is_active()) {
			return Err(BootstrapError::AlreadyActive {
				serial: request.serial.clone(),
				kind: request.kind,
			});
		}

		let (session, state) = self.run(&request).await?;
		*slot = Some(state);
		Ok(session)
	}

	async fn run(&self, request: &BootstrapRequest) -> Result<(ServiceSession, watch::Receiver<SessionState>)> {
		let serial = request.serial.as_str();
		let kind = request.kind;
		let device = self.registry.lookup(serial).ok_or_else(|| BootstrapError::DeviceUnavailable {
			serial: serial.to_string(),
		})?;
		info!(target: "droidbridge.bootstrap", serial, service = %kind, "bootstrap started");

		self.enter(serial, kind, BootstrapStage::Select);
		let artifacts = self.select(&device, kind).await?;

		self.enter(serial, kind, BootstrapStage::Clean);
		let clean = format!("rm -rf {STAGING_DIR}/{}*", kind.stem());
		if let Err(fault) = self.commands.try_run(&device, &clean).await {
			warn!(target: "droidbridge.bootstrap", serial, service = %kind, error = %fault, "clean failed; continuing");
		}

		self.enter(serial, kind, BootstrapStage::Push);
		for artifact in artifacts.iter() {
			drop(self.pushes.dispatch(serial, artifact.local_path.clone(), &artifact.remote_path));
		}

		self.enter(serial, kind, BootstrapStage::AwaitPresence);
		self.await_presence(&device, request, &artifacts).await?;

		self.enter(serial, kind, BootstrapStage::Authorize);
		if let Some(mode) = artifacts.binary.mode {
			let chmod = format!("chmod {mode:o} {}", artifacts.binary.remote_path);
			self.commands.try_run(&device, &chmod).await?;
		}

		self.enter(serial, kind, BootstrapStage::Launch);
		let command = self.launch_command(&device, request, &artifacts).await?;

		self.enter(serial, kind, BootstrapStage::Streaming);
		let cancel = request.cancel.child_token();
		let (tx, rx) = watch::channel(SessionState::Active);
		{
			let commands = self.commands.clone();
			let device = device.clone();
			let command = command.clone();
			let cancel = cancel.clone();
			tokio::spawn(async move {
				let sink = LoggingSink::new(&device.serial, kind.to_string());
				let end = SessionEnd::from(commands.run_streaming(&device, &command, sink, &cancel).await);
				info!(target: "droidbridge.bootstrap", serial = %device.serial, service = %kind, end = ?end, "service session ended");
				tx.send_replace(SessionState::Ended(end));
			});
		}
		info!(target: "droidbridge.bootstrap", serial, service = %kind, "service launched");

		let session = ServiceSession::new(serial.to_string(), kind, artifacts, command, rx.clone(), cancel);
		Ok((session, rx))
	}

	fn enter(&self, serial: &str, kind: ServiceKind, stage: BootstrapStage) {
		debug!(target: "droidbridge.bootstrap", serial, service = %kind, %stage, "stage");
	}

	fn cancelled(&self, request: &BootstrapRequest) -> BootstrapError {
		info!(target: "droidbridge.bootstrap", serial = %request.serial, service = %request.kind, "bootstrap cancelled");
		BootstrapError::Cancelled {
			serial: request.serial.clone(),
			kind: request.kind,
		}
	}

	fn unavailable(&self, device: &DeviceHandle) -> Option<BootstrapError> {
		(!self.registry.is_online(&device.serial)).then(|| BootstrapError::DeviceUnavailable {
			serial: device.serial.clone(),
		})
	}

	async fn select(&self, device: &DeviceHandle, kind: ServiceKind) -> Result<ArtifactSet> {
		let abi = self.commands.property(device, ABI_PROPERTY).await;
		let api = self.commands.property(device, API_LEVEL_PROPERTY).await;
		if let Some(err) = self.unavailable(device) {
			return Err(err);
		}

		let abi = abi.filter(|v| !v.is_empty()).ok_or_else(|| BootstrapError::Capability {
			serial: device.serial.clone(),
			property: ABI_PROPERTY,
			value: None,
		})?;
		let api_level = api.as_deref().and_then(parse_api_level).ok_or_else(|| BootstrapError::Capability {
			serial: device.serial.clone(),
			property: API_LEVEL_PROPERTY,
			value: api.clone(),
		})?;

		let artifacts = select_artifacts(kind, &abi, api_level, &self.config.layout());
		debug!(
			target: "droidbridge.bootstrap",
			serial = %device.serial,
			abi,
			api_level,
			binary = %artifacts.binary.name,
			"artifacts selected"
		);
		Ok(artifacts)
	}

	async fn await_presence(&self, device: &DeviceHandle, request: &BootstrapRequest, artifacts: &ArtifactSet) -> Result<()> {
		let started = Instant::now();
		let listing = format!("ls {STAGING_DIR}");
		loop {
			if request.cancel.is_cancelled() {
				return Err(self.cancelled(request));
			}
			if let Some(err) = self.unavailable(device) {
				return Err(err);
			}

			let missing = match self.commands.try_run(device, &listing).await {
				Ok(output) => missing_entries(&output, artifacts),
				Err(fault @ CommandFault::DeviceUnavailable { .. }) => return Err(fault.into()),
				Err(fault) => {
					debug!(target: "droidbridge.bootstrap", serial = %device.serial, error = %fault, "staging listing failed");
					artifacts.expected_names().into_iter().map(str::to_string).collect()
				}
			};
			if missing.is_empty() {
				debug!(target: "droidbridge.bootstrap", serial = %device.serial, waited = ?started.elapsed(), "artifacts present");
				return Ok(());
			}

			let waited = started.elapsed();
			if waited >= self.config.presence_timeout {
				warn!(target: "droidbridge.bootstrap", serial = %device.serial, ?missing, ?waited, "artifacts never appeared");
				return Err(BootstrapError::ConvergenceStall {
					serial: device.serial.clone(),
					missing,
					waited,
				});
			}

			tokio::select! {
				biased;
				_ = request.cancel.cancelled() => return Err(self.cancelled(request)),
				_ = tokio::time::sleep(self.config.presence_poll) => {}
			}
		}
	}

	async fn launch_command(&self, device: &DeviceHandle, request: &BootstrapRequest, artifacts: &ArtifactSet) -> Result<String> {
		let binary = &artifacts.binary.remote_path;
		match request.kind {
			ServiceKind::Input => Ok(binary.clone()),
			ServiceKind::Capture => {
				let raw = self.commands.try_run(device, "wm size").await?;
				let size = parse_screen_size(&raw);
				if size == UNKNOWN_SIZE {
					return Err(BootstrapError::ScreenSize {
						serial: device.serial.clone(),
						raw: raw.trim().to_string(),
					});
				}
				Ok(format!(
					"LD_LIBRARY_PATH={STAGING_DIR} {binary} -Q {} -P {size}@{size}/{}",
					request.quality, request.rotation
				))
			}
		}
	}
}

/// Expected artifact names absent from an `ls` listing. Entries must match exactly.
fn missing_entries(listing: &str, artifacts: &ArtifactSet) -> Vec<String> {
	let present: Vec<&str> = listing.lines().map(str::trim).collect();
	artifacts
		.expected_names()
		.into_iter()
		.filter(|name| !present.contains(name))
		.map(str::to_string)
		.collect()
}
