//! In-memory [`Transport`] for tests.
//!
//! Simulates a daemon with scripted devices: presence updates, properties,
//! canned shell output, a staging directory that push fills (optionally after
//! a delay), forwards, and controllable output streams. Every call is
//! recorded with a timestamp so tests can assert on ordering.
//!
//! ```ignore
//! let fake = Arc::new(
//!     FakeTransport::new()
//!         .with_device(DeviceHandle::new("ABC123", DeviceState::Online))
//!         .with_response("wm size", "Physical size: 1080x1920\r\n"),
//! );
//! let bridge = Bridge::new(fake.clone(), BridgeConfig::default());
//! let handle = bridge.connect().await?;
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use droidbridge_protocol::{DeviceHandle, ForwardBinding, STAGING_DIR};
use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::{Error, Result};
use crate::transport::{OutputStream, PresenceListener, Transport};

/// Which primitive a recorded call used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
	Shell,
	Stream,
}

/// One recorded shell call.
#[derive(Debug, Clone)]
pub struct ShellRecord {
	pub serial: String,
	pub command: String,
	pub kind: CallKind,
	pub output: String,
	pub at: Instant,
}

/// One recorded transfer.
#[derive(Debug, Clone)]
pub struct PushRecord {
	pub serial: String,
	pub local: PathBuf,
	pub remote: String,
	pub dispatched_at: Instant,
	pub landed_at: Option<Instant>,
}

#[derive(Default)]
struct FakeState {
	devices: Vec<DeviceHandle>,
	properties: HashMap<(String, String), String>,
	responses: Vec<(String, String)>,
	streams: Vec<(String, mpsc::UnboundedReceiver<Bytes>)>,
	staged: HashMap<String, BTreeSet<String>>,
	push_delay: Duration,
	fail_pushes: bool,
	log: Vec<ShellRecord>,
	pushes: Vec<PushRecord>,
	forwards: Vec<ForwardBinding>,
	busy_ports: Vec<u16>,
}

/// Scriptable fake of the adb daemon.
pub struct FakeTransport {
	state: Mutex<FakeState>,
	listeners: RwLock<Vec<Arc<dyn PresenceListener>>>,
	initial_list: AtomicBool,
	enumerate_on_start: AtomicBool,
	fail_start: AtomicBool,
	daemon_starts: AtomicUsize,
}

impl Default for FakeTransport {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeTransport {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(FakeState::default()),
			listeners: RwLock::new(Vec::new()),
			initial_list: AtomicBool::new(false),
			enumerate_on_start: AtomicBool::new(true),
			fail_start: AtomicBool::new(false),
			daemon_starts: AtomicUsize::new(0),
		}
	}

	pub fn with_device(self, device: DeviceHandle) -> Self {
		self.state.lock().devices.push(device);
		self
	}

	pub fn with_property(self, serial: &str, key: &str, value: &str) -> Self {
		self.state.lock().properties.insert((serial.to_string(), key.to_string()), value.to_string());
		self
	}

	/// Canned output for shell commands starting with `prefix`.
	pub fn with_response(self, prefix: &str, output: &str) -> Self {
		self.state.lock().responses.push((prefix.to_string(), output.to_string()));
		self
	}

	/// Delay between a push starting and the file appearing in staging.
	pub fn with_push_delay(self, delay: Duration) -> Self {
		self.state.lock().push_delay = delay;
		self
	}

	/// Pushes fail and never stage the file.
	pub fn with_failing_pushes(self) -> Self {
		self.state.lock().fail_pushes = true;
		self
	}

	/// Forwards on `port` are rejected as already bound.
	pub fn with_busy_port(self, port: u16) -> Self {
		self.state.lock().busy_ports.push(port);
		self
	}

	/// The daemon never reports an initial enumeration.
	pub fn without_initial_list(self) -> Self {
		self.enumerate_on_start.store(false, Ordering::SeqCst);
		self
	}

	/// Daemon start fails.
	pub fn with_failing_start(self) -> Self {
		self.fail_start.store(true, Ordering::SeqCst);
		self
	}

	/// Replaces the device list and notifies listeners, as the daemon would.
	pub fn set_devices(&self, devices: Vec<DeviceHandle>) {
		self.state.lock().devices = devices.clone();
		self.notify(devices);
	}

	/// Registers an output stream for streaming commands starting with `prefix`.
	///
	/// Dropping the returned sender closes the stream, which looks like the
	/// remote process exiting. Commands with no registered stream stay open
	/// forever.
	pub fn stream_for(&self, prefix: &str) -> mpsc::UnboundedSender<Bytes> {
		let (tx, rx) = mpsc::unbounded_channel();
		self.state.lock().streams.push((prefix.to_string(), rx));
		tx
	}

	/// Places a file in the staging directory directly.
	pub fn stage_file(&self, serial: &str, name: &str) {
		self.state.lock().staged.entry(serial.to_string()).or_default().insert(name.to_string());
	}

	pub fn daemon_starts(&self) -> usize {
		self.daemon_starts.load(Ordering::SeqCst)
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.read().len()
	}

	pub fn shell_log(&self) -> Vec<ShellRecord> {
		self.state.lock().log.clone()
	}

	pub fn commands_for(&self, serial: &str) -> Vec<String> {
		self.state.lock().log.iter().filter(|r| r.serial == serial).map(|r| r.command.clone()).collect()
	}

	pub fn pushes(&self) -> Vec<PushRecord> {
		self.state.lock().pushes.clone()
	}

	pub fn forwards(&self) -> Vec<ForwardBinding> {
		self.state.lock().forwards.clone()
	}

	pub fn staged(&self, serial: &str) -> Vec<String> {
		self.state.lock().staged.get(serial).map(|s| s.iter().cloned().collect()).unwrap_or_default()
	}

	fn notify(&self, devices: Vec<DeviceHandle>) {
		let listeners = self.listeners.read().clone();
		for listener in listeners {
			listener.device_list_changed(devices.clone());
		}
	}

	fn ensure_online(&self, serial: &str) -> Result<()> {
		let state = self.state.lock();
		if state.devices.iter().any(|d| d.serial == serial && d.is_online()) {
			Ok(())
		} else {
			Err(Error::device_unavailable(serial))
		}
	}

	fn respond(state: &mut FakeState, serial: &str, command: &str) -> String {
		let staging_glob = format!("{STAGING_DIR}/");
		if command.trim() == format!("ls {STAGING_DIR}") {
			return state
				.staged
				.get(serial)
				.map(|files| files.iter().map(|f| format!("{f}\n")).collect())
				.unwrap_or_default();
		}
		if let Some(pattern) = command.strip_prefix("rm -rf ").and_then(|p| p.strip_prefix(&staging_glob)) {
			let prefix = pattern.trim_end_matches('*');
			if let Some(files) = state.staged.get_mut(serial) {
				files.retain(|f| !f.starts_with(prefix));
			}
			return String::new();
		}
		state
			.responses
			.iter()
			.find(|(prefix, _)| command.starts_with(prefix.as_str()))
			.map(|(_, output)| output.clone())
			.unwrap_or_default()
	}
}

#[async_trait]
impl Transport for FakeTransport {
	fn add_presence_listener(&self, listener: Arc<dyn PresenceListener>) {
		self.listeners.write().push(listener);
	}

	async fn start_daemon(&self) -> Result<()> {
		self.daemon_starts.fetch_add(1, Ordering::SeqCst);
		if self.fail_start.load(Ordering::SeqCst) {
			return Err(Error::DaemonStart("fake daemon refused to start".to_string()));
		}
		if self.enumerate_on_start.load(Ordering::SeqCst) {
			let devices = self.state.lock().devices.clone();
			self.notify(devices);
			self.initial_list.store(true, Ordering::SeqCst);
		}
		Ok(())
	}

	fn has_initial_device_list(&self) -> bool {
		self.initial_list.load(Ordering::SeqCst)
	}

	async fn shell(&self, serial: &str, command: &str) -> Result<String> {
		self.ensure_online(serial)?;
		let mut state = self.state.lock();
		let output = Self::respond(&mut state, serial, command);
		state.log.push(ShellRecord {
			serial: serial.to_string(),
			command: command.to_string(),
			kind: CallKind::Shell,
			output: output.clone(),
			at: Instant::now(),
		});
		Ok(output)
	}

	async fn shell_stream(&self, serial: &str, command: &str) -> Result<OutputStream> {
		self.ensure_online(serial)?;
		let mut state = self.state.lock();
		state.log.push(ShellRecord {
			serial: serial.to_string(),
			command: command.to_string(),
			kind: CallKind::Stream,
			output: String::new(),
			at: Instant::now(),
		});
		let position = state.streams.iter().position(|(prefix, _)| command.starts_with(prefix.as_str()));
		match position {
			Some(index) => {
				let (_, rx) = state.streams.remove(index);
				Ok(Box::pin(UnboundedReceiverStream::new(rx).map(Ok::<Bytes, std::io::Error>)))
			}
			None => Ok(Box::pin(futures_util::stream::pending::<std::io::Result<Bytes>>())),
		}
	}

	async fn property(&self, serial: &str, key: &str) -> Result<Option<String>> {
		self.ensure_online(serial)?;
		Ok(self.state.lock().properties.get(&(serial.to_string(), key.to_string())).cloned())
	}

	async fn create_forward(&self, binding: &ForwardBinding) -> Result<()> {
		self.ensure_online(&binding.serial)?;
		let mut state = self.state.lock();
		if state.busy_ports.contains(&binding.local_port) {
			return Err(Error::Transport(format!("cannot bind listener: port {} in use", binding.local_port)));
		}
		state.forwards.push(binding.clone());
		Ok(())
	}

	async fn remove_forward(&self, binding: &ForwardBinding) -> Result<()> {
		self.ensure_online(&binding.serial)?;
		let mut state = self.state.lock();
		let before = state.forwards.len();
		state.forwards.retain(|f| !(f.serial == binding.serial && f.local_port == binding.local_port));
		if state.forwards.len() == before {
			return Err(Error::Transport(format!("listener '{}' not found", binding.local_spec())));
		}
		Ok(())
	}

	async fn push(&self, serial: &str, local: &Path, remote: &str) -> Result<()> {
		let (delay, fail, index) = {
			let mut state = self.state.lock();
			state.pushes.push(PushRecord {
				serial: serial.to_string(),
				local: local.to_path_buf(),
				remote: remote.to_string(),
				dispatched_at: Instant::now(),
				landed_at: None,
			});
			(state.push_delay, state.fail_pushes, state.pushes.len() - 1)
		};

		if !delay.is_zero() {
			tokio::time::sleep(delay).await;
		}
		if fail {
			return Err(Error::Transport(format!("failed to copy '{}'", local.display())));
		}
		self.ensure_online(serial)?;

		let name = remote.rsplit('/').next().unwrap_or(remote).to_string();
		let mut state = self.state.lock();
		state.staged.entry(serial.to_string()).or_default().insert(name);
		state.pushes[index].landed_at = Some(Instant::now());
		Ok(())
	}
}
