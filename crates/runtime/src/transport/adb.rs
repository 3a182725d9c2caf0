//! [`Transport`] backed by the `adb` client executable.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use droidbridge_protocol::{DeviceHandle, ForwardBinding};
use parking_lot::{Mutex, RwLock};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use super::framing::TrackDevicesReader;
use super::{OutputStream, PresenceListener, Transport};
use crate::error::{Error, Result};

type Listeners = Arc<RwLock<Vec<Arc<dyn PresenceListener>>>>;

/// Drives the adb client binary.
///
/// Presence tracking runs `adb track-devices -l` in a background task that
/// forwards every device list to the registered listeners.
pub struct AdbTransport {
	adb: PathBuf,
	listeners: Listeners,
	initial_list: Arc<AtomicBool>,
	tracker: Mutex<Option<JoinHandle<()>>>,
}

impl AdbTransport {
	pub fn new(adb: impl Into<PathBuf>) -> Self {
		Self {
			adb: adb.into(),
			listeners: Arc::new(RwLock::new(Vec::new())),
			initial_list: Arc::new(AtomicBool::new(false)),
			tracker: Mutex::new(None),
		}
	}

	pub fn adb_path(&self) -> &Path {
		&self.adb
	}

	fn command(&self) -> Command {
		let mut cmd = Command::new(&self.adb);
		cmd.stdin(Stdio::null());
		cmd
	}

	fn device_command(&self, serial: &str) -> Command {
		let mut cmd = self.command();
		cmd.arg("-s").arg(serial);
		cmd
	}

	async fn output(&self, mut cmd: Command) -> Result<Output> {
		Ok(cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).output().await?)
	}

	async fn run_checked(&self, serial: &str, cmd: Command) -> Result<String> {
		let output = self.output(cmd).await?;
		let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
		if output.status.success() {
			return Ok(stdout);
		}
		let stderr = String::from_utf8_lossy(&output.stderr);
		Err(classify_failure(serial, stderr.trim(), &stdout))
	}

	fn spawn_tracker(&self) -> Result<JoinHandle<()>> {
		let mut child = self
			.command()
			.args(["track-devices", "-l"])
			.stdout(Stdio::piped())
			.stderr(Stdio::null())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| Error::DaemonStart(format!("failed to spawn track-devices: {e}")))?;

		let stdout = child
			.stdout
			.take()
			.ok_or_else(|| Error::DaemonStart("track-devices has no stdout".to_string()))?;
		let listeners = Arc::clone(&self.listeners);
		let initial_list = Arc::clone(&self.initial_list);

		Ok(tokio::spawn(async move {
			let _child = child;
			let mut reader = TrackDevicesReader::new(stdout);
			loop {
				match reader.next_list().await {
					Ok(Some(devices)) => {
						debug!(target: "droidbridge.presence", count = devices.len(), "device list update");
						notify(&listeners, devices);
						initial_list.store(true, Ordering::SeqCst);
					}
					Ok(None) => {
						warn!(target: "droidbridge.presence", "track-devices stream closed");
						break;
					}
					Err(e) => {
						warn!(target: "droidbridge.presence", error = %e, "track-devices stream failed");
						break;
					}
				}
			}
		}))
	}
}

impl Drop for AdbTransport {
	fn drop(&mut self) {
		if let Some(tracker) = self.tracker.lock().take() {
			tracker.abort();
		}
	}
}

fn notify(listeners: &Listeners, devices: Vec<DeviceHandle>) {
	let listeners = listeners.read().clone();
	for listener in listeners {
		listener.device_list_changed(devices.clone());
	}
}

/// Maps adb client failure text onto runtime errors.
fn classify_failure(serial: &str, stderr: &str, stdout: &str) -> Error {
	let text = if stderr.is_empty() { stdout.trim() } else { stderr };
	let device_gone = text.contains(&format!("device '{serial}' not found"))
		|| ["device not found", "device offline", "no devices", "unauthorized"]
			.iter()
			.any(|marker| text.contains(marker));
	if device_gone {
		Error::device_unavailable(serial)
	} else {
		Error::Transport(text.to_string())
	}
}

#[async_trait]
impl Transport for AdbTransport {
	fn add_presence_listener(&self, listener: Arc<dyn PresenceListener>) {
		self.listeners.write().push(listener);
	}

	async fn start_daemon(&self) -> Result<()> {
		if let Some(tracker) = self.tracker.lock().take() {
			tracker.abort();
		}
		self.initial_list.store(false, Ordering::SeqCst);

		let mut kill = self.command();
		kill.arg("kill-server");
		if let Err(e) = self.output(kill).await {
			debug!(target: "droidbridge.daemon", error = %e, "kill-server failed");
		}

		let mut start = self.command();
		start.arg("start-server");
		let output = self.output(start).await.map_err(|e| Error::DaemonStart(e.to_string()))?;
		if !output.status.success() {
			return Err(Error::DaemonStart(String::from_utf8_lossy(&output.stderr).trim().to_string()));
		}
		info!(target: "droidbridge.daemon", adb = %self.adb.display(), "adb daemon started");

		let tracker = self.spawn_tracker()?;
		*self.tracker.lock() = Some(tracker);
		Ok(())
	}

	fn has_initial_device_list(&self) -> bool {
		self.initial_list.load(Ordering::SeqCst)
	}

	async fn shell(&self, serial: &str, command: &str) -> Result<String> {
		let mut cmd = self.device_command(serial);
		cmd.arg("shell").arg(command);
		let output = self.output(cmd).await?;
		let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

		// Remote exit codes pass through, so a failing `grep` is not a fault.
		if !output.status.success() && stdout.is_empty() {
			let stderr = String::from_utf8_lossy(&output.stderr);
			let stderr = stderr.trim();
			if !stderr.is_empty() {
				return Err(classify_failure(serial, stderr, &stdout));
			}
		}
		Ok(stdout)
	}

	async fn shell_stream(&self, serial: &str, command: &str) -> Result<OutputStream> {
		let mut child = self
			.device_command(serial)
			.arg("shell")
			.arg(command)
			.stdout(Stdio::piped())
			.stderr(Stdio::null())
			.spawn()?;

		let stdout = child
			.stdout
			.take()
			.ok_or_else(|| Error::Transport("shell stream has no stdout".to_string()))?;

		let serial = serial.to_string();
		tokio::spawn(async move {
			match child.wait().await {
				Ok(status) => debug!(target: "droidbridge.shell", serial, %status, "streaming shell exited"),
				Err(e) => warn!(target: "droidbridge.shell", serial, error = %e, "streaming shell wait failed"),
			}
		});

		Ok(Box::pin(ReaderStream::new(stdout)))
	}

	async fn property(&self, serial: &str, key: &str) -> Result<Option<String>> {
		let value = self.shell(serial, &format!("getprop {key}")).await?;
		let value = value.trim();
		Ok((!value.is_empty()).then(|| value.to_string()))
	}

	async fn create_forward(&self, binding: &ForwardBinding) -> Result<()> {
		let mut cmd = self.device_command(&binding.serial);
		cmd.arg("forward").arg(binding.local_spec()).arg(binding.remote_spec());
		self.run_checked(&binding.serial, cmd).await.map(drop)
	}

	async fn remove_forward(&self, binding: &ForwardBinding) -> Result<()> {
		let mut cmd = self.device_command(&binding.serial);
		cmd.args(["forward", "--remove"]).arg(binding.local_spec());
		self.run_checked(&binding.serial, cmd).await.map(drop)
	}

	async fn push(&self, serial: &str, local: &Path, remote: &str) -> Result<()> {
		let mut cmd = self.device_command(serial);
		cmd.arg("push").arg(local).arg(remote);
		self.run_checked(serial, cmd).await.map(drop)
	}
}
