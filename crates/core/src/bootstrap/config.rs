//! Bootstrap settings.

use std::path::PathBuf;
use std::time::Duration;

use droidbridge_runtime::DEFAULT_PUSH_CONCURRENCY;

use super::artifact::ArtifactLayout;

/// Interval between staging directory listings.
pub const DEFAULT_PRESENCE_POLL: Duration = Duration::from_millis(200);

/// How long pushed artifacts may take to appear before giving up.
pub const DEFAULT_PRESENCE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
	/// Host directory with the prebuilt binaries.
	pub artifact_root: PathBuf,
	pub presence_poll: Duration,
	pub presence_timeout: Duration,
	/// Transfers allowed in flight across all devices.
	pub push_concurrency: usize,
}

impl Default for BootstrapConfig {
	fn default() -> Self {
		Self {
			artifact_root: ArtifactLayout::default().root().to_path_buf(),
			presence_poll: DEFAULT_PRESENCE_POLL,
			presence_timeout: DEFAULT_PRESENCE_TIMEOUT,
			push_concurrency: DEFAULT_PUSH_CONCURRENCY,
		}
	}
}

impl BootstrapConfig {
	pub fn with_artifact_root(mut self, root: impl Into<PathBuf>) -> Self {
		self.artifact_root = root.into();
		self
	}

	pub fn with_presence_poll(mut self, poll: Duration) -> Self {
		self.presence_poll = poll;
		self
	}

	pub fn with_presence_timeout(mut self, timeout: Duration) -> Self {
		self.presence_timeout = timeout;
		self
	}

	pub fn with_push_concurrency(mut self, concurrency: usize) -> Self {
		self.push_concurrency = concurrency;
		self
	}

	pub fn layout(&self) -> ArtifactLayout {
		ArtifactLayout::new(&self.artifact_root)
	}
}
