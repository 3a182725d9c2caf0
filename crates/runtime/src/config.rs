//! Bridge configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::daemon::{resolve_daemon_path, sdk_root_from_env};
use crate::error::Result;

/// Interval between "initial device list ready?" checks.
pub const DEFAULT_ENUMERATION_POLL: Duration = Duration::from_secs(1);

/// Maximum number of enumeration checks before proceeding with a partial list.
pub const DEFAULT_ENUMERATION_ATTEMPTS: u32 = 200;

/// Settings used by [`Bridge`](crate::bridge::Bridge) to locate and start the daemon.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
	/// Explicit adb executable, overriding the SDK root.
	pub daemon_path: Option<PathBuf>,
	/// Android SDK root (normally `$ANDROID_HOME`).
	pub sdk_root: Option<PathBuf>,
	/// Interval between enumeration checks.
	pub enumeration_poll: Duration,
	/// Upper bound on enumeration checks.
	pub enumeration_attempts: u32,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			daemon_path: None,
			sdk_root: None,
			enumeration_poll: DEFAULT_ENUMERATION_POLL,
			enumeration_attempts: DEFAULT_ENUMERATION_ATTEMPTS,
		}
	}
}

impl BridgeConfig {
	/// Builds a config with the SDK root taken from the environment.
	pub fn from_env() -> Self {
		Self {
			sdk_root: sdk_root_from_env(),
			..Self::default()
		}
	}

	pub fn with_daemon_path(mut self, path: Option<PathBuf>) -> Self {
		if path.is_some() {
			self.daemon_path = path;
		}
		self
	}

	pub fn with_enumeration(mut self, poll: Duration, attempts: u32) -> Self {
		self.enumeration_poll = poll;
		self.enumeration_attempts = attempts;
		self
	}

	/// Resolves the adb executable described by this config.
	pub fn resolve_daemon_path(&self) -> Result<PathBuf> {
		resolve_daemon_path(self.daemon_path.as_deref(), self.sdk_root.as_deref())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_enumeration_budget() {
		let cfg = BridgeConfig::default();
		assert_eq!(cfg.enumeration_poll, Duration::from_secs(1));
		assert_eq!(cfg.enumeration_attempts, 200);
	}

	#[test]
	fn none_hint_keeps_existing_daemon_path() {
		let cfg = BridgeConfig {
			daemon_path: Some(PathBuf::from("/opt/adb")),
			..BridgeConfig::default()
		}
		.with_daemon_path(None);
		assert_eq!(cfg.daemon_path, Some(PathBuf::from("/opt/adb")));
	}
}
