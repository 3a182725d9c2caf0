//! adb daemon discovery
//!
//! Locates the adb client executable that starts and talks to the daemon.
//! Resolution order:
//! 1. Explicit path hint (`--adb` flag or [`BridgeConfig::daemon_path`])
//! 2. `$ANDROID_HOME/platform-tools/adb`
//!
//! There is no PATH fallback: a host without an SDK root has no daemon to
//! spawn, and that is reported once as a configuration error.
//!
//! [`BridgeConfig::daemon_path`]: crate::config::BridgeConfig::daemon_path

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::error::{Error, Result};

/// Environment variable naming the Android SDK root.
pub const SDK_ROOT_ENV: &str = "ANDROID_HOME";

/// SDK subdirectory holding the adb client.
pub const PLATFORM_TOOLS_DIR: &str = "platform-tools";

/// File name of the adb client on this platform.
pub fn adb_executable_name() -> &'static str {
	if cfg!(windows) { "adb.exe" } else { "adb" }
}

/// Reads the SDK root from the environment.
pub fn sdk_root_from_env() -> Option<PathBuf> {
	std::env::var_os(SDK_ROOT_ENV).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Derives the adb path below an SDK root.
pub fn adb_path_in_sdk(sdk_root: &Path) -> PathBuf {
	sdk_root.join(PLATFORM_TOOLS_DIR).join(adb_executable_name())
}

/// Resolves the adb executable from a hint or an SDK root.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if neither source is available and
/// [`Error::DaemonNotFound`] if the resolved path does not exist.
pub fn resolve_daemon_path(hint: Option<&Path>, sdk_root: Option<&Path>) -> Result<PathBuf> {
	let (source, path) = match (hint, sdk_root) {
		(Some(hint), _) => ("hint", hint.to_path_buf()),
		(None, Some(root)) => (SDK_ROOT_ENV, adb_path_in_sdk(root)),
		(None, None) => {
			error!(target: "droidbridge.daemon", env = SDK_ROOT_ENV, "no adb path configured");
			return Err(Error::Configuration(format!(
				"set {SDK_ROOT_ENV} or pass an explicit adb path"
			)));
		}
	};

	debug!(target: "droidbridge.daemon", source, path = %path.display(), "resolved adb path");

	if !path.exists() {
		return Err(Error::DaemonNotFound(path));
	}
	Ok(path)
}
