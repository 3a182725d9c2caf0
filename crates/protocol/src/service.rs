//! Auxiliary device services and the artifacts deployed for them.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Device-side directory every artifact is staged into.
pub const STAGING_DIR: &str = "/data/local/tmp";

/// First API level whose loader requires position-independent executables.
pub const PIE_MIN_API_LEVEL: u32 = 16;

/// Permission bits applied to a deployed binary.
pub const EXECUTABLE_MODE: u32 = 0o777;

/// The two services bootstrapped onto each device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
	/// Screen-frame streaming service.
	Capture,
	/// Synthetic input injection service.
	Input,
}

impl ServiceKind {
	/// Base file name of the service binary.
	pub fn stem(self) -> &'static str {
		match self {
			Self::Capture => "minicap",
			Self::Input => "minitouch",
		}
	}

	/// Binary file name for a device at `api_level`.
	///
	/// Devices below [`PIE_MIN_API_LEVEL`] get the `-nopie` build.
	pub fn binary_name(self, api_level: u32) -> String {
		if api_level < PIE_MIN_API_LEVEL {
			format!("{}-nopie", self.stem())
		} else {
			self.stem().to_string()
		}
	}

	/// Shared library name loaded by the service, if any.
	pub fn library_name(self) -> Option<&'static str> {
		match self {
			Self::Capture => Some("minicap.so"),
			Self::Input => None,
		}
	}

	/// Abstract socket the running service listens on.
	pub fn socket_name(self) -> &'static str {
		self.stem()
	}
}

impl fmt::Display for ServiceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Capture => f.write_str("capture"),
			Self::Input => f.write_str("input"),
		}
	}
}

/// One file deployed to the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceArtifact {
	/// File name on the device (no directory, no versioning).
	pub name: String,
	/// Source path on the host.
	pub local_path: PathBuf,
	/// Absolute target path on the device.
	pub remote_path: String,
	/// Permission bits to apply after transfer, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mode: Option<u32>,
}

impl ServiceArtifact {
	pub fn staged(name: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
		let name = name.into();
		Self {
			remote_path: format!("{STAGING_DIR}/{name}"),
			name,
			local_path: local_path.into(),
			mode: None,
		}
	}

	pub fn with_mode(mut self, mode: u32) -> Self {
		self.mode = Some(mode);
		self
	}
}

/// Everything one bootstrap run deploys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSet {
	pub kind: ServiceKind,
	pub binary: ServiceArtifact,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub library: Option<ServiceArtifact>,
}

impl ArtifactSet {
	pub fn iter(&self) -> impl Iterator<Item = &ServiceArtifact> {
		std::iter::once(&self.binary).chain(self.library.iter())
	}

	/// File names that must be visible in the staging directory.
	pub fn expected_names(&self) -> Vec<&str> {
		self.iter().map(|a| a.name.as_str()).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn binary_name_switches_at_pie_boundary() {
		assert_eq!(ServiceKind::Capture.binary_name(15), "minicap-nopie");
		assert_eq!(ServiceKind::Capture.binary_name(16), "minicap");
		assert_eq!(ServiceKind::Input.binary_name(1), "minitouch-nopie");
		assert_eq!(ServiceKind::Input.binary_name(34), "minitouch");
	}

	#[test]
	fn staged_artifact_targets_staging_dir() {
		let artifact = ServiceArtifact::staged("minitouch", "mini/arm64-v8a/minitouch");
		assert_eq!(artifact.remote_path, "/data/local/tmp/minitouch");
		assert_eq!(artifact.mode, None);
	}

	#[test]
	fn expected_names_include_library() {
		let set = ArtifactSet {
			kind: ServiceKind::Capture,
			binary: ServiceArtifact::staged("minicap", "a"),
			library: Some(ServiceArtifact::staged("minicap.so", "b")),
		};
		assert_eq!(set.expected_names(), vec!["minicap", "minicap.so"]);
	}
}
