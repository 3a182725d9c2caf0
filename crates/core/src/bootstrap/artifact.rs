//! Artifact selection by device capability.

use std::path::{Path, PathBuf};

use droidbridge_protocol::{ArtifactSet, EXECUTABLE_MODE, ServiceArtifact, ServiceKind};

/// Host directory layout holding prebuilt service binaries.
///
/// ```text
/// <root>/<abi>/<binary>
/// <root>/minicap-shared/aosp/libs/android-<api>/<abi>/minicap.so
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
	root: PathBuf,
}

impl Default for ArtifactLayout {
	fn default() -> Self {
		Self::new("mini")
	}
}

impl ArtifactLayout {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn binary_path(&self, abi: &str, binary: &str) -> PathBuf {
		self.root.join(abi).join(binary)
	}

	pub fn library_path(&self, abi: &str, api_level: u32, library: &str) -> PathBuf {
		self.root
			.join("minicap-shared")
			.join("aosp")
			.join("libs")
			.join(format!("android-{api_level}"))
			.join(abi)
			.join(library)
	}
}

/// Chooses the files to deploy for `kind` on a device with `abi` and `api_level`.
pub fn select_artifacts(kind: ServiceKind, abi: &str, api_level: u32, layout: &ArtifactLayout) -> ArtifactSet {
	let binary_name = kind.binary_name(api_level);
	let binary = ServiceArtifact::staged(&binary_name, layout.binary_path(abi, &binary_name)).with_mode(EXECUTABLE_MODE);
	let library = kind
		.library_name()
		.map(|name| ServiceArtifact::staged(name, layout.library_path(abi, api_level, name)));
	ArtifactSet { kind, binary, library }
}
