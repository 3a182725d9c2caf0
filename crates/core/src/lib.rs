//! Bootstrap screen-capture and input services onto Android devices.
//!
//! Builds on [`droidbridge_runtime`] (daemon lifecycle, registry, command
//! channel) to deploy the `minicap`/`minitouch` binaries that match each
//! device and keep them running.
//!
//! ```ignore
//! let bridge = Bridge::adb(BridgeConfig::from_env())?;
//! let handle = bridge.connect().await?;
//! let bootstrap = ServiceBootstrap::new(&handle, BootstrapConfig::default());
//! let session = bootstrap.start(BootstrapRequest::capture("emulator-5554", 80)).await?;
//! ```

pub mod bootstrap;
pub mod device;
pub mod error;
pub mod parse;

pub use bootstrap::{
	ABI_PROPERTY, API_LEVEL_PROPERTY, ArtifactLayout, BootstrapConfig, BootstrapRequest, BootstrapStage, DEFAULT_QUALITY,
	ServiceBootstrap, ServiceSession, SessionEnd, SessionState, select_artifacts,
};
pub use device::DeviceActions;
pub use droidbridge_protocol::{ArtifactSet, DeviceHandle, DeviceState, ForwardBinding, ServiceArtifact, ServiceKind};
pub use droidbridge_runtime::{Bridge, BridgeConfig, BridgeHandle, CommandFault, ForwardFault};
pub use error::{BootstrapError, Result};
pub use parse::{UNKNOWN_SIZE, parse_app_version, parse_screen_size};
