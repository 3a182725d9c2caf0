//! Command implementations.
//!
//! Each command takes a connected [`BridgeHandle`] and returns a
//! [`CommandOutput`]; [`dispatch`] owns connecting and printing.

mod device;
mod devices;
mod forward;
mod shell;
mod start;


use std::time::{Duration, Instant};

use droidbridge::{BootstrapConfig, Bridge, BridgeConfig, BridgeHandle};
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::output::{self, OutputFormat};

pub use device::{key, reboot, version};
pub use devices::devices;
pub use forward::forward;
pub use shell::shell;
pub use start::{StartReport, start};

pub async fn dispatch(cli: Cli, format: OutputFormat) -> Result<()> {
	let started = Instant::now();
	let bridge_config = BridgeConfig::from_env().with_daemon_path(cli.adb.clone());
	let bridge = Bridge::adb(bridge_config)?;
	let handle = bridge.connect().await?;
	debug!(target: "droidbridge.cli", devices = handle.devices().len(), "bridge connected");

	match cli.command {
		Commands::Devices => output::emit(devices(&handle), started, format),
		Commands::Shell(args) => output::emit(shell(&handle, &args).await?, started, format),
		Commands::Forward(args) => output::emit(forward(&handle, &args).await?, started, format),
		Commands::Start(action) => {
			let config = BootstrapConfig::default()
				.with_artifact_root(&cli.artifacts)
				.with_presence_timeout(Duration::from_secs(cli.deploy_timeout));
			let shutdown = async {
				if let Err(e) = tokio::signal::ctrl_c().await {
					debug!(target: "droidbridge.cli", error = %e, "ctrl-c handler unavailable");
					std::future::pending::<()>().await;
				}
			};
			output::emit(start(&handle, config, &action, shutdown).await?, started, format)
		}
		Commands::Version(args) => output::emit(version(&handle, &args).await?, started, format),
		Commands::Reboot(args) => output::emit(reboot(&handle, &args).await?, started, format),
		Commands::Key(args) => output::emit(key(&handle, &args).await?, started, format),
	}
	Ok(())
}

fn require(handle: &BridgeHandle, serial: &str) -> Result<droidbridge::DeviceHandle> {
	handle.registry().require(serial).map_err(CliError::from)
}
