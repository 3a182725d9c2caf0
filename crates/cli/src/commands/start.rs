use std::future::Future;

use droidbridge::{BootstrapConfig, BootstrapRequest, BridgeHandle, ServiceBootstrap, ServiceKind, SessionEnd};
use serde::Serialize;
use tracing::info;

use crate::cli::StartAction;
use crate::error::Result;
use crate::output::CommandOutput;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartReport {
	pub serial: String,
	pub service: ServiceKind,
	pub command: String,
	pub artifacts: Vec<String>,
	pub end: String,
}

fn describe(end: &SessionEnd) -> String {
	match end {
		SessionEnd::Detached => "detached".to_string(),
		SessionEnd::RemoteExited => "remote-exited".to_string(),
		SessionEnd::Failed(fault) => format!("failed: {fault}"),
	}
}

/// Bootstraps the service and streams its output until it exits or
/// `shutdown` resolves.
pub async fn start<F>(handle: &BridgeHandle, config: BootstrapConfig, action: &StartAction, shutdown: F) -> Result<CommandOutput<StartReport>>
where
	F: Future<Output = ()>,
{
	let request = match action {
		StartAction::Capture(args) => BootstrapRequest::capture(&args.serial, args.quality).with_rotation(args.rotation),
		StartAction::Input(args) => BootstrapRequest::input(&args.serial),
	};

	let bootstrap = ServiceBootstrap::new(handle, config);
	let mut session = bootstrap.start(request).await?;
	info!(
		target: "droidbridge.cli",
		serial = session.serial(),
		service = %session.kind(),
		"service running; press Ctrl-C to detach"
	);

	let end = tokio::select! {
		end = session.wait() => end,
		_ = shutdown => {
			session.request_stop();
			session.wait().await
		}
	};

	let report = StartReport {
		serial: session.serial().to_string(),
		service: session.kind(),
		command: session.command().to_string(),
		artifacts: session.artifacts().iter().map(|a| a.name.clone()).collect(),
		end: describe(&end),
	};
	let text = format!("{} on {} ended: {}\n", report.service, report.serial, report.end);
	Ok(CommandOutput::new("start", report).with_text(text))
}
