use std::sync::Arc;
use std::time::Duration;

use droidbridge::{
	ABI_PROPERTY, API_LEVEL_PROPERTY, BootstrapConfig, BootstrapError, BootstrapRequest, Bridge, BridgeConfig, DeviceHandle,
	DeviceState, ServiceBootstrap, ServiceKind, SessionEnd, SessionState,
};
use droidbridge_runtime::testing::{CallKind, FakeTransport, ShellRecord};
use tokio_util::sync::CancellationToken;

const SERIAL: &str = "ABC123";
const POLL: Duration = Duration::from_millis(50);

fn device(abi: &str, sdk: &str) -> FakeTransport {
	FakeTransport::new()
		.with_device(DeviceHandle::new(SERIAL, DeviceState::Online))
		.with_property(SERIAL, ABI_PROPERTY, abi)
		.with_property(SERIAL, API_LEVEL_PROPERTY, sdk)
		.with_response("wm size", "Physical size: 1080x1920\r\n")
}

async fn bootstrap_for(fake: &Arc<FakeTransport>, config: BootstrapConfig) -> ServiceBootstrap {
	let bridge = Bridge::new(
		fake.clone(),
		BridgeConfig::default().with_enumeration(Duration::from_millis(5), 10),
	);
	let handle = bridge.connect().await.unwrap();
	ServiceBootstrap::new(&handle, config)
}

fn fast_config() -> BootstrapConfig {
	BootstrapConfig::default()
		.with_presence_poll(POLL)
		.with_presence_timeout(Duration::from_secs(5))
}

async fn wait_for_launch(fake: &FakeTransport) -> ShellRecord {
	for _ in 0..200 {
		if let Some(record) = fake.shell_log().into_iter().find(|r| r.kind == CallKind::Stream) {
			return record;
		}
		tokio::time::sleep(Duration::from_millis(5)).await;
	}
	panic!("service was never launched");
}

fn is_listing(record: &ShellRecord) -> bool {
	record.command == "ls /data/local/tmp"
}

#[tokio::test]
async fn capture_launches_only_after_artifacts_appear() {
	let fake = Arc::new(device("arm64-v8a", "29").with_push_delay(Duration::from_millis(150)));
	let stream = fake.stream_for("LD_LIBRARY_PATH=");
	let bootstrap = bootstrap_for(&fake, fast_config()).await;

	let mut session = bootstrap.start(BootstrapRequest::capture(SERIAL, 60)).await.unwrap();
	let launch = wait_for_launch(&fake).await;

	assert_eq!(
		launch.command,
		"LD_LIBRARY_PATH=/data/local/tmp /data/local/tmp/minicap -Q 60 -P 1080x1920@1080x1920/0"
	);
	assert_eq!(session.command(), launch.command);

	let log = fake.shell_log();
	let listings: Vec<_> = log.iter().filter(|r| is_listing(r)).collect();
	assert!(listings.len() >= 2, "expected the listing to be polled, got {listings:?}");
	let converged = listings.last().unwrap();
	assert!(converged.output.lines().any(|l| l == "minicap"));
	assert!(converged.output.lines().any(|l| l == "minicap.so"));
	for early in &listings[..listings.len() - 1] {
		let complete = early.output.lines().any(|l| l == "minicap") && early.output.lines().any(|l| l == "minicap.so");
		assert!(!complete);
	}

	assert!(launch.at >= converged.at);
	assert!(launch.at.duration_since(converged.at) < POLL);

	let commands: Vec<_> = log.iter().filter(|r| !is_listing(r)).map(|r| r.command.as_str()).collect();
	assert_eq!(
		commands,
		vec![
			"rm -rf /data/local/tmp/minicap*",
			"chmod 777 /data/local/tmp/minicap",
			"wm size",
			launch.command.as_str(),
		]
	);

	let pushes = fake.pushes();
	let mut remotes: Vec<_> = pushes.iter().map(|p| p.remote.as_str()).collect();
	remotes.sort_unstable();
	assert_eq!(remotes, vec!["/data/local/tmp/minicap", "/data/local/tmp/minicap.so"]);

	assert!(session.is_active());
	drop(stream);
	assert_eq!(session.wait().await, SessionEnd::RemoteExited);
	assert_eq!(session.state(), SessionState::Ended(SessionEnd::RemoteExited));
}

#[tokio::test]
async fn input_on_legacy_device_uses_nopie_build() {
	let fake = Arc::new(device("armeabi-v7a", "15"));
	let bootstrap = bootstrap_for(&fake, fast_config()).await;

	let session = bootstrap.start(BootstrapRequest::input(SERIAL)).await.unwrap();
	let launch = wait_for_launch(&fake).await;

	assert_eq!(launch.command, "/data/local/tmp/minitouch-nopie");
	assert_eq!(session.artifacts().binary.name, "minitouch-nopie");
	assert!(session.artifacts().library.is_none());
	assert_eq!(fake.pushes()[0].local.to_str(), Some("mini/armeabi-v7a/minitouch-nopie"));
	assert!(fake.commands_for(SERIAL).contains(&"chmod 777 /data/local/tmp/minitouch-nopie".to_string()));
}

#[tokio::test]
async fn clean_removes_stale_files_before_push() {
	let fake = Arc::new(device("x86", "30"));
	fake.stage_file(SERIAL, "minitouch-old");
	fake.stage_file(SERIAL, "minicap");
	let bootstrap = bootstrap_for(&fake, fast_config()).await;

	bootstrap.start(BootstrapRequest::input(SERIAL)).await.unwrap();

	assert_eq!(fake.staged(SERIAL), vec!["minicap", "minitouch"]);
}

#[tokio::test]
async fn request_stop_detaches_without_further_commands() {
	let fake = Arc::new(device("x86_64", "33"));
	let _stream = fake.stream_for("/data/local/tmp/minitouch");
	let bootstrap = bootstrap_for(&fake, fast_config()).await;

	let mut session = bootstrap.start(BootstrapRequest::input(SERIAL)).await.unwrap();
	wait_for_launch(&fake).await;
	let issued = fake.shell_log().len();

	session.request_stop();
	assert_eq!(session.wait().await, SessionEnd::Detached);
	assert!(!session.is_active());

	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(fake.shell_log().len(), issued);
}

#[tokio::test]
async fn cancelling_request_token_detaches_running_session() {
	let fake = Arc::new(device("x86_64", "33"));
	let cancel = CancellationToken::new();
	let bootstrap = bootstrap_for(&fake, fast_config()).await;

	let mut session = bootstrap
		.start(BootstrapRequest::input(SERIAL).with_cancel(cancel.clone()))
		.await
		.unwrap();
	cancel.cancel();

	assert_eq!(session.wait().await, SessionEnd::Detached);
}

#[tokio::test]
async fn second_start_while_active_is_rejected() {
	let fake = Arc::new(device("arm64-v8a", "31"));
	let stream = fake.stream_for("/data/local/tmp/minitouch");
	let bootstrap = bootstrap_for(&fake, fast_config()).await;

	let mut first = bootstrap.start(BootstrapRequest::input(SERIAL)).await.unwrap();
	let err = bootstrap.start(BootstrapRequest::input(SERIAL)).await.unwrap_err();
	assert_eq!(
		err,
		BootstrapError::AlreadyActive {
			serial: SERIAL.to_string(),
			kind: ServiceKind::Input,
		}
	);

	// Capture on the same device is independent.
	let capture = bootstrap.start(BootstrapRequest::capture(SERIAL, 80)).await.unwrap();
	assert!(capture.is_active());

	drop(stream);
	first.wait().await;
	let again = bootstrap.start(BootstrapRequest::input(SERIAL)).await.unwrap();
	assert!(again.is_active());
}

#[tokio::test]
async fn concurrent_starts_for_same_pair_are_serialized() {
	let fake = Arc::new(device("arm64-v8a", "31").with_push_delay(Duration::from_millis(60)));
	let bootstrap = bootstrap_for(&fake, fast_config()).await;

	let (a, b) = tokio::join!(
		bootstrap.start(BootstrapRequest::input(SERIAL)),
		bootstrap.start(BootstrapRequest::input(SERIAL)),
	);

	let outcomes = [a.is_ok(), b.is_ok()];
	assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
	let rejected = a.err().or(b.err()).unwrap();
	assert!(matches!(rejected, BootstrapError::AlreadyActive { .. }));
	assert_eq!(fake.pushes().len(), 1);
}

#[tokio::test]
async fn missing_artifacts_stall_after_timeout() {
	let fake = Arc::new(device("x86", "30").with_failing_pushes());
	let config = fast_config().with_presence_timeout(Duration::from_millis(150));
	let bootstrap = bootstrap_for(&fake, config).await;

	let err = bootstrap.start(BootstrapRequest::input(SERIAL)).await.unwrap_err();
	match err {
		BootstrapError::ConvergenceStall { serial, missing, waited } => {
			assert_eq!(serial, SERIAL);
			assert_eq!(missing, vec!["minitouch"]);
			assert!(waited >= Duration::from_millis(150));
		}
		other => panic!("unexpected error: {other:?}"),
	}
	assert!(fake.shell_log().iter().all(|r| r.kind == CallKind::Shell));
}

#[tokio::test]
async fn cancel_during_presence_poll_stops_issuing_commands() {
	let fake = Arc::new(device("x86", "30").with_push_delay(Duration::from_secs(10)));
	let cancel = CancellationToken::new();
	let bootstrap = bootstrap_for(&fake, fast_config()).await;

	let task = {
		let bootstrap = bootstrap.clone();
		let request = BootstrapRequest::input(SERIAL).with_cancel(cancel.clone());
		tokio::spawn(async move { bootstrap.start(request).await })
	};
	tokio::time::sleep(Duration::from_millis(120)).await;
	cancel.cancel();

	let err = task.await.unwrap().unwrap_err();
	assert!(matches!(err, BootstrapError::Cancelled { .. }));

	let issued = fake.shell_log().len();
	tokio::time::sleep(POLL * 3).await;
	assert_eq!(fake.shell_log().len(), issued);
	assert!(fake.shell_log().iter().all(|r| r.kind == CallKind::Shell));
}

#[tokio::test]
async fn device_vanishing_during_poll_is_unavailable() {
	let fake = Arc::new(device("x86", "30").with_push_delay(Duration::from_secs(10)));
	let bootstrap = bootstrap_for(&fake, fast_config()).await;

	let task = {
		let bootstrap = bootstrap.clone();
		tokio::spawn(async move { bootstrap.start(BootstrapRequest::input(SERIAL)).await })
	};
	tokio::time::sleep(Duration::from_millis(80)).await;
	fake.set_devices(vec![]);

	let err = task.await.unwrap().unwrap_err();
	assert!(err.is_device_unavailable());
}

#[tokio::test]
async fn unknown_serial_is_unavailable() {
	let fake = Arc::new(device("x86", "30"));
	let bootstrap = bootstrap_for(&fake, fast_config()).await;

	let err = bootstrap.start(BootstrapRequest::input("NOPE")).await.unwrap_err();
	assert!(err.is_device_unavailable());
	assert!(fake.shell_log().is_empty());
}

#[tokio::test]
async fn missing_abi_is_a_capability_error() {
	let fake = Arc::new(
		FakeTransport::new()
			.with_device(DeviceHandle::new(SERIAL, DeviceState::Online))
			.with_property(SERIAL, API_LEVEL_PROPERTY, "30"),
	);
	let bootstrap = bootstrap_for(&fake, fast_config()).await;

	let err = bootstrap.start(BootstrapRequest::input(SERIAL)).await.unwrap_err();
	assert!(matches!(err, BootstrapError::Capability { property: ABI_PROPERTY, .. }));
	assert!(fake.pushes().is_empty());
}

#[tokio::test]
async fn unparseable_api_level_is_a_capability_error() {
	let fake = Arc::new(device("x86", "UpsideDownCake"));
	let bootstrap = bootstrap_for(&fake, fast_config()).await;

	let err = bootstrap.start(BootstrapRequest::input(SERIAL)).await.unwrap_err();
	assert_eq!(
		err,
		BootstrapError::Capability {
			serial: SERIAL.to_string(),
			property: API_LEVEL_PROPERTY,
			value: Some("UpsideDownCake".to_string()),
		}
	);
}

#[tokio::test]
async fn unknown_screen_size_aborts_before_launch() {
	let fake = Arc::new(
		FakeTransport::new()
			.with_device(DeviceHandle::new(SERIAL, DeviceState::Online))
			.with_property(SERIAL, ABI_PROPERTY, "arm64-v8a")
			.with_property(SERIAL, API_LEVEL_PROPERTY, "29"),
	);
	let bootstrap = bootstrap_for(&fake, fast_config()).await;

	let err = bootstrap.start(BootstrapRequest::capture(SERIAL, 80)).await.unwrap_err();
	assert!(matches!(err, BootstrapError::ScreenSize { .. }));
	assert!(fake.shell_log().iter().all(|r| r.kind == CallKind::Shell));

	// A failed run leaves the pair free for a retry.
	let err = bootstrap.start(BootstrapRequest::capture(SERIAL, 80)).await.unwrap_err();
	assert!(matches!(err, BootstrapError::ScreenSize { .. }));
}

#[tokio::test]
async fn quality_above_hundred_is_rejected() {
	let fake = Arc::new(device("x86", "30"));
	let bootstrap = bootstrap_for(&fake, fast_config()).await;

	let err = bootstrap.start(BootstrapRequest::capture(SERIAL, 101)).await.unwrap_err();
	assert_eq!(err, BootstrapError::InvalidQuality(101));
	assert!(fake.shell_log().is_empty());
}
