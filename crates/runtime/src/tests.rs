use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use droidbridge_protocol::{DeviceHandle, DeviceState};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::testing::FakeTransport;
use crate::{Bridge, BridgeConfig, CommandFault, ForwardFault, PushPool, StreamEnd};

fn online(serial: &str) -> DeviceHandle {
	DeviceHandle::new(serial, DeviceState::Online)
}

fn fast_config() -> BridgeConfig {
	BridgeConfig::default().with_enumeration(Duration::from_millis(5), 10)
}

async fn connected(fake: Arc<FakeTransport>) -> crate::BridgeHandle {
	Bridge::new(fake, fast_config()).connect().await.unwrap()
}

#[tokio::test]
async fn connect_twice_starts_daemon_once() {
	let fake = Arc::new(FakeTransport::new().with_device(online("ABC123")));
	let bridge = Bridge::new(fake.clone(), fast_config());

	let first = bridge.connect().await.unwrap();
	let second = bridge.connect().await.unwrap();

	assert_eq!(fake.daemon_starts(), 1);
	assert_eq!(fake.listener_count(), 1);
	assert_eq!(first.devices(), second.devices());
	assert!(bridge.is_connected());
}

#[tokio::test]
async fn devices_empty_before_connect() {
	let fake = Arc::new(FakeTransport::new().with_device(online("ABC123")));
	let bridge = Bridge::new(fake, fast_config());

	assert!(bridge.devices().is_empty());
	assert!(bridge.handle().is_none());

	bridge.connect().await.unwrap();
	assert_eq!(bridge.devices().len(), 1);
}

#[tokio::test]
async fn enumeration_timeout_continues_with_partial_list() {
	let fake = Arc::new(FakeTransport::new().with_device(online("ABC123")).without_initial_list());
	let bridge = Bridge::new(fake.clone(), BridgeConfig::default().with_enumeration(Duration::from_millis(1), 3));

	let handle = bridge.connect().await.unwrap();
	assert!(handle.devices().is_empty());

	// Late presence updates still reach the snapshot.
	fake.set_devices(vec![online("ABC123")]);
	assert_eq!(handle.devices().len(), 1);
}

#[tokio::test]
async fn failed_start_leaves_bridge_disconnected_and_retryable() {
	let fake = Arc::new(FakeTransport::new().with_failing_start());
	let bridge = Bridge::new(fake.clone(), fast_config());

	let err = bridge.connect().await.err().unwrap();
	assert!(matches!(err, crate::Error::DaemonStart(_)));
	assert!(!bridge.is_connected());

	let _ = bridge.connect().await;
	assert_eq!(fake.daemon_starts(), 2);
	assert_eq!(fake.listener_count(), 1);
}

#[tokio::test]
async fn presence_updates_flow_into_registry() {
	let fake = Arc::new(FakeTransport::new());
	let handle = connected(fake.clone()).await;
	let registry = handle.registry();
	assert!(registry.lookup("ABC123").is_none());

	fake.set_devices(vec![online("ABC123")]);
	assert!(registry.lookup("ABC123").is_some());

	fake.set_devices(vec![]);
	assert!(registry.lookup("ABC123").is_none());
}

#[tokio::test]
async fn run_returns_output_for_online_device() {
	let fake = Arc::new(FakeTransport::new().with_device(online("ABC123")).with_response("echo hi", "hi\n"));
	let handle = connected(fake).await;
	let device = handle.registry().require("ABC123").unwrap();

	assert_eq!(handle.commands().run(&device, "echo hi").await, "hi\n");
}

#[tokio::test]
async fn run_swallows_fault_after_detach() {
	let fake = Arc::new(FakeTransport::new().with_device(online("ABC123")));
	let handle = connected(fake.clone()).await;
	let device = handle.registry().require("ABC123").unwrap();

	fake.set_devices(vec![]);
	let channel = handle.commands();
	assert_eq!(channel.run(&device, "echo hi").await, "");
	assert_eq!(
		channel.try_run(&device, "echo hi").await,
		Err(CommandFault::DeviceUnavailable {
			serial: "ABC123".to_string()
		})
	);
	assert!(fake.commands_for("ABC123").is_empty());
}

#[tokio::test]
async fn property_reads_scripted_value() {
	let fake = Arc::new(
		FakeTransport::new()
			.with_device(online("ABC123"))
			.with_property("ABC123", "ro.product.cpu.abi", "arm64-v8a"),
	);
	let handle = connected(fake).await;
	let device = handle.registry().require("ABC123").unwrap();
	let channel = handle.commands();

	assert_eq!(channel.property(&device, "ro.product.cpu.abi").await.as_deref(), Some("arm64-v8a"));
	assert_eq!(channel.property(&device, "ro.build.version.sdk").await, None);
}

#[tokio::test]
async fn streaming_delivers_chunks_until_remote_closes() {
	let fake = Arc::new(FakeTransport::new().with_device(online("ABC123")));
	let tx = fake.stream_for("logcat");
	let handle = connected(fake).await;
	let device = handle.registry().require("ABC123").unwrap();

	tx.send(Bytes::from_static(b"one\n")).unwrap();
	tx.send(Bytes::from_static(b"two\n")).unwrap();
	drop(tx);

	let received = Arc::new(Mutex::new(Vec::new()));
	let sink = {
		let received = Arc::clone(&received);
		move |chunk: &[u8]| received.lock().extend_from_slice(chunk)
	};
	let end = handle.commands().run_streaming(&device, "logcat", sink, &CancellationToken::new()).await;

	assert_eq!(end, StreamEnd::Closed);
	assert_eq!(received.lock().as_slice(), b"one\ntwo\n");
}

#[tokio::test]
async fn streaming_stops_delivering_after_cancel() {
	let fake = Arc::new(FakeTransport::new().with_device(online("ABC123")));
	let tx = fake.stream_for("logcat");
	let handle = connected(fake.clone()).await;
	let device = handle.registry().require("ABC123").unwrap();

	let received = Arc::new(Mutex::new(Vec::<u8>::new()));
	let sink = {
		let received = Arc::clone(&received);
		move |chunk: &[u8]| received.lock().extend_from_slice(chunk)
	};
	let cancel = CancellationToken::new();
	let task = {
		let channel = handle.commands();
		let cancel = cancel.clone();
		tokio::spawn(async move { channel.run_streaming(&device, "logcat", sink, &cancel).await })
	};

	tx.send(Bytes::from_static(b"before")).unwrap();
	while received.lock().is_empty() {
		tokio::time::sleep(Duration::from_millis(1)).await;
	}
	cancel.cancel();
	assert_eq!(task.await.unwrap(), StreamEnd::Cancelled);

	let _ = tx.send(Bytes::from_static(b"after"));
	tokio::time::sleep(Duration::from_millis(10)).await;
	assert_eq!(received.lock().as_slice(), b"before");
	assert_eq!(fake.commands_for("ABC123"), vec!["logcat"]);
}

#[tokio::test]
async fn streaming_refused_for_offline_device() {
	let fake = Arc::new(FakeTransport::new().with_device(DeviceHandle::new("ABC123", DeviceState::Offline)));
	let handle = connected(fake).await;
	let device = DeviceHandle::new("ABC123", DeviceState::Offline);

	let end = handle.commands().run_streaming(&device, "logcat", |_: &[u8]| {}, &CancellationToken::new()).await;
	assert!(matches!(end, StreamEnd::Failed(fault) if fault.is_device_unavailable()));
}

#[tokio::test]
async fn forward_create_and_remove() {
	let fake = Arc::new(FakeTransport::new().with_device(online("ABC123")));
	let handle = connected(fake.clone()).await;
	let device = handle.registry().require("ABC123").unwrap();
	let forwards = handle.forwards();

	let binding = forwards.create(&device, 1717, "minicap").await.unwrap();
	assert_eq!(binding.local_spec(), "tcp:1717");
	assert_eq!(binding.remote_spec(), "localabstract:minicap");
	assert_eq!(fake.forwards().len(), 1);

	forwards.remove(&device, 1717, "minicap").await.unwrap();
	assert!(fake.forwards().is_empty());
}

#[tokio::test]
async fn forward_on_busy_port_is_rejected() {
	let fake = Arc::new(FakeTransport::new().with_device(online("ABC123")).with_busy_port(1717));
	let handle = connected(fake).await;
	let device = handle.registry().require("ABC123").unwrap();

	let fault = handle.forwards().create(&device, 1717, "minicap").await.unwrap_err();
	assert!(matches!(fault, ForwardFault::Rejected { .. }));
}

#[tokio::test]
async fn forward_removal_of_unknown_binding_is_rejected() {
	let fake = Arc::new(FakeTransport::new().with_device(online("ABC123")));
	let handle = connected(fake).await;
	let device = handle.registry().require("ABC123").unwrap();

	let fault = handle.forwards().remove(&device, 1718, "minitouch").await.unwrap_err();
	assert!(matches!(fault, ForwardFault::Rejected { .. }));
}

#[tokio::test]
async fn forward_to_detached_device_is_unavailable() {
	let fake = Arc::new(FakeTransport::new().with_device(online("ABC123")));
	let handle = connected(fake.clone()).await;
	let device = handle.registry().require("ABC123").unwrap();
	fake.set_devices(vec![]);

	let fault = handle.forwards().create(&device, 1717, "minicap").await.unwrap_err();
	assert_eq!(
		fault,
		ForwardFault::DeviceUnavailable {
			serial: "ABC123".to_string()
		}
	);
}

#[tokio::test]
async fn push_dispatch_returns_before_transfer_lands() {
	let fake = Arc::new(
		FakeTransport::new()
			.with_device(online("ABC123"))
			.with_push_delay(Duration::from_millis(50)),
	);
	let handle = connected(fake.clone()).await;
	let pool = PushPool::new(handle.transport(), 2);

	let task = pool.dispatch("ABC123", "mini/arm64-v8a/minitouch", "/data/local/tmp/minitouch");
	assert!(fake.staged("ABC123").is_empty());

	task.await.unwrap().unwrap();
	assert_eq!(fake.staged("ABC123"), vec!["minitouch"]);
}

#[tokio::test]
async fn push_pool_bounds_concurrency() {
	let fake = Arc::new(
		FakeTransport::new()
			.with_device(online("ABC123"))
			.with_push_delay(Duration::from_millis(30)),
	);
	let handle = connected(fake.clone()).await;
	let pool = PushPool::new(handle.transport(), 1);

	let a = pool.dispatch("ABC123", "a", "/data/local/tmp/a");
	let b = pool.dispatch("ABC123", "b", "/data/local/tmp/b");
	a.await.unwrap().unwrap();
	b.await.unwrap().unwrap();

	let pushes = fake.pushes();
	assert_eq!(pushes.len(), 2);
	assert!(pushes[1].dispatched_at >= pushes[0].landed_at.unwrap());
	assert_eq!(pool.available(), 1);
}

#[tokio::test]
async fn push_failure_is_reported_through_handle() {
	let fake = Arc::new(FakeTransport::new().with_device(online("ABC123")).with_failing_pushes());
	let handle = connected(fake.clone()).await;
	let pool = PushPool::new(handle.transport(), 2);

	let result = pool.dispatch("ABC123", "a", "/data/local/tmp/a").await.unwrap();
	assert!(result.is_err());
	assert!(fake.staged("ABC123").is_empty());
}
