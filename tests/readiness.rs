mod common;
use crate::common::{
    fake_bridge, init_tracing, next_event_matching, with_timeout, OutputRecorder, TestResult,
};

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use backend_bridge::bridge::BridgeEvent;
use backend_bridge::errors::BridgeError;
use backend_bridge::types::ReadyProbeKind;
use backend_bridge_test_utils::builders::ConfigFileBuilder;
use backend_bridge_test_utils::{FakeLauncher, FakeScript};

#[tokio::test]
async fn first_output_marks_ready() -> TestResult {
    init_tracing();

    let launcher = FakeLauncher::with_default(FakeScript::new().stdout("Loading AI model..."));
    let bridge = fake_bridge(ConfigFileBuilder::new().build(), &launcher);
    let recorder = OutputRecorder::new();

    bridge.start_and_wait_ready(Some(recorder.callback())).await?;

    // The callback has seen the line that made the backend ready.
    assert_eq!(recorder.lines(), vec!["Loading AI model...".to_string()]);

    bridge.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn first_output_fires_on_a_chunk_without_newline() -> TestResult {
    init_tracing();

    let launcher =
        FakeLauncher::with_default(FakeScript::new().stdout_raw("Loading AI model... 12%"));
    let bridge = fake_bridge(ConfigFileBuilder::new().build(), &launcher);
    let recorder = OutputRecorder::new();

    bridge.start_and_wait_ready(Some(recorder.callback())).await?;
    assert_eq!(recorder.chunks(), vec!["Loading AI model... 12%".to_string()]);

    bridge.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn stderr_output_does_not_count_as_ready() -> TestResult {
    init_tracing();

    let launcher = FakeLauncher::with_default(FakeScript::new().stderr("noise"));
    let cfg = ConfigFileBuilder::new().startup_timeout("100ms").build();
    let bridge = fake_bridge(cfg, &launcher);

    bridge.start(None)?;
    let err = bridge.wait_ready().await.unwrap_err();
    assert!(matches!(err, BridgeError::StartupTimeout(d) if d == Duration::from_millis(100)));

    bridge.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn stdout_pattern_waits_for_matching_line() -> TestResult {
    init_tracing();

    let launcher = FakeLauncher::with_default(
        FakeScript::new()
            .stdout("Loading AI model...")
            .stdout(" * Running on http://127.0.0.1:5000"),
    );
    let cfg = ConfigFileBuilder::new()
        .probe(ReadyProbeKind::StdoutPattern)
        .pattern(r"Running on http://")
        .build();
    let bridge = fake_bridge(cfg, &launcher);
    let mut events = bridge.subscribe();
    let recorder = OutputRecorder::new();

    bridge.start(Some(recorder.callback()))?;
    with_timeout(bridge.wait_ready()).await?;

    assert_eq!(recorder.lines().len(), 2);

    with_timeout(next_event_matching(&mut events, |e| {
        matches!(e, BridgeEvent::Ready { session: 1 })
    }))
    .await;

    bridge.shutdown().await?;

    // No second Ready for the same session.
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, BridgeEvent::Ready { .. }), "{event:?}");
    }
    Ok(())
}

#[tokio::test]
async fn unmatched_pattern_times_out() -> TestResult {
    init_tracing();

    let launcher = FakeLauncher::with_default(FakeScript::new().stdout("still loading"));
    let cfg = ConfigFileBuilder::new()
        .probe(ReadyProbeKind::StdoutPattern)
        .pattern("^READY$")
        .startup_timeout("100ms")
        .build();
    let bridge = fake_bridge(cfg, &launcher);

    bridge.start(None)?;
    let err = with_timeout(bridge.wait_ready()).await.unwrap_err();
    assert!(matches!(err, BridgeError::StartupTimeout(_)), "{err:?}");

    // The backend itself is left running.
    assert!(bridge.is_running());

    bridge.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn exit_before_ready_is_reported() -> TestResult {
    init_tracing();

    let launcher = FakeLauncher::with_default(
        FakeScript::new()
            .stderr("OSError: [Errno 98] Address already in use")
            .exit_after_output(1),
    );
    let bridge = fake_bridge(ConfigFileBuilder::new().build(), &launcher);

    bridge.start(None)?;
    let err = with_timeout(bridge.wait_ready()).await.unwrap_err();

    // Depending on timing the slot may already be cleared.
    match err {
        BridgeError::ExitedDuringStartup(exit) => assert_eq!(exit.code, Some(1)),
        BridgeError::NotRunning => {}
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn wait_ready_without_backend_fails() {
    init_tracing();

    let launcher = FakeLauncher::new();
    let bridge = fake_bridge(ConfigFileBuilder::new().build(), &launcher);

    let err = bridge.wait_ready().await.unwrap_err();
    assert!(matches!(err, BridgeError::NotRunning));
}

#[tokio::test]
async fn tcp_probe_waits_for_listener() -> TestResult {
    init_tracing();

    // Reserve a port, then release it so the "backend" can bind later.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        listener.local_addr()?.port()
    };

    let launcher = FakeLauncher::with_default(FakeScript::new().stdout("booting"));
    let cfg = ConfigFileBuilder::new()
        .port(port)
        .probe(ReadyProbeKind::Tcp)
        .build();
    let bridge = fake_bridge(cfg, &launcher);

    bridge.start(None)?;

    // Stdout alone is not enough for a network probe.
    let early = tokio::time::timeout(Duration::from_millis(100), bridge.wait_ready()).await;
    assert!(early.is_err(), "ready before anything listened");

    let _listener = TcpListener::bind(("127.0.0.1", port)).await?;
    with_timeout(bridge.wait_ready()).await?;

    bridge.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn http_probe_requires_success_status() -> TestResult {
    init_tracing();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();

    // Answer 503 twice, then 200.
    tokio::spawn(async move {
        let mut served = 0;
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;

            let status = if served < 2 {
                "503 Service Unavailable"
            } else {
                "200 OK"
            };
            served += 1;

            let body = r#"{"status":"ok"}"#;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    let launcher = FakeLauncher::new();
    let cfg = ConfigFileBuilder::new()
        .port(port)
        .probe(ReadyProbeKind::Http)
        .health_path("/health")
        .build();
    let bridge = fake_bridge(cfg, &launcher);
    let mut events = bridge.subscribe();

    bridge.start(None)?;
    with_timeout(bridge.wait_ready()).await?;

    with_timeout(next_event_matching(&mut events, |e| {
        matches!(e, BridgeEvent::Ready { .. })
    }))
    .await;

    bridge.shutdown().await?;
    Ok(())
}
