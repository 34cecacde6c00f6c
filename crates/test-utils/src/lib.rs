pub mod builders;
pub mod fake_launcher;

use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use backend_bridge::bridge::BridgeEvent;
use backend_bridge::exec::OutputCallback;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

pub use fake_launcher::{FakeLauncher, FakeProcessHandle, FakeScript, SIGKILL, SIGTERM};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Collects the chunks handed to an output callback.
#[derive(Clone, Default)]
pub struct OutputRecorder {
    chunks: Arc<Mutex<Vec<String>>>,
}

impl OutputRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> OutputCallback {
        let chunks = Arc::clone(&self.chunks);
        Arc::new(move |chunk: &str| {
            chunks.lock().unwrap().push(chunk.to_string());
        })
    }

    /// Every callback invocation, verbatim.
    pub fn chunks(&self) -> Vec<String> {
        self.chunks.lock().unwrap().clone()
    }

    /// All received text.
    pub fn text(&self) -> String {
        self.chunks().concat()
    }

    /// Received text split into lines, however it was chunked.
    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }

    /// Poll until at least `n` callback invocations were recorded.
    pub async fn wait_for_chunks(&self, n: usize) -> Vec<String> {
        loop {
            let chunks = self.chunks();
            if chunks.len() >= n {
                return chunks;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Poll until at least `n` lines were recorded.
    pub async fn wait_for_lines(&self, n: usize) -> Vec<String> {
        loop {
            let lines = self.lines();
            if lines.len() >= n {
                return lines;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// Receive events until one matches `pred`.
pub async fn next_event_matching<P>(
    rx: &mut broadcast::Receiver<BridgeEvent>,
    mut pred: P,
) -> BridgeEvent
where
    P: FnMut(&BridgeEvent) -> bool,
{
    loop {
        match rx.recv().await {
            Ok(event) if pred(&event) => return event,
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => panic!("bridge event channel closed"),
        }
    }
}
