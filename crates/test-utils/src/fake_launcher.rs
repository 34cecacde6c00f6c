use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::watch;

use backend_bridge::errors::{BridgeError, Result};
use backend_bridge::exec::{LaunchedProcess, Launcher, OutputStream, ProcessControl};
use backend_bridge::launch::LaunchSpec;
use backend_bridge::types::ExitInfo;

pub const SIGTERM: i32 = 15;
pub const SIGKILL: i32 = 9;

#[derive(Debug, Clone)]
enum Step {
    Stdout(String),
    Stderr(String),
    Pause(Duration),
}

/// What a simulated child does once launched.
///
/// Output steps are written in the order they were added.
#[derive(Debug, Clone, Default)]
pub struct FakeScript {
    steps: Vec<Step>,
    exit_code: Option<i32>,
    ignore_terminate: bool,
    fail_spawn: bool,
}

impl FakeScript {
    /// A child with no output that runs until stopped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `line` plus a newline to stdout.
    pub fn stdout(mut self, line: &str) -> Self {
        self.steps.push(Step::Stdout(format!("{line}\n")));
        self
    }

    /// Write `chunk` to stdout as is, without a newline.
    pub fn stdout_raw(mut self, chunk: &str) -> Self {
        self.steps.push(Step::Stdout(chunk.to_string()));
        self
    }

    pub fn stderr(mut self, line: &str) -> Self {
        self.steps.push(Step::Stderr(format!("{line}\n")));
        self
    }

    /// Sleep before the next step, so consecutive writes reach the reader
    /// as separate chunks.
    pub fn pause(mut self, duration: Duration) -> Self {
        self.steps.push(Step::Pause(duration));
        self
    }

    /// Exit on its own with `code` once all output is written.
    pub fn exit_after_output(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Survive the graceful signal; only a kill ends it.
    pub fn ignore_terminate(mut self) -> Self {
        self.ignore_terminate = true;
        self
    }

    /// Make the launch itself fail, like a missing interpreter.
    pub fn fail_spawn(mut self) -> Self {
        self.fail_spawn = true;
        self
    }
}

/// Shared view of one simulated process.
#[derive(Debug, Clone)]
pub struct FakeProcessHandle {
    pid: u32,
    exit_tx: Arc<watch::Sender<Option<ExitInfo>>>,
    terminate_calls: Arc<AtomicUsize>,
    kill_calls: Arc<AtomicUsize>,
}

impl FakeProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn terminate_calls(&self) -> usize {
        self.terminate_calls.load(Ordering::SeqCst)
    }

    pub fn kill_calls(&self) -> usize {
        self.kill_calls.load(Ordering::SeqCst)
    }

    pub fn exit_info(&self) -> Option<ExitInfo> {
        *self.exit_tx.borrow()
    }

    pub fn is_alive(&self) -> bool {
        self.exit_info().is_none()
    }

    /// Make the process die, as if it crashed.
    pub fn exit(&self, exit: ExitInfo) {
        self.exit_tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(exit);
                true
            } else {
                false
            }
        });
    }

    fn exit_code(&self, code: i32) {
        self.exit(ExitInfo {
            code: Some(code),
            signal: None,
        });
    }

    fn exit_signal(&self, signal: i32) {
        self.exit(ExitInfo {
            code: None,
            signal: Some(signal),
        });
    }
}

struct FakeControl {
    handle: FakeProcessHandle,
    ignore_terminate: bool,
}

impl ProcessControl for FakeControl {
    fn terminate(&mut self) -> Result<()> {
        self.handle.terminate_calls.fetch_add(1, Ordering::SeqCst);
        if !self.ignore_terminate {
            self.handle.exit_signal(SIGTERM);
        }
        Ok(())
    }

    fn kill(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.handle.kill_calls.fetch_add(1, Ordering::SeqCst);
            self.handle.exit_signal(SIGKILL);
            Ok(())
        })
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<ExitInfo>> + Send + '_>> {
        let mut rx = self.handle.exit_tx.subscribe();
        Box::pin(async move {
            let exit = rx
                .wait_for(|e| e.is_some())
                .await
                .map(|e| (*e).unwrap_or_default())
                .unwrap_or_default();
            Ok(exit)
        })
    }
}

#[derive(Default)]
struct LauncherState {
    scripts: VecDeque<FakeScript>,
    default_script: FakeScript,
    launched: Vec<LaunchSpec>,
    processes: Vec<FakeProcessHandle>,
    failed_spawns: usize,
}

/// A launcher producing simulated children instead of OS processes.
///
/// - Each launch consumes the next pushed [`FakeScript`], falling back to
///   the default script.
/// - Records every launched spec and keeps a handle per process so tests
///   can count spawns, terminations and kills, or crash a process.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    state: Arc<Mutex<LauncherState>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(script: FakeScript) -> Self {
        let launcher = Self::new();
        launcher.state.lock().unwrap().default_script = script;
        launcher
    }

    pub fn push_script(&self, script: FakeScript) {
        self.state.lock().unwrap().scripts.push_back(script);
    }

    /// Number of successful launches.
    pub fn spawn_count(&self) -> usize {
        self.state.lock().unwrap().processes.len()
    }

    pub fn failed_spawns(&self) -> usize {
        self.state.lock().unwrap().failed_spawns
    }

    pub fn launched_specs(&self) -> Vec<LaunchSpec> {
        self.state.lock().unwrap().launched.clone()
    }

    pub fn process(&self, index: usize) -> Option<FakeProcessHandle> {
        self.state.lock().unwrap().processes.get(index).cloned()
    }

    pub fn total_terminate_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.processes.iter().map(|p| p.terminate_calls()).sum()
    }

    pub fn total_kill_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.processes.iter().map(|p| p.kill_calls()).sum()
    }

    pub fn alive_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.processes.iter().filter(|p| p.is_alive()).count()
    }
}

impl Launcher for FakeLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<LaunchedProcess> {
        let mut state = self.state.lock().unwrap();
        let script = state
            .scripts
            .pop_front()
            .unwrap_or_else(|| state.default_script.clone());

        if script.fail_spawn {
            state.failed_spawns += 1;
            return Err(BridgeError::Spawn {
                program: spec.program.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "simulated missing interpreter"),
            });
        }

        let pid = 1000 + state.processes.len() as u32;
        let (exit_tx, _) = watch::channel(None);
        let handle = FakeProcessHandle {
            pid,
            exit_tx: Arc::new(exit_tx),
            terminate_calls: Arc::new(AtomicUsize::new(0)),
            kill_calls: Arc::new(AtomicUsize::new(0)),
        };

        let (mut out_w, out_r) = tokio::io::duplex(64 * 1024);
        let (mut err_w, err_r) = tokio::io::duplex(64 * 1024);

        let writer_handle = handle.clone();
        let FakeScript {
            steps,
            exit_code,
            ignore_terminate,
            ..
        } = script;

        tokio::spawn(async move {
            for step in steps {
                let written = match step {
                    Step::Stdout(text) => out_w.write_all(text.as_bytes()).await,
                    Step::Stderr(text) => err_w.write_all(text.as_bytes()).await,
                    Step::Pause(duration) => {
                        tokio::time::sleep(duration).await;
                        Ok(())
                    }
                };
                if written.is_err() {
                    break;
                }
            }

            match exit_code {
                Some(code) => writer_handle.exit_code(code),
                None => {
                    let mut rx = writer_handle.exit_tx.subscribe();
                    let _ = rx.wait_for(|e| e.is_some()).await;
                }
            }

            // A dead process closes its pipes.
            drop(out_w);
            drop(err_w);
        });

        state.launched.push(spec.clone());
        state.processes.push(handle.clone());

        Ok(LaunchedProcess {
            pid: Some(pid),
            stdout: Some(Box::new(out_r) as OutputStream),
            stderr: Some(Box::new(err_r) as OutputStream),
            control: Box::new(FakeControl {
                handle,
                ignore_terminate,
            }),
        })
    }
}
