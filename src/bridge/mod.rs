// src/bridge/mod.rs

//! The process bridge: owns at most one backend process.
//!
//! [`Bridge`] is the resource handed to UI-registration code. Its
//! mutators are `start` and `stop`; everything else observes. Per session
//! it runs:
//! - a stdout pump (logging, callback, stdout readiness),
//! - a stderr pump (logging only),
//! - an optional network readiness poller,
//! - a supervisor that reaps the child and moves the slot back to
//!   `Stopped` when the process dies on its own.
//!
//! The slot semantics live in the pure [`state::Slot`]; this module only
//! wires IO around it.

pub mod events;
pub mod state;

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::errors::{BridgeError, Result};
use crate::exec::{
    spawn_stderr_pump, spawn_stdout_pump, supervise, Launcher, OutputCallback, SupervisedExit,
    TokioLauncher,
};
use crate::launch::LaunchSpec;
use crate::ready::{spawn_network_probe, ReadySignal, Readiness};
use crate::types::{ExitInfo, SessionId, StartOutcome, StopOutcome};

pub use events::BridgeEvent;
pub use state::{ExitDecision, Slot, SlotState, StartDecision, StopDecision};

const EVENT_CAPACITY: usize = 64;

/// Runtime handles of the live session.
struct LiveSession {
    stop_tx: Option<oneshot::Sender<()>>,
    supervisor: JoinHandle<SupervisedExit>,
    ready_rx: watch::Receiver<Readiness>,
}

struct Inner {
    slot: Slot,
    live: Option<LiveSession>,
}

struct Shared {
    config: ConfigFile,
    spec: LaunchSpec,
    launcher: Arc<dyn Launcher>,
    inner: Mutex<Inner>,
    events: broadcast::Sender<BridgeEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Critical sections never panic mid-update; recover from poisoning.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn handle_exit(&self, session: SessionId, exit: SupervisedExit) {
        {
            let mut inner = self.lock();
            match inner.slot.on_exit(session) {
                ExitDecision::Cleared => {
                    inner.live = None;
                    info!(session, "backend exited on its own; bridge is stopped");
                }
                ExitDecision::Stale => {
                    debug!(session, "exit of a session that is no longer current");
                }
            }
        }

        let _ = self.events.send(BridgeEvent::Exited {
            session,
            exit: exit.exit,
            requested: exit.requested,
        });
    }
}

/// Owner of the backend process.
///
/// `start` and `stop` must be called from within a Tokio runtime. Dropping
/// the bridge stops the backend.
pub struct Bridge {
    shared: Arc<Shared>,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("spec", &self.shared.spec)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Bridge {
    /// Bridge spawning real processes for `spec`.
    pub fn new(config: ConfigFile, spec: LaunchSpec) -> Self {
        Self::with_launcher(config, spec, Arc::new(TokioLauncher))
    }

    /// Bridge for the app layout around `bridge_dir`, on the current OS.
    pub fn for_bridge_dir(config: ConfigFile, bridge_dir: impl AsRef<Path>) -> Self {
        let spec = LaunchSpec::for_current_os(&config, bridge_dir.as_ref());
        Self::new(config, spec)
    }

    pub fn with_launcher(config: ConfigFile, spec: LaunchSpec, launcher: Arc<dyn Launcher>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                config,
                spec,
                launcher,
                inner: Mutex::new(Inner {
                    slot: Slot::new(),
                    live: None,
                }),
                events,
            }),
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.shared.config
    }

    pub fn launch_spec(&self) -> &LaunchSpec {
        &self.shared.spec
    }

    /// Start the backend unless one is already running.
    ///
    /// Returns as soon as the process is spawned. Every stdout chunk is
    /// passed to `on_output`; stderr is only logged. A spawn failure is
    /// returned and leaves the bridge stopped.
    pub fn start(&self, on_output: Option<OutputCallback>) -> Result<StartOutcome> {
        let shared = &self.shared;

        // Held until the session is committed, so a process that exits
        // immediately cannot race its own registration.
        let mut inner = shared.lock();

        let session = match inner.slot.begin_start() {
            StartDecision::AlreadyRunning { session } => {
                debug!(session, "backend already running; start ignored");
                return Ok(StartOutcome::AlreadyRunning { session });
            }
            StartDecision::Spawn { session } => session,
        };

        info!(
            session,
            command = %shared.spec,
            cwd = %shared.spec.working_dir.display(),
            "starting backend"
        );

        let launched = shared.launcher.launch(&shared.spec)?;
        let pid = launched.pid;

        let _ = shared.events.send(BridgeEvent::Spawned { session, pid });

        let readiness = &shared.config.readiness;
        let (ready, ready_rx) = ReadySignal::new(session, shared.events.clone());

        if let Some(stdout) = launched.stdout {
            spawn_stdout_pump(stdout, on_output, readiness.probe.clone(), ready.clone());
        }
        if let Some(stderr) = launched.stderr {
            spawn_stderr_pump(session, stderr);
        }
        spawn_network_probe(
            &readiness.probe,
            &shared.config.backend.host,
            shared.config.backend.port,
            readiness.probe_interval,
            ready.clone(),
        );

        let (stop_tx, stop_rx) = oneshot::channel();
        let weak: Weak<Shared> = Arc::downgrade(shared);
        let shutdown = shared.config.shutdown;
        let control = launched.control;

        let supervisor = tokio::spawn(async move {
            let exit = supervise(session, control, stop_rx, shutdown).await;
            ready.mark_exited(exit.exit);
            if let Some(shared) = weak.upgrade() {
                shared.handle_exit(session, exit);
            }
            exit
        });

        inner.slot.commit_start(session, pid);
        inner.live = Some(LiveSession {
            stop_tx: Some(stop_tx),
            supervisor,
            ready_rx,
        });

        info!(session, ?pid, "backend started");
        Ok(StartOutcome::Started { session, pid })
    }

    /// Request termination of the backend and clear the handle.
    ///
    /// Does not wait for the process to exit; see [`Bridge::shutdown`].
    pub fn stop(&self) -> StopOutcome {
        self.request_stop()
            .map(|(session, _)| StopOutcome::Stopping { session })
            .unwrap_or(StopOutcome::NotRunning)
    }

    /// Stop the backend and wait for it to exit.
    ///
    /// Returns `None` if nothing was running.
    pub async fn shutdown(&self) -> Result<Option<ExitInfo>> {
        let Some((_, supervisor)) = self.request_stop() else {
            return Ok(None);
        };
        let Some(supervisor) = supervisor else {
            return Ok(None);
        };

        let exit = supervisor.await.map_err(anyhow::Error::from)?;
        Ok(Some(exit.exit))
    }

    fn request_stop(&self) -> Option<(SessionId, Option<JoinHandle<SupervisedExit>>)> {
        let live = {
            let mut inner = self.shared.lock();
            match inner.slot.stop() {
                StopDecision::Noop => {
                    debug!("backend not running; stop ignored");
                    return None;
                }
                StopDecision::Signal { session } => (session, inner.live.take()),
            }
        };

        let (session, live) = live;
        info!(session, "stopping backend");
        let _ = self.shared.events.send(BridgeEvent::StopRequested { session });

        let supervisor = live.map(|mut live| {
            if let Some(tx) = live.stop_tx.take() {
                if tx.send(()).is_err() {
                    debug!(session, "backend already exited while stopping");
                }
            }
            live.supervisor
        });

        Some((session, supervisor))
    }

    /// Wait until the current session passes its readiness probe.
    ///
    /// Fails with `StartupTimeout` after `readiness.startup_timeout`, with
    /// `ExitedDuringStartup` if the process dies first, and with
    /// `NotRunning` if no backend is running.
    pub async fn wait_ready(&self) -> Result<()> {
        let mut rx = {
            let inner = self.shared.lock();
            inner
                .live
                .as_ref()
                .map(|live| live.ready_rx.clone())
                .ok_or(BridgeError::NotRunning)?
        };

        let limit = self.shared.config.readiness.startup_timeout;
        let waited = tokio::time::timeout(limit, async move {
            let settled = rx
                .wait_for(|r| *r != Readiness::Pending)
                .await
                .map(|r| *r);
            settled
        })
        .await;

        match waited {
            Err(_) => Err(BridgeError::StartupTimeout(limit)),
            Ok(Ok(Readiness::Ready)) => Ok(()),
            Ok(Ok(Readiness::Exited(exit))) => Err(BridgeError::ExitedDuringStartup(exit)),
            Ok(Ok(Readiness::Pending)) | Ok(Err(_)) => Err(BridgeError::NotRunning),
        }
    }

    /// `start` followed by `wait_ready` for the session that is running
    /// afterwards.
    pub async fn start_and_wait_ready(
        &self,
        on_output: Option<OutputCallback>,
    ) -> Result<StartOutcome> {
        let outcome = self.start(on_output)?;
        self.wait_ready().await?;
        Ok(outcome)
    }

    /// Observe lifecycle events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.shared.events.subscribe()
    }

    pub fn state(&self) -> SlotState {
        self.shared.lock().slot.state()
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().slot.is_running()
    }

    pub fn pid(&self) -> Option<u32> {
        match self.state() {
            SlotState::Running { pid, .. } => pid,
            SlotState::Stopped => None,
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if self.request_stop().is_some() {
            debug!("bridge dropped with a running backend; stop requested");
        }
    }
}
