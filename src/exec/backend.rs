// src/exec/backend.rs

//! Pluggable process launcher abstraction.
//!
//! The bridge talks to a `Launcher` instead of `tokio::process` directly,
//! so tests can swap in simulated children while production uses
//! [`TokioLauncher`].
//!
//! A launch yields a [`LaunchedProcess`]: the pid, the two output streams,
//! and a [`ProcessControl`] the supervisor uses to wait on, signal and
//! kill the child.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::AsyncRead;
use tokio::process::{Child, Command};
use tracing::debug;

use crate::errors::{BridgeError, Result};
use crate::launch::LaunchSpec;
use crate::types::ExitInfo;

/// One output stream of a launched process.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Lifecycle control over a launched process.
pub trait ProcessControl: Send {
    /// Ask the process to exit (SIGTERM on Unix). Does not wait.
    ///
    /// Platforms without a graceful signal kill the process instead.
    fn terminate(&mut self) -> Result<()>;

    /// Forcefully kill the process and reap it.
    fn kill(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Wait for the process to exit.
    ///
    /// Must be safe to call again after the process has exited.
    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<ExitInfo>> + Send + '_>>;
}

/// A freshly spawned backend.
pub struct LaunchedProcess {
    pub pid: Option<u32>,
    pub stdout: Option<OutputStream>,
    pub stderr: Option<OutputStream>,
    pub control: Box<dyn ProcessControl>,
}

/// Trait abstracting how the backend process is created.
pub trait Launcher: Send + Sync {
    /// Spawn the process described by `spec`.
    ///
    /// Must not block; the process runs independently once this returns.
    fn launch(&self, spec: &LaunchSpec) -> Result<LaunchedProcess>;
}

/// Launcher used in production, backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

impl Launcher for TokioLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<LaunchedProcess> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.working_dir)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| BridgeError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        let pid = child.id();
        debug!(?pid, program = %spec.program.display(), "spawned backend process");

        let stdout = child
            .stdout
            .take()
            .map(|s| Box::new(s) as OutputStream);
        let stderr = child
            .stderr
            .take()
            .map(|s| Box::new(s) as OutputStream);

        Ok(LaunchedProcess {
            pid,
            stdout,
            stderr,
            control: Box::new(ChildControl { child }),
        })
    }
}

/// [`ProcessControl`] over a real `tokio::process::Child`.
struct ChildControl {
    child: Child,
}

impl ProcessControl for ChildControl {
    #[cfg(unix)]
    fn terminate(&mut self) -> Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        // `id()` is `None` once the child has been reaped.
        let Some(pid) = self.child.id() else {
            return Ok(());
        };

        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(std::io::Error::from(e).into()),
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> Result<()> {
        match self.child.start_kill() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn kill(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.child.kill().await?;
            Ok(())
        })
    }

    fn wait(&mut self) -> Pin<Box<dyn Future<Output = Result<ExitInfo>> + Send + '_>> {
        Box::pin(async move {
            let status = self.child.wait().await?;
            Ok(ExitInfo::from_status(status))
        })
    }
}
