use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Monotonic number identifying one spawned backend process.
pub type SessionId = u64;

/// Operating system family, used to pick the interpreter layout inside the
/// virtual environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    Unix,
}

impl OsFamily {
    /// Family of the host this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            OsFamily::Windows
        } else {
            OsFamily::Unix
        }
    }
}

/// How the bridge decides that a freshly spawned backend is ready.
///
/// - `FirstOutput`: the first stdout chunk counts as "started" (default).
/// - `StdoutPattern`: the first stdout chunk matching `readiness.pattern`.
/// - `Tcp`: a TCP connection to `host:port` succeeds.
/// - `Http`: `GET http://host:port{path}` answers with a 2xx status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyProbeKind {
    FirstOutput,
    StdoutPattern,
    Tcp,
    Http,
}

impl Default for ReadyProbeKind {
    fn default() -> Self {
        ReadyProbeKind::FirstOutput
    }
}

impl FromStr for ReadyProbeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first_output" => Ok(ReadyProbeKind::FirstOutput),
            "stdout_pattern" => Ok(ReadyProbeKind::StdoutPattern),
            "tcp" => Ok(ReadyProbeKind::Tcp),
            "http" => Ok(ReadyProbeKind::Http),
            other => Err(format!(
                "invalid readiness probe: {other} (expected \"first_output\", \"stdout_pattern\", \"tcp\" or \"http\")"
            )),
        }
    }
}

/// How a backend process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExitInfo {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Terminating signal (Unix only).
    pub signal: Option<i32>,
}

impl ExitInfo {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn from_status(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(sig)) => write!(f, "terminated by signal {sig}"),
            (None, None) => write!(f, "unknown exit status"),
        }
    }
}

/// Result of a `start` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new backend process was spawned.
    Started { session: SessionId, pid: Option<u32> },
    /// A backend was already running; nothing was spawned.
    AlreadyRunning { session: SessionId },
}

/// Result of a `stop` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Termination was requested for this session and the handle cleared.
    Stopping { session: SessionId },
    /// Nothing was running.
    NotRunning,
}
