// src/exec/supervisor.rs

//! Watches one backend process until it exits.

use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ShutdownSettings;
use crate::errors::Result;
use crate::exec::backend::ProcessControl;
use crate::types::{ExitInfo, SessionId};

/// How a supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisedExit {
    pub exit: ExitInfo,
    /// True if the exit followed a stop request.
    pub requested: bool,
}

/// Wait for the process to exit on its own, or terminate it when `stop_rx`
/// fires.
///
/// A dropped stop sender (the owning bridge went away) counts as a stop
/// request. Termination sends the graceful signal first, then kills after
/// `shutdown.grace_period` if `shutdown.force_kill` is set.
pub async fn supervise(
    session: SessionId,
    mut control: Box<dyn ProcessControl>,
    mut stop_rx: oneshot::Receiver<()>,
    shutdown: ShutdownSettings,
) -> SupervisedExit {
    tokio::select! {
        res = control.wait() => {
            let exit = match res {
                Ok(exit) => exit,
                Err(e) => {
                    warn!(session, error = %e, "failed waiting for backend process");
                    ExitInfo::default()
                }
            };

            info!(
                session,
                exit_code = ?exit.code,
                signal = ?exit.signal,
                success = exit.success(),
                "backend process exited"
            );

            SupervisedExit { exit, requested: false }
        }

        stop = &mut stop_rx => {
            match stop {
                Ok(()) => info!(session, "stop requested; terminating backend"),
                Err(_) => debug!(session, "bridge dropped; terminating backend"),
            }

            let exit = terminate_and_reap(session, control.as_mut(), shutdown).await;

            info!(
                session,
                exit_code = ?exit.code,
                signal = ?exit.signal,
                "backend process stopped"
            );

            SupervisedExit { exit, requested: true }
        }
    }
}

async fn terminate_and_reap(
    session: SessionId,
    control: &mut dyn ProcessControl,
    shutdown: ShutdownSettings,
) -> ExitInfo {
    if let Err(e) = control.terminate() {
        warn!(session, error = %e, "failed to signal backend process");
    }

    match timeout(shutdown.grace_period, control.wait()).await {
        Ok(res) => reaped(session, res),
        Err(_) if shutdown.force_kill => {
            warn!(
                session,
                grace_period = ?shutdown.grace_period,
                "backend still running after grace period; killing"
            );
            if let Err(e) = control.kill().await {
                warn!(session, error = %e, "failed to kill backend process");
            }
            reaped(session, control.wait().await)
        }
        Err(_) => {
            warn!(
                session,
                grace_period = ?shutdown.grace_period,
                "backend still running after grace period; force_kill disabled, waiting"
            );
            reaped(session, control.wait().await)
        }
    }
}

fn reaped(session: SessionId, res: Result<ExitInfo>) -> ExitInfo {
    res.unwrap_or_else(|e| {
        warn!(session, error = %e, "failed waiting for backend process");
        ExitInfo::default()
    })
}
