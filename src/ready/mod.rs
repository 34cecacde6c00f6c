// src/ready/mod.rs

//! Backend readiness.
//!
//! A freshly spawned backend is `Pending` until its probe succeeds. Stdout
//! based probes are evaluated by the stdout pump; network probes poll in
//! [`probe`]. Every source funnels into a per-session [`ReadySignal`].

pub mod probe;

use std::sync::Arc;

use regex::Regex;
use tokio::sync::{broadcast, watch};
use tracing::info;

use crate::bridge::BridgeEvent;
use crate::types::{ExitInfo, SessionId};

pub use probe::spawn_network_probe;

/// Criterion for "the backend has started".
#[derive(Debug, Clone)]
pub enum ReadyProbe {
    /// Any stdout chunk.
    FirstOutput,
    /// A stdout chunk matching the pattern.
    StdoutPattern(Regex),
    /// A TCP connect to the bind address succeeds.
    Tcp,
    /// An HTTP GET on the bind address answers 2xx.
    Http { path: String },
}

impl ReadyProbe {
    /// Does this stdout chunk satisfy the probe?
    ///
    /// A pattern is matched per chunk, so it must not span two reads.
    /// Always false for network probes.
    pub fn matches_output(&self, chunk: &str) -> bool {
        match self {
            ReadyProbe::FirstOutput => true,
            ReadyProbe::StdoutPattern(re) => re.is_match(chunk),
            ReadyProbe::Tcp | ReadyProbe::Http { .. } => false,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ReadyProbe::Tcp | ReadyProbe::Http { .. })
    }
}

/// Readiness of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready,
    /// The process exited while still pending.
    Exited(ExitInfo),
}

/// Write side of a session's readiness.
///
/// Cheap to clone; handed to the stdout pump, the network probe and the
/// supervisor. Only the first transition out of `Pending` takes effect.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    session: SessionId,
    tx: Arc<watch::Sender<Readiness>>,
    events: broadcast::Sender<BridgeEvent>,
}

impl ReadySignal {
    pub fn new(
        session: SessionId,
        events: broadcast::Sender<BridgeEvent>,
    ) -> (Self, watch::Receiver<Readiness>) {
        let (tx, rx) = watch::channel(Readiness::Pending);
        let signal = Self {
            session,
            tx: Arc::new(tx),
            events,
        };
        (signal, rx)
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn is_pending(&self) -> bool {
        *self.tx.borrow() == Readiness::Pending
    }

    /// Mark the session ready. Returns true if this call made the transition.
    pub fn mark_ready(&self) -> bool {
        let changed = self.settle(Readiness::Ready);
        if changed {
            info!(session = self.session, "backend is ready");
            let _ = self.events.send(BridgeEvent::Ready {
                session: self.session,
            });
        }
        changed
    }

    /// Record that the process exited. No effect once ready.
    pub fn mark_exited(&self, exit: ExitInfo) -> bool {
        self.settle(Readiness::Exited(exit))
    }

    fn settle(&self, to: Readiness) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == Readiness::Pending {
                *current = to;
                true
            } else {
                false
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_output_matches_any_chunk() {
        assert!(ReadyProbe::FirstOutput.matches_output(""));
        assert!(ReadyProbe::FirstOutput.matches_output("loading model"));
        assert!(ReadyProbe::FirstOutput.matches_output("Loading AI model... 12%"));
    }

    #[test]
    fn pattern_probe_matches_only_pattern() {
        let probe = ReadyProbe::StdoutPattern(Regex::new(r"Running on http://").unwrap());
        assert!(!probe.matches_output("Loading AI model..."));
        assert!(probe.matches_output(" * Running on http://127.0.0.1:5000"));
        assert!(probe.matches_output("Loading AI model...\n * Running on http://127.0.0.1:5000\n"));
    }

    #[test]
    fn network_probes_ignore_stdout() {
        assert!(!ReadyProbe::Tcp.matches_output("anything"));
        assert!(
            !ReadyProbe::Http {
                path: "/health".to_string()
            }
            .matches_output("anything")
        );
    }

    #[test]
    fn only_first_transition_counts() {
        let (events, mut events_rx) = broadcast::channel(8);
        let (signal, rx) = ReadySignal::new(7, events);

        assert!(signal.is_pending());
        assert!(signal.mark_ready());
        assert!(!signal.mark_ready());
        assert!(!signal.mark_exited(ExitInfo::default()));
        assert_eq!(*rx.borrow(), Readiness::Ready);

        assert_eq!(events_rx.try_recv().unwrap(), BridgeEvent::Ready { session: 7 });
        assert!(events_rx.try_recv().is_err());
    }

    #[test]
    fn exit_while_pending_is_recorded() {
        let (events, _events_rx) = broadcast::channel(8);
        let (signal, rx) = ReadySignal::new(1, events);
        let exit = ExitInfo {
            code: Some(2),
            signal: None,
        };

        assert!(signal.mark_exited(exit));
        assert!(!signal.mark_ready());
        assert_eq!(*rx.borrow(), Readiness::Exited(exit));
    }
}
