// src/bridge/events.rs

use crate::types::{ExitInfo, SessionId};

/// Lifecycle notifications published by a [`Bridge`](super::Bridge).
///
/// Subscribe with [`Bridge::subscribe`](super::Bridge::subscribe). Delivery
/// is best-effort: a slow subscriber may observe `Lagged` and miss events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// A backend process was spawned.
    Spawned {
        session: SessionId,
        pid: Option<u32>,
    },
    /// The readiness probe succeeded.
    Ready { session: SessionId },
    /// `stop` was called for this session.
    StopRequested { session: SessionId },
    /// The process exited. `requested` is false when it died on its own.
    Exited {
        session: SessionId,
        exit: ExitInfo,
        requested: bool,
    },
}

impl BridgeEvent {
    pub fn session(&self) -> SessionId {
        match self {
            BridgeEvent::Spawned { session, .. }
            | BridgeEvent::Ready { session }
            | BridgeEvent::StopRequested { session }
            | BridgeEvent::Exited { session, .. } => *session,
        }
    }
}
