// src/bridge/state.rs

//! Pure state machine for the single backend slot.
//!
//! ```text
//!            start()                    stop() / exit of current session
//! Stopped ─────────────▶ Running ─────────────────────────────────▶ Stopped
//!   │ stop(): no-op        │ start(): no-op
//! ```
//!
//! No Tokio types, no IO: the [`Bridge`](super::Bridge) consults the slot
//! and then performs the side effects it asks for.

use crate::types::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Stopped,
    Running {
        session: SessionId,
        pid: Option<u32>,
    },
}

/// What `start` should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    /// Spawn a process for this freshly allocated session number.
    Spawn { session: SessionId },
    /// Leave the running session alone.
    AlreadyRunning { session: SessionId },
}

/// What `stop` should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopDecision {
    /// Signal the process of this session; the slot is already cleared.
    Signal { session: SessionId },
    Noop,
}

/// Result of a process exit notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    /// The exiting session was current; the slot is now `Stopped`.
    Cleared,
    /// The session had already been stopped or replaced.
    Stale,
}

#[derive(Debug)]
pub struct Slot {
    state: SlotState,
    next_session: SessionId,
}

impl Default for Slot {
    fn default() -> Self {
        Self::new()
    }
}

impl Slot {
    pub fn new() -> Self {
        Self {
            state: SlotState::Stopped,
            next_session: 1,
        }
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SlotState::Running { .. })
    }

    pub fn current_session(&self) -> Option<SessionId> {
        match self.state {
            SlotState::Running { session, .. } => Some(session),
            SlotState::Stopped => None,
        }
    }

    /// Decide whether a `start` call spawns.
    ///
    /// A `Spawn` decision reserves a session number but does not change the
    /// state; call [`Slot::commit_start`] once the process exists. A failed
    /// spawn simply never commits.
    pub fn begin_start(&mut self) -> StartDecision {
        match self.state {
            SlotState::Running { session, .. } => StartDecision::AlreadyRunning { session },
            SlotState::Stopped => {
                let session = self.next_session;
                self.next_session += 1;
                StartDecision::Spawn { session }
            }
        }
    }

    pub fn commit_start(&mut self, session: SessionId, pid: Option<u32>) {
        debug_assert!(!self.is_running(), "commit_start while a session is running");
        self.state = SlotState::Running { session, pid };
    }

    pub fn stop(&mut self) -> StopDecision {
        match self.state {
            SlotState::Running { session, .. } => {
                self.state = SlotState::Stopped;
                StopDecision::Signal { session }
            }
            SlotState::Stopped => StopDecision::Noop,
        }
    }

    pub fn on_exit(&mut self, session: SessionId) -> ExitDecision {
        match self.state {
            SlotState::Running { session: current, .. } if current == session => {
                self.state = SlotState::Stopped;
                ExitDecision::Cleared
            }
            _ => ExitDecision::Stale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_stopped() {
        let slot = Slot::new();
        assert_eq!(slot.state(), SlotState::Stopped);
        assert_eq!(slot.current_session(), None);
    }

    #[test]
    fn second_start_is_a_noop() {
        let mut slot = Slot::new();
        let StartDecision::Spawn { session } = slot.begin_start() else {
            panic!("first start must spawn");
        };
        slot.commit_start(session, Some(42));

        assert_eq!(slot.begin_start(), StartDecision::AlreadyRunning { session });
        assert_eq!(
            slot.state(),
            SlotState::Running {
                session,
                pid: Some(42)
            }
        );
    }

    #[test]
    fn stop_when_stopped_is_a_noop() {
        let mut slot = Slot::new();
        assert_eq!(slot.stop(), StopDecision::Noop);
        assert_eq!(slot.stop(), StopDecision::Noop);
    }

    #[test]
    fn start_stop_start_uses_a_new_session() {
        let mut slot = Slot::new();
        let StartDecision::Spawn { session: first } = slot.begin_start() else {
            panic!("expected spawn");
        };
        slot.commit_start(first, None);
        assert_eq!(slot.stop(), StopDecision::Signal { session: first });

        let StartDecision::Spawn { session: second } = slot.begin_start() else {
            panic!("expected spawn after stop");
        };
        assert_ne!(first, second);
    }

    #[test]
    fn failed_spawn_leaves_slot_stopped() {
        let mut slot = Slot::new();
        assert!(matches!(slot.begin_start(), StartDecision::Spawn { .. }));
        // never committed
        assert!(!slot.is_running());
        assert!(matches!(slot.begin_start(), StartDecision::Spawn { .. }));
    }

    #[test]
    fn exit_of_current_session_clears_slot() {
        let mut slot = Slot::new();
        let StartDecision::Spawn { session } = slot.begin_start() else {
            panic!("expected spawn");
        };
        slot.commit_start(session, None);

        assert_eq!(slot.on_exit(session), ExitDecision::Cleared);
        assert!(!slot.is_running());
    }

    #[test]
    fn stale_exit_does_not_clear_newer_session() {
        let mut slot = Slot::new();
        let StartDecision::Spawn { session: old } = slot.begin_start() else {
            panic!("expected spawn");
        };
        slot.commit_start(old, None);
        slot.stop();

        let StartDecision::Spawn { session: new } = slot.begin_start() else {
            panic!("expected spawn");
        };
        slot.commit_start(new, None);

        assert_eq!(slot.on_exit(old), ExitDecision::Stale);
        assert_eq!(slot.current_session(), Some(new));
    }
}
