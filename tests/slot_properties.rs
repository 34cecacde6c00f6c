use proptest::prelude::*;

use backend_bridge::bridge::{ExitDecision, Slot, StartDecision, StopDecision};
use backend_bridge::types::SessionId;

#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    /// Spawn attempt that fails before committing.
    FailedStart,
    Stop,
    /// Exit notification for the n-th session ever spawned.
    Exit(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => Just(Op::Start),
        1 => Just(Op::FailedStart),
        3 => Just(Op::Stop),
        2 => (0..16usize).prop_map(Op::Exit),
    ]
}

proptest! {
    /// Replays random call sequences against the slot while tracking which
    /// simulated processes are alive.
    #[test]
    fn slot_never_runs_two_processes(ops in proptest::collection::vec(op_strategy(), 1..64)) {
        let mut slot = Slot::new();
        // (session, alive) per spawned process, in spawn order.
        let mut processes: Vec<(SessionId, bool)> = Vec::new();

        for op in ops {
            let was_running = slot.is_running();

            match op {
                Op::Start => match slot.begin_start() {
                    StartDecision::Spawn { session } => {
                        prop_assert!(!was_running);
                        prop_assert!(processes.iter().all(|(s, _)| *s != session));
                        slot.commit_start(session, None);
                        processes.push((session, true));
                    }
                    StartDecision::AlreadyRunning { session } => {
                        prop_assert!(was_running);
                        prop_assert_eq!(slot.current_session(), Some(session));
                    }
                },
                Op::FailedStart => {
                    let decision = slot.begin_start();
                    prop_assert_eq!(slot.is_running(), was_running);
                    if let StartDecision::AlreadyRunning { .. } = decision {
                        prop_assert!(was_running);
                    }
                }
                Op::Stop => match slot.stop() {
                    StopDecision::Signal { session } => {
                        prop_assert!(was_running);
                        prop_assert!(!slot.is_running());
                        if let Some(p) = processes.iter_mut().find(|(s, _)| *s == session) {
                            p.1 = false;
                        }
                    }
                    StopDecision::Noop => prop_assert!(!was_running),
                },
                Op::Exit(n) => {
                    if let Some(&(session, alive)) = processes.get(n) {
                        let current = slot.current_session();
                        let decision = slot.on_exit(session);
                        if current == Some(session) {
                            prop_assert!(alive);
                            prop_assert_eq!(decision, ExitDecision::Cleared);
                            prop_assert!(!slot.is_running());
                        } else {
                            prop_assert_eq!(decision, ExitDecision::Stale);
                            prop_assert_eq!(slot.current_session(), current);
                        }
                        processes[n].1 = false;
                    }
                }
            }

            // The slot tracks exactly the live process, if any.
            let live: Vec<SessionId> = processes
                .iter()
                .filter(|(_, alive)| *alive)
                .map(|(s, _)| *s)
                .collect();
            prop_assert!(live.len() <= 1);
            prop_assert_eq!(slot.current_session(), live.first().copied());
        }
    }
}
