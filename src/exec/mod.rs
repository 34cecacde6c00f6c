// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `Launcher` / `ProcessControl` traits and the
//!   production `TokioLauncher`; tests replace it with simulated children.
//! - [`output`] pumps the child's stdout and stderr.
//! - [`supervisor`] waits on the child and carries out stop requests.

pub mod backend;
pub mod output;
pub mod supervisor;

pub use backend::{LaunchedProcess, Launcher, OutputStream, ProcessControl, TokioLauncher};
pub use output::{spawn_stderr_pump, spawn_stdout_pump, OutputCallback};
pub use supervisor::{supervise, SupervisedExit};
