// src/api.rs

//! Surface exposed to the restricted UI context.
//!
//! UI-registration code receives the [`Bridge`] explicitly (usually as an
//! `Arc<Bridge>`) and installs it under [`EXPOSED_NAME`]. The UI only ever
//! sees these two operations.

use crate::bridge::Bridge;
use crate::errors::Result;
use crate::exec::OutputCallback;
use crate::types::{StartOutcome, StopOutcome};

/// Property name the operations are installed under.
pub const EXPOSED_NAME: &str = "backend";

pub trait BackendApi: Send + Sync {
    /// Launch the backend; a no-op while one is running.
    fn start(&self, on_output: Option<OutputCallback>) -> Result<StartOutcome>;

    /// Terminate the backend; a no-op while none is running.
    fn stop(&self) -> StopOutcome;
}

impl BackendApi for Bridge {
    fn start(&self, on_output: Option<OutputCallback>) -> Result<StartOutcome> {
        Bridge::start(self, on_output)
    }

    fn stop(&self) -> StopOutcome {
        Bridge::stop(self)
    }
}
