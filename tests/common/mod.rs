#![allow(dead_code)]

use std::sync::Arc;

use backend_bridge::bridge::Bridge;
use backend_bridge::config::ConfigFile;
use backend_bridge_test_utils::builders::test_launch_spec;
use backend_bridge_test_utils::FakeLauncher;

pub use backend_bridge_test_utils::{
    init_tracing, next_event_matching, with_timeout, OutputRecorder,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Bridge over simulated children.
pub fn fake_bridge(cfg: ConfigFile, launcher: &FakeLauncher) -> Bridge {
    let spec = test_launch_spec(&cfg);
    Bridge::with_launcher(cfg, spec, Arc::new(launcher.clone()))
}
