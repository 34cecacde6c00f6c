#![allow(dead_code)]

use std::path::{Path, PathBuf};

use backend_bridge::config::{ConfigFile, RawConfigFile};
use backend_bridge::launch::LaunchSpec;
use backend_bridge::types::{OsFamily, ReadyProbeKind};

/// Bridge directory used for launches that never touch the filesystem.
pub const TEST_BRIDGE_DIR: &str = "/app/desktop";

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the defaults but with short timeouts so failing tests fail
/// fast.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.readiness.startup_timeout = "2s".to_string();
        config.readiness.probe_interval = "20ms".to_string();
        config.shutdown.grace_period = "500ms".to_string();
        Self { config }
    }

    pub fn host(mut self, host: &str) -> Self {
        self.config.backend.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.backend.port = port;
        self
    }

    pub fn interpreter(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.backend.interpreter = Some(path.into());
        self
    }

    pub fn script(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.backend.script = Some(path.into());
        self
    }

    pub fn working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.backend.working_dir = Some(path.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config
            .backend
            .env
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn probe(mut self, probe: ReadyProbeKind) -> Self {
        self.config.readiness.probe = probe;
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.config.readiness.pattern = Some(pattern.to_string());
        self
    }

    pub fn health_path(mut self, path: &str) -> Self {
        self.config.readiness.path = path.to_string();
        self
    }

    pub fn startup_timeout(mut self, duration: &str) -> Self {
        self.config.readiness.startup_timeout = duration.to_string();
        self
    }

    pub fn grace_period(mut self, duration: &str) -> Self {
        self.config.shutdown.grace_period = duration.to_string();
        self
    }

    pub fn force_kill(mut self, val: bool) -> Self {
        self.config.shutdown.force_kill = val;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Unix-layout launch for [`TEST_BRIDGE_DIR`].
pub fn test_launch_spec(cfg: &ConfigFile) -> LaunchSpec {
    LaunchSpec::from_config(cfg, Path::new(TEST_BRIDGE_DIR), OsFamily::Unix)
}
