// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::ready::ReadyProbe;
use crate::types::ReadyProbeKind;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [backend]
/// host = "127.0.0.1"
/// port = 5000
///
/// [readiness]
/// probe = "http"
/// path = "/health"
/// startup_timeout = "30s"
///
/// [shutdown]
/// grace_period = "5s"
/// ```
///
/// Every section is optional; an empty file yields the same launch as the
/// desktop app's built-in defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub backend: BackendSection,

    #[serde(default)]
    pub readiness: ReadinessSection,

    #[serde(default)]
    pub shutdown: ShutdownSection,
}

/// `[backend]` section: what to spawn and where.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSection {
    /// Interpreter override. Relative paths resolve against the bridge
    /// directory. If `None`, the project virtual environment is used.
    #[serde(default)]
    pub interpreter: Option<PathBuf>,

    /// Backend entry script override (relative to the bridge directory).
    #[serde(default)]
    pub script: Option<PathBuf>,

    /// Working directory override (relative to the bridge directory).
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Extra arguments appended after `--host`/`--port`.
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment variables added to the inherited environment.
    #[serde(default = "default_env")]
    pub env: BTreeMap<String, String>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_env() -> BTreeMap<String, String> {
    // Python block-buffers stdout when it is a pipe.
    let mut env = BTreeMap::new();
    env.insert("PYTHONUNBUFFERED".to_string(), "1".to_string());
    env
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            interpreter: None,
            script: None,
            working_dir: None,
            host: default_host(),
            port: default_port(),
            args: Vec::new(),
            env: default_env(),
        }
    }
}

/// `[readiness]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadinessSection {
    #[serde(default)]
    pub probe: ReadyProbeKind,

    /// Regex for `probe = "stdout_pattern"`.
    #[serde(default)]
    pub pattern: Option<String>,

    /// Request path for `probe = "http"`.
    #[serde(default = "default_health_path")]
    pub path: String,

    #[serde(default = "default_startup_timeout")]
    pub startup_timeout: String,

    /// Poll interval for the `tcp` and `http` probes.
    #[serde(default = "default_probe_interval")]
    pub probe_interval: String,
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_startup_timeout() -> String {
    "30s".to_string()
}

fn default_probe_interval() -> String {
    "250ms".to_string()
}

impl Default for ReadinessSection {
    fn default() -> Self {
        Self {
            probe: ReadyProbeKind::default(),
            pattern: None,
            path: default_health_path(),
            startup_timeout: default_startup_timeout(),
            probe_interval: default_probe_interval(),
        }
    }
}

/// `[shutdown]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ShutdownSection {
    /// How long to wait after the graceful signal.
    #[serde(default = "default_grace_period")]
    pub grace_period: String,

    /// Kill the process if it is still alive after `grace_period`.
    #[serde(default = "default_force_kill")]
    pub force_kill: bool,
}

fn default_grace_period() -> String {
    "5s".to_string()
}

fn default_force_kill() -> bool {
    true
}

impl Default for ShutdownSection {
    fn default() -> Self {
        Self {
            grace_period: default_grace_period(),
            force_kill: default_force_kill(),
        }
    }
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)` (or
/// `Default`), so durations are parsed and patterns compiled.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub backend: BackendSection,
    pub readiness: ReadinessSettings,
    pub shutdown: ShutdownSettings,
}

#[derive(Debug, Clone)]
pub struct ReadinessSettings {
    pub probe: ReadyProbe,
    pub startup_timeout: Duration,
    pub probe_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownSettings {
    pub grace_period: Duration,
    pub force_kill: bool,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            probe: ReadyProbe::FirstOutput,
            startup_timeout: Duration::from_secs(30),
            probe_interval: Duration::from_millis(250),
        }
    }
}

impl Default for ShutdownSettings {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(5),
            force_kill: true,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(
            BackendSection::default(),
            ReadinessSettings::default(),
            ShutdownSettings::default(),
        )
    }
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        backend: BackendSection,
        readiness: ReadinessSettings,
        shutdown: ShutdownSettings,
    ) -> Self {
        Self {
            backend,
            readiness,
            shutdown,
        }
    }

    /// `host:port` the backend is asked to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.backend.host, self.backend.port)
    }
}
