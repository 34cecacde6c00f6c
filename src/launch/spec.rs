// src/launch/spec.rs

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ConfigFile;
use crate::launch::paths::{interpreter_path, resolve_override, script_path, working_dir};
use crate::types::OsFamily;

/// Everything needed to spawn the backend process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
    /// Added on top of the inherited environment.
    pub env: BTreeMap<String, String>,
}

impl LaunchSpec {
    /// Build the launch for `bridge_dir` on the given OS family.
    ///
    /// Arguments are `[script, --host, <host>, --port, <port>, extra...]`.
    pub fn from_config(cfg: &ConfigFile, bridge_dir: &Path, family: OsFamily) -> Self {
        let backend = &cfg.backend;

        let program = match &backend.interpreter {
            Some(p) => resolve_override(bridge_dir, p),
            None => interpreter_path(bridge_dir, family),
        };
        let script = match &backend.script {
            Some(p) => resolve_override(bridge_dir, p),
            None => script_path(bridge_dir),
        };
        let cwd = match &backend.working_dir {
            Some(p) => resolve_override(bridge_dir, p),
            None => working_dir(bridge_dir),
        };

        let mut args: Vec<OsString> = vec![
            script.into_os_string(),
            "--host".into(),
            backend.host.clone().into(),
            "--port".into(),
            backend.port.to_string().into(),
        ];
        args.extend(backend.args.iter().map(OsString::from));

        Self {
            program,
            args,
            working_dir: cwd,
            env: backend.env.clone(),
        }
    }

    /// Launch for the host this binary runs on.
    pub fn for_current_os(cfg: &ConfigFile, bridge_dir: &Path) -> Self {
        Self::from_config(cfg, bridge_dir, OsFamily::current())
    }
}

impl fmt::Display for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
