// src/launch/paths.rs

//! Filesystem layout of the desktop app, relative to the bridge directory.
//!
//! ```text
//! <repo>/.venv/bin/python            (Scripts/python.exe on Windows)
//! <repo>/<app>/src/server.py
//! <repo>/<app>/desktop/              <- bridge directory
//! ```

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::errors::Result;
use crate::types::OsFamily;

/// Interpreter inside the repository-root virtual environment, two levels
/// above the bridge directory.
pub fn interpreter_path(bridge_dir: &Path, family: OsFamily) -> PathBuf {
    let venv = bridge_dir.join("..").join("..").join(".venv");
    match family {
        OsFamily::Windows => venv.join("Scripts").join("python.exe"),
        OsFamily::Unix => venv.join("bin").join("python"),
    }
}

/// Backend entry script, one level above the bridge directory.
pub fn script_path(bridge_dir: &Path) -> PathBuf {
    bridge_dir.join("..").join("src").join("server.py")
}

/// The backend runs from the bridge directory's parent.
pub fn working_dir(bridge_dir: &Path) -> PathBuf {
    bridge_dir.join("..")
}

/// Resolve a configured override: absolute paths are kept, relative ones
/// are taken relative to the bridge directory.
pub fn resolve_override(bridge_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        bridge_dir.join(path)
    }
}

/// Directory containing the running executable.
pub fn default_bridge_dir() -> Result<PathBuf> {
    let exe = env::current_exe().context("locating the current executable")?;
    let dir = exe
        .parent()
        .map(Path::to_path_buf)
        .context("current executable has no parent directory")?;
    Ok(dir)
}
