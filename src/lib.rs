// src/lib.rs

pub mod api;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod launch;
pub mod logging;
pub mod ready;
pub mod types;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::bridge::{Bridge, BridgeEvent};
use crate::cli::CliArgs;
use crate::config::{default_config_path, load_from_path, load_raw_or_default, ConfigFile};
use crate::exec::OutputCallback;
use crate::launch::{default_bridge_dir, LaunchSpec};

pub use crate::api::{BackendApi, EXPOSED_NAME};
pub use crate::errors::{BridgeError, Result as BridgeResult};
pub use crate::types::{ExitInfo, OsFamily, StartOutcome, StopOutcome};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - launch resolution
/// - the bridge, with stdout chunks copied to our stdout
/// - Ctrl-C handling and unexpected backend exit
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_config(&args)?;

    let bridge_dir = match &args.bridge_dir {
        Some(dir) => PathBuf::from(dir),
        None => default_bridge_dir()?,
    };
    let spec = LaunchSpec::for_current_os(&cfg, &bridge_dir);

    if args.dry_run {
        print_dry_run(&cfg, &spec);
        return Ok(());
    }

    let bridge = Bridge::new(cfg, spec);
    let mut events = bridge.subscribe();

    let on_output: OutputCallback = Arc::new(|chunk: &str| {
        let mut out = io::stdout().lock();
        if let Err(e) = out.write_all(chunk.as_bytes()).and_then(|()| out.flush()) {
            debug!(error = %e, "failed to copy backend output");
        }
    });
    bridge.start(Some(on_output))?;

    if args.wait_ready {
        tokio::select! {
            res = bridge.wait_ready() => res?,
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C during startup; stopping backend");
                bridge.shutdown().await?;
                return Ok(());
            }
        }
    }

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                }
                info!("stopping backend");
                let exit = bridge.shutdown().await?;
                debug!(?exit, "backend shut down");
                return Ok(());
            }

            event = events.recv() => match event {
                Ok(BridgeEvent::Exited { exit, requested: false, .. }) => {
                    if exit.success() {
                        info!("backend exited");
                        return Ok(());
                    }
                    bail!("backend exited unexpectedly ({exit})");
                }
                Ok(event) => debug!(?event, "bridge event"),
                Err(RecvError::Lagged(n)) => debug!(skipped = n, "bridge event subscriber lagged"),
                Err(RecvError::Closed) => return Ok(()),
            }
        }
    }
}

/// Load the config file and apply CLI overrides before validation, so
/// overridden values are checked like file values.
fn load_config(args: &CliArgs) -> Result<ConfigFile> {
    let mut raw = match &args.config {
        Some(path) => load_from_path(path)?,
        None => load_raw_or_default(default_config_path())?,
    };

    if let Some(host) = &args.host {
        raw.backend.host = host.clone();
    }
    if let Some(port) = args.port {
        raw.backend.port = port;
    }
    if let Some(probe) = args.probe {
        raw.readiness.probe = probe;
    }
    if let Some(pattern) = &args.ready_pattern {
        raw.readiness.pattern = Some(pattern.clone());
    }

    Ok(ConfigFile::try_from(raw)?)
}

fn print_dry_run(cfg: &ConfigFile, spec: &LaunchSpec) {
    println!("backend-bridge dry-run");
    println!("  program: {}", spec.program.display());
    println!("  args:");
    for arg in &spec.args {
        println!("    {}", arg.to_string_lossy());
    }
    println!("  cwd: {}", spec.working_dir.display());
    for (key, value) in &spec.env {
        println!("  env: {key}={value}");
    }
    println!("  bind: {}", cfg.bind_addr());
    println!("  readiness: {:?}", cfg.readiness.probe);
    println!(
        "  startup_timeout: {:?}, probe_interval: {:?}",
        cfg.readiness.startup_timeout, cfg.readiness.probe_interval
    );
    println!(
        "  shutdown: grace_period {:?}, force_kill {}",
        cfg.shutdown.grace_period, cfg.shutdown.force_kill
    );

    debug!("dry-run complete (nothing spawned)");
}
