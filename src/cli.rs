// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::ReadyProbeKind;

/// Command-line arguments for `backend-bridge`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "backend-bridge",
    version,
    about = "Launch the desktop app's backend server and forward its output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `backend-bridge.toml` in the current working directory; a
    /// missing default file means built-in settings.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Directory the launch layout is resolved from.
    ///
    /// Default: the directory containing this executable.
    #[arg(long, value_name = "DIR")]
    pub bridge_dir: Option<String>,

    /// Override `[backend].host`.
    #[arg(long, value_name = "ADDR")]
    pub host: Option<String>,

    /// Override `[backend].port`.
    #[arg(long, value_name = "PORT", value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Override `[readiness].probe` (first_output, stdout_pattern, tcp, http).
    #[arg(long, value_name = "PROBE")]
    pub probe: Option<ReadyProbeKind>,

    /// Override `[readiness].pattern` for the `stdout_pattern` probe.
    #[arg(long, value_name = "REGEX")]
    pub ready_pattern: Option<String>,

    /// Block until the readiness probe passes, failing on timeout.
    #[arg(long)]
    pub wait_ready: bool,

    /// Print the resolved launch without spawning anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BACKEND_BRIDGE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
