// src/config/validate.rs

use std::time::Duration;

use regex::Regex;

use crate::config::duration::parse_duration;
use crate::config::model::{
    ConfigFile, RawConfigFile, ReadinessSection, ReadinessSettings, ShutdownSection,
    ShutdownSettings,
};
use crate::errors::{BridgeError, Result};
use crate::ready::ReadyProbe;
use crate::types::ReadyProbeKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::BridgeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_backend(&raw)?;
        let readiness = validate_readiness(&raw.readiness)?;
        let shutdown = validate_shutdown(&raw.shutdown)?;
        Ok(ConfigFile::new_unchecked(raw.backend, readiness, shutdown))
    }
}

fn validate_backend(cfg: &RawConfigFile) -> Result<()> {
    if cfg.backend.host.trim().is_empty() {
        return Err(BridgeError::ConfigError(
            "[backend].host must not be empty".to_string(),
        ));
    }

    if cfg.backend.port == 0 {
        return Err(BridgeError::ConfigError(
            "[backend].port must be >= 1 (got 0)".to_string(),
        ));
    }

    for key in cfg.backend.env.keys() {
        if key.is_empty() || key.contains('=') {
            return Err(BridgeError::ConfigError(format!(
                "[backend].env has invalid variable name '{key}'"
            )));
        }
    }

    Ok(())
}

fn validate_readiness(section: &ReadinessSection) -> Result<ReadinessSettings> {
    let startup_timeout = nonzero_duration("readiness.startup_timeout", &section.startup_timeout)?;
    let probe_interval = nonzero_duration("readiness.probe_interval", &section.probe_interval)?;

    let probe = match section.probe {
        ReadyProbeKind::FirstOutput => ReadyProbe::FirstOutput,
        ReadyProbeKind::StdoutPattern => {
            let pattern = section.pattern.as_deref().ok_or_else(|| {
                BridgeError::ConfigError(
                    "[readiness].pattern is required when probe = \"stdout_pattern\"".to_string(),
                )
            })?;
            ReadyProbe::StdoutPattern(Regex::new(pattern)?)
        }
        ReadyProbeKind::Tcp => ReadyProbe::Tcp,
        ReadyProbeKind::Http => {
            if !section.path.starts_with('/') {
                return Err(BridgeError::ConfigError(format!(
                    "[readiness].path must start with '/' (got '{}')",
                    section.path
                )));
            }
            ReadyProbe::Http {
                path: section.path.clone(),
            }
        }
    };

    Ok(ReadinessSettings {
        probe,
        startup_timeout,
        probe_interval,
    })
}

fn validate_shutdown(section: &ShutdownSection) -> Result<ShutdownSettings> {
    // A zero grace period is allowed: it means "kill right away".
    let grace_period = parse_duration(&section.grace_period)
        .map_err(|e| BridgeError::ConfigError(format!("shutdown.grace_period: {e}")))?;

    Ok(ShutdownSettings {
        grace_period,
        force_kill: section.force_kill,
    })
}

fn nonzero_duration(field: &str, value: &str) -> Result<Duration> {
    let dur = parse_duration(value).map_err(|e| BridgeError::ConfigError(format!("{field}: {e}")))?;
    if dur.is_zero() {
        return Err(BridgeError::ConfigError(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(dur)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_raw_config_is_valid() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg.backend.host, "127.0.0.1");
        assert_eq!(cfg.backend.port, 5000);
        assert!(matches!(cfg.readiness.probe, ReadyProbe::FirstOutput));
        assert_eq!(cfg.readiness.startup_timeout, Duration::from_secs(30));
        assert_eq!(cfg.shutdown.grace_period, Duration::from_secs(5));
        assert!(cfg.shutdown.force_kill);
    }

    #[test]
    fn rejects_port_zero() {
        let mut raw = RawConfigFile::default();
        raw.backend.port = 0;
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, BridgeError::ConfigError(_)));
    }

    #[test]
    fn stdout_pattern_requires_pattern() {
        let mut raw = RawConfigFile::default();
        raw.readiness.probe = ReadyProbeKind::StdoutPattern;
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(err.to_string().contains("pattern"));
    }

    #[test]
    fn stdout_pattern_rejects_bad_regex() {
        let mut raw = RawConfigFile::default();
        raw.readiness.probe = ReadyProbeKind::StdoutPattern;
        raw.readiness.pattern = Some("(unclosed".to_string());
        let err = ConfigFile::try_from(raw).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidPattern(_)));
    }

    #[test]
    fn http_path_must_be_absolute() {
        let mut raw = RawConfigFile::default();
        raw.readiness.probe = ReadyProbeKind::Http;
        raw.readiness.path = "health".to_string();
        assert!(ConfigFile::try_from(raw).is_err());
    }

    #[test]
    fn zero_startup_timeout_is_rejected_but_zero_grace_is_not() {
        let mut raw = RawConfigFile::default();
        raw.shutdown.grace_period = "0s".to_string();
        assert!(ConfigFile::try_from(raw.clone()).is_ok());

        raw.readiness.startup_timeout = "0ms".to_string();
        assert!(ConfigFile::try_from(raw).is_err());
    }
}
