// src/config/mod.rs

//! Configuration loading and validation.

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{
    default_config_path, load_and_validate, load_from_path, load_or_default, load_raw_or_default,
};
pub use model::{
    BackendSection, ConfigFile, RawConfigFile, ReadinessSection, ReadinessSettings,
    ShutdownSection, ShutdownSettings, DEFAULT_HOST, DEFAULT_PORT,
};
