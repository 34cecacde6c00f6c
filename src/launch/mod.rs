// src/launch/mod.rs

//! Where the backend lives and how it is invoked.
//!
//! - [`paths`] resolves the interpreter, entry script and working directory
//!   from the bridge directory.
//! - [`spec`] turns config + bridge directory into a [`LaunchSpec`].

pub mod paths;
pub mod spec;

pub use paths::{default_bridge_dir, interpreter_path, script_path, working_dir};
pub use spec::LaunchSpec;
