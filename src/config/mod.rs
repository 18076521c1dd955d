//! Configuration module for quitch.
//!
//! This module handles all configuration-related functionality:
//! - Parsing `quitch.yaml` and the user configuration file
//! - Environment variable overrides and `.env` loading
//! - Resolving the effective settings for a run

mod parser;
mod settings;
mod spec;

pub use parser::{
    ConfigParser, DEFAULT_CONFIG_FILES, ENV_PLAN_FILE, ENV_REGISTRY, ENV_TARGET, ENV_USER_EMAIL,
    ENV_USER_NAME, find_config_file, user_config_path,
};
pub use settings::{CliOverrides, DEFAULT_PLAN_FILE, DEFAULT_REGISTRY, Settings};
pub use spec::{QuitchConfig, UserConfig};
