//! Configuration parser for loading and merging configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, QuitchError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::QuitchConfig;

/// Environment variable holding the target URL.
pub const ENV_TARGET: &str = "QUITCH_TARGET";
/// Environment variable holding the registry name.
pub const ENV_REGISTRY: &str = "QUITCH_REGISTRY";
/// Environment variable holding the plan file path.
pub const ENV_PLAN_FILE: &str = "QUITCH_PLAN_FILE";
/// Environment variable holding the committer name.
pub const ENV_USER_NAME: &str = "QUITCH_USER_NAME";
/// Environment variable holding the committer email.
pub const ENV_USER_EMAIL: &str = "QUITCH_USER_EMAIL";

/// Configuration parser for loading quitch configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// Relative paths in the file are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<QuitchConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(QuitchError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            QuitchError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        let mut config = self.parse_yaml(&content, Some(path))?;
        if let Some(dir) = path.parent() {
            resolve_relative(&mut config, dir);
        }
        Ok(config)
    }

    /// Parses configuration from a YAML string.
    ///
    /// An empty document is an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<QuitchConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(QuitchConfig::default());
        }

        let config: QuitchConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            QuitchError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        Ok(config)
    }

    /// Loads the user configuration file, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_user_config(&self) -> Result<Option<QuitchConfig>> {
        let Some(path) = user_config_path() else {
            debug!("No user configuration directory");
            return Ok(None);
        };

        if path.exists() {
            self.load_file(&path).map(Some)
        } else {
            debug!("User configuration not found at: {}", path.display());
            Ok(None)
        }
    }

    /// Applies environment variable overrides to the configuration.
    ///
    /// `env` looks a variable up by name.
    pub fn apply_env_overrides(config: &mut QuitchConfig, env: impl Fn(&str) -> Option<String>) {
        if let Some(target) = env(ENV_TARGET) {
            debug!("Overriding target from environment");
            config.target = Some(target);
        }

        if let Some(registry) = env(ENV_REGISTRY) {
            debug!("Overriding registry from environment");
            config.registry = Some(registry);
        }

        if let Some(plan_file) = env(ENV_PLAN_FILE) {
            debug!("Overriding plan_file from environment");
            config.plan_file = Some(PathBuf::from(plan_file));
        }

        if let Some(name) = env(ENV_USER_NAME) {
            config.user.name = Some(name);
        }

        if let Some(email) = env(ENV_USER_EMAIL) {
            config.user.email = Some(email);
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                QuitchError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

fn resolve_relative(config: &mut QuitchConfig, dir: &Path) {
    for path in [&mut config.plan_file, &mut config.top_dir].into_iter().flatten() {
        if path.is_relative() {
            *path = dir.join(&*path);
        }
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["quitch.yaml", "quitch.yml"];

/// Returns the path of the user configuration file.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("quitch").join("config.yaml"))
}

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(QuitchError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
