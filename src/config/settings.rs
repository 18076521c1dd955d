//! Effective settings for a run.
//!
//! Settings are resolved from, in order of precedence: command-line flags,
//! environment variables, the project file, the user file, and built-in
//! defaults.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::registry::Identity;
use crate::target::MysqlTarget;

use super::spec::QuitchConfig;

/// Registry schema used when none is configured.
pub const DEFAULT_REGISTRY: &str = "sqitch";

/// Plan file used when none is configured.
pub const DEFAULT_PLAN_FILE: &str = "sqitch.plan";

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `--target`.
    pub target: Option<MysqlTarget>,
    /// `--registry`.
    pub registry: Option<String>,
    /// `--plan-file`.
    pub plan_file: Option<PathBuf>,
}

/// Resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Target database, if configured.
    pub target: Option<MysqlTarget>,
    /// Registry schema name.
    pub registry: String,
    /// Path to the plan file.
    pub plan_file: PathBuf,
    /// Directory holding `deploy/` and `revert/` scripts.
    pub top_dir: PathBuf,
    /// Identity recorded on registry rows and events.
    pub committer: Identity,
}

impl Settings {
    /// Resolves settings from flags and merged configuration.
    ///
    /// `config` already has environment overrides applied. `env` is used to
    /// build the default committer identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured target URL is invalid.
    pub fn resolve(
        cli: CliOverrides,
        config: QuitchConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let target = match cli.target {
            Some(target) => Some(target),
            None => config
                .target
                .as_deref()
                .map(str::parse::<MysqlTarget>)
                .transpose()?,
        };

        let plan_file = cli
            .plan_file
            .or(config.plan_file)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PLAN_FILE));

        let top_dir = config
            .top_dir
            .unwrap_or_else(|| plan_directory(&plan_file));

        let default = default_committer(&env);
        let committer = Identity::new(
            config.user.name.unwrap_or(default.name),
            config.user.email.unwrap_or(default.email),
        );

        let settings = Self {
            target,
            registry: cli
                .registry
                .or(config.registry)
                .unwrap_or_else(|| DEFAULT_REGISTRY.to_string()),
            plan_file,
            top_dir,
            committer,
        };
        debug!(
            "Using plan {}, registry {}, committer {}",
            settings.plan_file.display(),
            settings.registry,
            settings.committer
        );
        Ok(settings)
    }

    /// Returns the target database.
    ///
    /// # Errors
    ///
    /// Returns `MissingTarget` if no target was configured.
    pub fn require_target(&self) -> Result<&MysqlTarget> {
        self.target
            .as_ref()
            .ok_or_else(|| ConfigError::MissingTarget.into())
    }
}

/// Returns the directory containing the plan file.
fn plan_directory(plan_file: &Path) -> PathBuf {
    match plan_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Builds `$USER <$USER@hostname>`.
fn default_committer(env: &impl Fn(&str) -> Option<String>) -> Identity {
    let user = env("USER")
        .or_else(|| env("USERNAME"))
        .unwrap_or_else(|| String::from("quitch"));
    let host = hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| String::from("localhost"));

    Identity::new(user.clone(), format!("{user}@{host}"))
}
