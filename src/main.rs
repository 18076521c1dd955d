//! Quitch CLI entrypoint.
//!
//! This is the main entrypoint for the quitch command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use quitch::cli::{Cli, Commands, OutputFormatter, ShowCommands};
use quitch::config::{ConfigParser, QuitchConfig, Settings, find_config_file};
use quitch::engine::ChangeEngine;
use quitch::error::{ConfigError, EngineError, QuitchError, Result};
use quitch::plan::Plan;
use quitch::reconciler::Reconciler;
use quitch::registry::{MySqlRegistry, Registry};
use quitch::target::{MySqlScriptRunner, ScriptLocator};

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let settings = load_settings(&cli)?;
    let plan = load_plan(&settings.plan_file).await?;

    match cli.command {
        Commands::Show {
            command: ShowCommands::Change { name },
        } => cmd_show_change(&plan, &name, &formatter),
        Commands::Plan => emit(&formatter.format_plan(&plan)),
        Commands::Deploy { to } => cmd_deploy(&settings, &plan, to.as_deref(), &formatter).await,
        Commands::Revert => cmd_revert(&settings, &plan, &formatter).await,
        Commands::Status => cmd_status(&settings, &plan, &formatter).await,
        Commands::Log { limit } => cmd_log(&settings, &plan, limit, &formatter).await,
    }
}

/// Print the hashed record of a change.
fn cmd_show_change(plan: &Plan, name: &str, formatter: &OutputFormatter) -> Result<()> {
    let change = plan
        .change_named(name)
        .ok_or_else(|| EngineError::UnknownChange {
            name: name.to_string(),
        })?;

    emit(&formatter.format_change(plan.project(), &change))
}

/// Deploy pending changes.
async fn cmd_deploy(
    settings: &Settings,
    plan: &Plan,
    to: Option<&str>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (runner, registry) = connect(settings).await?;
    let scripts = ScriptLocator::new(&settings.top_dir);

    let report = ChangeEngine::new(plan, &registry, &runner, &scripts, &settings.committer)
        .deploy(to)
        .await?;

    emit(&formatter.format_report(&report))
}

/// Revert the last deployed change.
async fn cmd_revert(settings: &Settings, plan: &Plan, formatter: &OutputFormatter) -> Result<()> {
    info!("Reverting only the last change");

    let (runner, registry) = connect(settings).await?;
    let scripts = ScriptLocator::new(&settings.top_dir);

    match ChangeEngine::new(plan, &registry, &runner, &scripts, &settings.committer)
        .revert()
        .await
    {
        Ok(report) => emit(&formatter.format_report(&report)),
        Err(e) if e.is_nothing_to_do() => {
            eprint!("{}", formatter.format_warning(&e.to_string()));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Show deployment status.
async fn cmd_status(settings: &Settings, plan: &Plan, formatter: &OutputFormatter) -> Result<()> {
    let (_runner, registry) = connect(settings).await?;
    let status = Reconciler::new(plan, &registry).status().await?;

    emit(&formatter.format_status(&status))
}

/// Show the registry event history.
async fn cmd_log(
    settings: &Settings,
    plan: &Plan,
    limit: Option<usize>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_runner, registry) = connect(settings).await?;
    let mut events = registry.events(plan.project()).await?;

    if let Some(limit) = limit {
        let skip = events.len().saturating_sub(limit);
        events.drain(..skip);
    }

    emit(&formatter.format_events(&events))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", output.trim_end())?;
    Ok(())
}

/// Resolves the configuration file path, if there is one.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Option<PathBuf> {
    config_path.map_or_else(|| find_config_file(".").ok(), |path| Some(path.clone()))
}

/// Loads configuration files and the environment, then applies flags.
fn load_settings(cli: &Cli) -> Result<Settings> {
    let config_file = resolve_config_path(cli.config.as_ref());

    let parser = ConfigParser::new().with_base_path(
        config_file
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new(".")),
    );
    parser.load_dotenv()?;

    let project = match &config_file {
        Some(path) => parser.load_file(path)?,
        None => {
            debug!("No project configuration file");
            QuitchConfig::default()
        }
    };
    let user = parser.load_user_config()?.unwrap_or_default();

    let mut config = project.or(user);
    ConfigParser::apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    Settings::resolve(cli.overrides(), config, |name| std::env::var(name).ok())
}

/// Reads and parses the plan file.
async fn load_plan(path: &Path) -> Result<Plan> {
    info!("Using plan file {}", path.display());

    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            QuitchError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            })
        } else {
            QuitchError::Io(e)
        }
    })?;

    let plan = Plan::parse(&text)?;
    if plan.is_empty() {
        warn!("The plan is empty");
    }
    Ok(plan)
}

/// Connects to the target database and its registry.
async fn connect(settings: &Settings) -> Result<(MySqlScriptRunner, MySqlRegistry)> {
    let target = settings.require_target()?;

    let runner = MySqlScriptRunner::connect(target).await?;
    let registry =
        MySqlRegistry::connect(target, &settings.registry, runner.pool(), &settings.committer)
            .await?;
    debug!("Using {} registry {}", registry.backend_type(), registry.name());

    Ok((runner, registry))
}
