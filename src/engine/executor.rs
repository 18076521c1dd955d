//! Change engine for deploying and reverting plan changes.
//!
//! Every operation starts by reconciling the registry with the plan. Scripts
//! run before the registry is touched, and a failing script is recorded as a
//! `fail` event and leaves the deployed rows as they were.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{EngineError, QuitchError, Result};
use crate::plan::{ChangeHasher, FullChange, Plan};
use crate::reconciler::{Reconciler, Reconciliation};
use crate::registry::{ChangeRow, EventKind, EventRow, Identity, Registry};
use crate::target::{ScriptKind, ScriptLocator, ScriptRunner};

use super::selection::{deploy_selection, revert_target};

/// Operation performed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineAction {
    /// Apply pending changes.
    Deploy,
    /// Undo the last deployed change.
    Revert,
}

impl EngineAction {
    /// Returns the verb used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::Revert => "revert",
        }
    }
}

/// A change processed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedChange {
    /// Change name.
    pub name: String,
    /// Change id.
    pub id: String,
}

/// Result of a deploy or revert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    /// What was done.
    pub action: EngineAction,
    /// Project name.
    pub project: String,
    /// Changes processed, in order.
    pub changes: Vec<ProcessedChange>,
}

impl ExecutionReport {
    fn new(action: EngineAction, project: &str) -> Self {
        Self {
            action,
            project: project.to_string(),
            changes: Vec::new(),
        }
    }

    fn push(&mut self, change: &FullChange) {
        self.changes.push(ProcessedChange {
            name: change.name().to_string(),
            id: change.id.clone(),
        });
    }

    /// Returns true if no change was processed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl std::fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "Nothing to {}", self.action.as_str());
        }

        let verb = match self.action {
            EngineAction::Deploy => "Deployed",
            EngineAction::Revert => "Reverted",
        };
        writeln!(f, "{verb} {} change(s) in {}:", self.changes.len(), self.project)?;
        for change in &self.changes {
            writeln!(f, "  - {} ({})", change.name, ChangeHasher::short_id(&change.id))?;
        }
        Ok(())
    }
}

/// Engine that deploys and reverts plan changes on a target.
pub struct ChangeEngine<'a, R: Registry, S: ScriptRunner> {
    /// Plan being applied.
    plan: &'a Plan,
    /// Registry backend.
    registry: &'a R,
    /// Runs scripts on the target.
    runner: &'a S,
    /// Finds scripts on disk.
    scripts: &'a ScriptLocator,
    /// Identity recorded on rows and events.
    committer: &'a Identity,
    /// Hashes deploy scripts.
    hasher: ChangeHasher,
}

impl<'a, R: Registry, S: ScriptRunner> ChangeEngine<'a, R, S> {
    /// Creates a new engine.
    #[must_use]
    pub const fn new(
        plan: &'a Plan,
        registry: &'a R,
        runner: &'a S,
        scripts: &'a ScriptLocator,
        committer: &'a Identity,
    ) -> Self {
        Self {
            plan,
            registry,
            runner,
            scripts,
            committer,
            hasher: ChangeHasher::new(),
        }
    }

    async fn reconcile(&self) -> Result<Reconciliation> {
        Reconciler::new(self.plan, self.registry).check().await
    }

    /// Reverts the last deployed change.
    ///
    /// # Errors
    ///
    /// Returns `NothingToRevert` if no change is deployed, and an error if
    /// the registry is inconsistent, the script is missing, or it fails.
    pub async fn revert(&self) -> Result<ExecutionReport> {
        let reconciliation = self.reconcile().await?;
        let change = revert_target(self.plan, &reconciliation)?;

        let sql = self.scripts.read(ScriptKind::Revert, change.name()).await?;
        self.run(EngineAction::Revert, &change, &sql).await?;

        let deleted = self.registry.delete_change(&change.id).await;
        self.after_script(&change, deleted).await?;
        self.record(EventKind::Revert, &change).await?;
        info!("Reverted {}", change.name());

        let mut report = ExecutionReport::new(EngineAction::Revert, self.plan.project());
        report.push(&change);
        Ok(report)
    }

    /// Deploys pending changes in plan order, up to `to` if given.
    ///
    /// Every deploy script is read before any of them runs. Each change is
    /// then deployed and recorded on its own. On failure the changes
    /// deployed before it stay recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry is inconsistent, `to` is not in the
    /// plan, or a script is missing or fails.
    pub async fn deploy(&self, to: Option<&str>) -> Result<ExecutionReport> {
        let reconciliation = self.reconcile().await?;
        let selection = deploy_selection(self.plan, &reconciliation, to)?;

        let mut report = ExecutionReport::new(EngineAction::Deploy, self.plan.project());
        if selection.is_empty() {
            info!("Nothing to deploy");
            return Ok(report);
        }

        // Every script must exist before the first one runs.
        let mut scripts = Vec::with_capacity(selection.len());
        for change in selection {
            let sql = self.scripts.read(ScriptKind::Deploy, change.name()).await?;
            scripts.push((change, sql));
        }

        self.registry
            .register_project(self.plan.project(), self.committer)
            .await?;

        for (change, sql) in &scripts {
            self.run(EngineAction::Deploy, change, sql).await?;

            let row = ChangeRow::deployed(
                change,
                self.plan.project(),
                Some(self.hasher.script_hash(sql)),
                self.committer,
            );
            let inserted = self.registry.insert_change(&row).await;
            self.after_script(change, inserted).await?;
            self.record(EventKind::Deploy, change).await?;
            info!("Deployed {}", change.name());

            report.push(change);
        }

        Ok(report)
    }

    /// Runs a change script, recording a `fail` event if it fails.
    async fn run(&self, action: EngineAction, change: &FullChange, sql: &str) -> Result<()> {
        info!("Running {} script for {}", action.as_str(), change.name());

        if let Err(err) = self.runner.run_script(sql).await {
            error!("Failed to {} {}: {err}", action.as_str(), change.name());
            if let Err(record_err) = self.record(EventKind::Fail, change).await {
                warn!("Could not record failure event: {record_err}");
            }
            return Err(QuitchError::from(EngineError::ScriptExecution {
                action: action.as_str().to_string(),
                change: change.name().to_string(),
                message: err.to_string(),
            }));
        }

        Ok(())
    }

    /// Records a `fail` event when the registry update after a script fails.
    async fn after_script(&self, change: &FullChange, outcome: Result<()>) -> Result<()> {
        if let Err(err) = outcome {
            error!("Script for {} ran but the registry was not updated: {err}", change.name());
            if let Err(record_err) = self.record(EventKind::Fail, change).await {
                warn!("Could not record failure event: {record_err}");
            }
            return Err(err);
        }
        Ok(())
    }

    async fn record(&self, kind: EventKind, change: &FullChange) -> Result<()> {
        let event = EventRow::new(kind, change, self.plan.project(), self.committer);
        self.registry.add_event(&event).await
    }
}
