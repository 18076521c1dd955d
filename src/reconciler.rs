//! Reconciler between the plan and the registry.
//!
//! This module compares the change rows recorded in the registry with the
//! change chain derived from the plan, and works out which changes are
//! deployed and which are pending. A registry that records changes the
//! plan cannot reach is rejected.

use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::{ReconcileError, Result};
use crate::plan::{ChangeHasher, FullChange, Plan};
use crate::registry::{ChangeRow, Registry};

/// Outcome of comparing the registry with the plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// First plan change that is not deployed.
    pub first_undeployed: Option<FullChange>,
    /// Last plan change that is deployed.
    pub last_deployed: Option<FullChange>,
    /// Number of deployed plan changes.
    pub deployed_count: usize,
}

impl Reconciliation {
    /// Returns true if every plan change is deployed.
    #[must_use]
    pub const fn is_up_to_date(&self) -> bool {
        self.first_undeployed.is_none()
    }

    /// Returns the plan changes that are not deployed yet, in order.
    #[must_use]
    pub fn pending(&self, plan: &Plan) -> Vec<FullChange> {
        plan.full_changes().skip(self.deployed_count).collect()
    }
}

/// Checks registry rows against the plan's change chain.
///
/// The registry is consistent when its ids are exactly a prefix of the
/// plan's chain.
///
/// # Errors
///
/// Returns `UnknownChanges` listing, in ascending order, every registry id
/// that the plan does not reach before its first undeployed change.
pub fn validate_against_plan(
    rows: &[ChangeRow],
    plan: &Plan,
) -> std::result::Result<Reconciliation, ReconcileError> {
    let mut recorded: HashSet<&str> = rows.iter().map(|row| row.change_id.as_str()).collect();

    let mut reconciliation = Reconciliation::default();
    for change in plan.full_changes() {
        if recorded.remove(change.id.as_str()) {
            reconciliation.deployed_count += 1;
            reconciliation.last_deployed = Some(change);
        } else {
            reconciliation.first_undeployed = Some(change);
            break;
        }
    }

    if !recorded.is_empty() {
        let mut ids: Vec<String> = recorded.into_iter().map(str::to_string).collect();
        ids.sort_unstable();
        return Err(ReconcileError::UnknownChanges { ids });
    }

    Ok(reconciliation)
}

/// Reads the registry and reconciles it with a plan.
pub struct Reconciler<'a, R: Registry> {
    /// Plan to compare against.
    plan: &'a Plan,
    /// Registry backend.
    registry: &'a R,
}

impl<'a, R: Registry> Reconciler<'a, R> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(plan: &'a Plan, registry: &'a R) -> Self {
        Self { plan, registry }
    }

    /// Reads the registry once and validates it against the plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read or disagrees with
    /// the plan.
    pub async fn check(&self) -> Result<Reconciliation> {
        let project = self.plan.project();
        let rows = self.registry.changes(project).await?;
        debug!(
            "Validating {} registry rows against {} plan changes",
            rows.len(),
            self.plan.len()
        );

        match validate_against_plan(&rows, self.plan) {
            Ok(reconciliation) => {
                info!(
                    "{} of {} changes deployed",
                    reconciliation.deployed_count,
                    self.plan.len()
                );
                Ok(reconciliation)
            }
            Err(err) => {
                warn!("Registry has diverged from the plan");
                Err(err.into())
            }
        }
    }

    /// Summarizes what is deployed and what is pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read or disagrees with
    /// the plan.
    pub async fn status(&self) -> Result<RegistryStatus> {
        let reconciliation = self.check().await?;

        Ok(RegistryStatus {
            project: self.plan.project().to_string(),
            backend: self.registry.backend_type().to_string(),
            planned: self.plan.len(),
            deployed: reconciliation.deployed_count,
            last_deployed: reconciliation
                .last_deployed
                .as_ref()
                .map(|change| change.name().to_string()),
            last_deployed_id: reconciliation
                .last_deployed
                .as_ref()
                .map(|change| change.id.clone()),
            pending: reconciliation
                .pending(self.plan)
                .iter()
                .map(|change| change.name().to_string())
                .collect(),
        })
    }
}

/// Deployment status of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryStatus {
    /// Project name.
    pub project: String,
    /// Registry backend type.
    pub backend: String,
    /// Number of changes in the plan.
    pub planned: usize,
    /// Number of deployed changes.
    pub deployed: usize,
    /// Name of the last deployed change.
    pub last_deployed: Option<String>,
    /// Id of the last deployed change.
    pub last_deployed_id: Option<String>,
    /// Names of changes not deployed yet.
    pub pending: Vec<String>,
}

impl RegistryStatus {
    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

impl std::fmt::Display for RegistryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Project: {}", self.project)?;
        writeln!(f, "Deployed: {} of {}", self.deployed, self.planned)?;

        match (&self.last_deployed, &self.last_deployed_id) {
            (Some(name), Some(id)) => {
                writeln!(f, "Last deployed: {name} ({})", ChangeHasher::short_id(id))?;
            }
            _ => writeln!(f, "Last deployed: none")?,
        }

        if self.is_up_to_date() {
            write!(f, "Nothing to deploy - registry is up to date")?;
        } else {
            writeln!(f, "Pending:")?;
            for name in &self.pending {
                writeln!(f, "  - {name}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::example_plan;
    use crate::registry::{Identity, MemoryRegistry};

    fn rows_for(plan: &Plan, count: usize) -> Vec<ChangeRow> {
        let committer = Identity::new("Operator", "ops@example.com");
        plan.full_changes()
            .take(count)
            .map(|change| ChangeRow::deployed(&change, plan.project(), None, &committer))
            .collect()
    }

    fn unknown_row(plan: &Plan, id: &str) -> ChangeRow {
        let mut row = rows_for(plan, 1).remove(0);
        row.change_id = id.to_string();
        row
    }

    #[test]
    fn test_empty_registry() {
        let plan = example_plan();
        let reconciliation = validate_against_plan(&[], &plan).unwrap();

        assert_eq!(
            reconciliation.first_undeployed,
            plan.full_changes().next()
        );
        assert_eq!(reconciliation.last_deployed, None);
        assert_eq!(reconciliation.deployed_count, 0);
        assert_eq!(reconciliation.pending(&plan).len(), 2);
    }

    #[test]
    fn test_partially_deployed() {
        let plan = example_plan();
        let reconciliation = validate_against_plan(&rows_for(&plan, 1), &plan).unwrap();

        let first = plan.full_changes().next().unwrap();
        let undeployed = reconciliation.first_undeployed.clone().unwrap();
        assert_eq!(undeployed.name(), "change_num2");
        assert_eq!(undeployed.parent.as_deref(), Some(first.id.as_str()));
        assert_eq!(reconciliation.last_deployed, Some(first));

        let pending = reconciliation.pending(&plan);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name(), "change_num2");
    }

    #[test]
    fn test_all_deployed() {
        let plan = example_plan();
        let reconciliation = validate_against_plan(&rows_for(&plan, 2), &plan).unwrap();

        assert!(reconciliation.is_up_to_date());
        assert_eq!(reconciliation.deployed_count, 2);
        assert_eq!(reconciliation.last_deployed, plan.full_changes().last());
        assert!(reconciliation.pending(&plan).is_empty());
    }

    #[test]
    fn test_empty_plan_and_registry() {
        let plan = Plan::new("quitch", vec![]);
        let reconciliation = validate_against_plan(&[], &plan).unwrap();
        assert_eq!(reconciliation, Reconciliation::default());
    }

    #[test]
    fn test_unknown_ids_are_sorted() {
        let plan = example_plan();
        let mut rows = rows_for(&plan, 1);
        rows.push(unknown_row(&plan, "ffff"));
        rows.push(unknown_row(&plan, "0000"));

        let err = validate_against_plan(&rows, &plan).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::UnknownChanges {
                ids: vec!["0000".into(), "ffff".into()]
            }
        );
    }

    #[test]
    fn test_gap_in_chain_is_rejected() {
        let plan = example_plan();
        // Only the second change is recorded: the walk stops at the first
        // change, so the second id is never reached.
        let rows = rows_for(&plan, 2).split_off(1);
        let second_id = rows[0].change_id.clone();

        let err = validate_against_plan(&rows, &plan).unwrap_err();
        assert_eq!(err, ReconcileError::UnknownChanges { ids: vec![second_id] });
    }

    #[test]
    fn test_rows_against_empty_plan() {
        let plan = example_plan();
        let rows = rows_for(&plan, 1);
        let empty = Plan::new("quitch", vec![]);

        assert!(validate_against_plan(&rows, &empty).is_err());
    }

    #[tokio::test]
    async fn test_status_from_registry() {
        let plan = example_plan();
        let registry = MemoryRegistry::with_changes(rows_for(&plan, 1));

        let status = Reconciler::new(&plan, &registry).status().await.unwrap();

        assert_eq!(status.project, "quitch");
        assert_eq!(status.backend, "memory");
        assert_eq!(status.deployed, 1);
        assert_eq!(status.planned, 2);
        assert_eq!(status.last_deployed.as_deref(), Some("change_name"));
        assert_eq!(status.pending, vec!["change_num2".to_string()]);
        assert!(status.to_string().contains("Deployed: 1 of 2"));
    }

    #[tokio::test]
    async fn test_check_ignores_other_projects() {
        let plan = example_plan();
        let committer = Identity::new("Operator", "ops@example.com");
        let change = plan.full_changes().next().unwrap();
        let registry = MemoryRegistry::with_changes(vec![ChangeRow::deployed(
            &change, "other", None, &committer,
        )]);

        let reconciliation = Reconciler::new(&plan, &registry).check().await.unwrap();
        assert_eq!(reconciliation.deployed_count, 0);
    }
}
