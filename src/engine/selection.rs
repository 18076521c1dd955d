//! Choosing which changes a deploy or revert touches.

use crate::error::EngineError;
use crate::plan::{FullChange, Plan};
use crate::reconciler::Reconciliation;

/// Returns the change a revert should undo: the last deployed one.
///
/// # Errors
///
/// Returns `NothingToRevert` if no change is deployed.
pub fn revert_target(
    plan: &Plan,
    reconciliation: &Reconciliation,
) -> Result<FullChange, EngineError> {
    reconciliation
        .last_deployed
        .clone()
        .ok_or(EngineError::NothingToRevert {
            plan_empty: plan.is_empty(),
        })
}

/// Returns the pending changes a deploy should apply, in plan order.
///
/// With `to`, stops after the named change. A `to` change that is already
/// deployed selects nothing.
///
/// # Errors
///
/// Returns `UnknownChange` if `to` is not in the plan.
pub fn deploy_selection(
    plan: &Plan,
    reconciliation: &Reconciliation,
    to: Option<&str>,
) -> Result<Vec<FullChange>, EngineError> {
    let end = match to {
        Some(name) => {
            let position = plan
                .changes()
                .iter()
                .position(|change| change.name == name)
                .ok_or_else(|| EngineError::UnknownChange {
                    name: name.to_string(),
                })?;
            position + 1
        }
        None => plan.len(),
    };

    Ok(plan
        .full_changes()
        .take(end)
        .skip(reconciliation.deployed_count)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::example_plan;

    fn deployed(plan: &Plan, count: usize) -> Reconciliation {
        Reconciliation {
            first_undeployed: plan.full_changes().nth(count),
            last_deployed: count.checked_sub(1).and_then(|i| plan.full_changes().nth(i)),
            deployed_count: count,
        }
    }

    #[test]
    fn test_revert_target_is_last_deployed() {
        let plan = example_plan();

        let target = revert_target(&plan, &deployed(&plan, 2)).unwrap();
        assert_eq!(target.name(), "change_num2");

        let target = revert_target(&plan, &deployed(&plan, 1)).unwrap();
        assert_eq!(target.name(), "change_name");
    }

    #[test]
    fn test_nothing_to_revert() {
        let plan = example_plan();
        assert!(matches!(
            revert_target(&plan, &deployed(&plan, 0)),
            Err(EngineError::NothingToRevert { plan_empty: false })
        ));

        let empty = Plan::new("quitch", vec![]);
        assert!(matches!(
            revert_target(&empty, &Reconciliation::default()),
            Err(EngineError::NothingToRevert { plan_empty: true })
        ));
    }

    #[test]
    fn test_deploy_everything_pending() {
        let plan = example_plan();

        let names: Vec<_> = deploy_selection(&plan, &deployed(&plan, 0), None)
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, ["change_name", "change_num2"]);

        let selection = deploy_selection(&plan, &deployed(&plan, 1), None).unwrap();
        assert_eq!(selection.len(), 1);
        assert_eq!(selection[0].name(), "change_num2");

        assert!(deploy_selection(&plan, &deployed(&plan, 2), None).unwrap().is_empty());
    }

    #[test]
    fn test_deploy_up_to_change() {
        let plan = example_plan();

        let selection = deploy_selection(&plan, &deployed(&plan, 0), Some("change_name")).unwrap();
        assert_eq!(selection.len(), 1);
        assert_eq!(selection[0].name(), "change_name");

        // Already deployed.
        assert!(
            deploy_selection(&plan, &deployed(&plan, 1), Some("change_name"))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_deploy_to_unknown_change() {
        let plan = example_plan();
        assert!(matches!(
            deploy_selection(&plan, &deployed(&plan, 0), Some("missing")),
            Err(EngineError::UnknownChange { name }) if name == "missing"
        ));
    }
}
