//! Property-based tests for plans and the change-id chain.
//!
//! These tests verify:
//! - Plan documents survive a format → parse round trip
//! - Every id depends on all changes before it, and none after
//! - Any deployed prefix of the chain reconciles cleanly

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use quitch::plan::{Change, Plan};
use quitch::reconciler::validate_against_plan;
use quitch::registry::{ChangeRow, Identity};

// =============================================================================
// Strategies
// =============================================================================

/// Planned dates with whole seconds, as the plan format stores them.
fn date_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000).prop_map(|secs| DateTime::from_timestamp(secs, 0).unwrap())
}

fn planner_strategy() -> impl Strategy<Value = String> {
    ("[A-Z][a-z]{1,8}( [A-Z][a-z]{1,8})?", "[a-z]{1,8}@[a-z]{1,8}\\.com")
        .prop_map(|(name, email)| format!("{name} <{email}>"))
}

/// Notes without surrounding whitespace or backslashes; may span lines.
fn note_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[A-Za-z0-9][A-Za-z0-9 .,#\n]{0,30}[A-Za-z0-9]",
    ]
}

fn change_strategy(name: String) -> impl Strategy<Value = Change> {
    (date_strategy(), planner_strategy(), note_strategy()).prop_map(move |(date, planner, note)| {
        Change {
            name: name.clone(),
            note,
            date,
            planner,
        }
    })
}

fn plan_strategy() -> impl Strategy<Value = Plan> {
    (
        "[a-z][a-z0-9_-]{0,12}",
        prop::collection::btree_set("[a-z][a-z0-9_]{0,12}", 0..8),
    )
        .prop_flat_map(|(project, names)| {
            let changes: Vec<_> = names.into_iter().map(change_strategy).collect();
            (Just(project), changes)
        })
        .prop_map(|(project, changes)| Plan::new(project, changes))
}

fn deployed_rows(plan: &Plan, count: usize) -> Vec<ChangeRow> {
    let committer = Identity::new("Operator", "ops@example.com");
    plan.full_changes()
        .take(count)
        .map(|change| ChangeRow::deployed(&change, plan.project(), None, &committer))
        .collect()
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// format → parse is the identity on plans.
    #[test]
    fn plan_format_parse_roundtrip(plan in plan_strategy()) {
        let parsed = Plan::parse(&plan.format()).unwrap();
        prop_assert_eq!(parsed, plan);
    }

    /// Each change's parent is the id of the change before it.
    #[test]
    fn chain_links_parents(plan in plan_strategy()) {
        let full: Vec<_> = plan.full_changes().collect();
        prop_assert_eq!(full.len(), plan.len());

        let mut previous: Option<String> = None;
        for change in &full {
            prop_assert_eq!(change.parent.clone(), previous);
            prop_assert_eq!(change.id.len(), 40);
            previous = Some(change.id.clone());
        }
    }

    /// Editing one change alters its id and every later id, never earlier ones.
    #[test]
    fn edit_propagates_forward(plan in plan_strategy(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!plan.is_empty());
        let edited_at = pick.index(plan.len());

        let mut changes = plan.changes().to_vec();
        changes[edited_at].note.push_str(" (edited)");
        let edited = Plan::new(plan.project(), changes);

        for (i, (before, after)) in plan.full_changes().zip(edited.full_changes()).enumerate() {
            if i < edited_at {
                prop_assert_eq!(before.id, after.id);
            } else {
                prop_assert_ne!(before.id, after.id);
            }
        }
    }

    /// Any deployed prefix reconciles to exactly that many changes.
    #[test]
    fn deployed_prefix_reconciles(plan in plan_strategy(), pick in any::<prop::sample::Index>()) {
        let count = pick.index(plan.len() + 1);
        let reconciliation = validate_against_plan(&deployed_rows(&plan, count), &plan).unwrap();

        prop_assert_eq!(reconciliation.deployed_count, count);
        prop_assert_eq!(reconciliation.pending(&plan).len(), plan.len() - count);
        prop_assert_eq!(
            reconciliation.first_undeployed.map(|c| c.id),
            plan.full_changes().nth(count).map(|c| c.id)
        );
    }
}
