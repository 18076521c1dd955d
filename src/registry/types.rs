//! Registry row types.
//!
//! These mirror the `changes` and `events` tables of the registry schema:
//! one row per deployed change, and an append-only log of every deploy,
//! revert and failure.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::RegistryError;
use crate::plan::FullChange;

/// A person identity in `Name <email>` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Display name.
    pub name: String,
    /// Email address, empty if unknown.
    pub email: String,
}

/// A deployed change, as recorded in the registry `changes` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ChangeRow {
    /// Change id.
    pub change_id: String,
    /// Hash of the deploy script that was run.
    pub script_hash: Option<String>,
    /// Name of the change.
    pub change: String,
    /// Project the change belongs to.
    pub project: String,
    /// Change note.
    pub note: String,
    /// When the change was deployed.
    pub committed_at: DateTime<Utc>,
    /// Who deployed the change.
    pub committer_name: String,
    /// Email of who deployed the change.
    pub committer_email: String,
    /// When the change was planned.
    pub planned_at: DateTime<Utc>,
    /// Who planned the change.
    pub planner_name: String,
    /// Email of who planned the change.
    pub planner_email: String,
}

/// Kind of a registry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A change was deployed.
    Deploy,
    /// A change was reverted.
    Revert,
    /// A deploy or revert script failed.
    Fail,
}

/// An entry in the registry `events` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRow {
    /// What happened.
    pub event: EventKind,
    /// Change id.
    pub change_id: String,
    /// Name of the change.
    pub change: String,
    /// Project the change belongs to.
    pub project: String,
    /// Change note.
    pub note: String,
    /// When the event was recorded.
    pub committed_at: DateTime<Utc>,
    /// Who ran the operation.
    pub committer_name: String,
    /// Email of who ran the operation.
    pub committer_email: String,
    /// When the change was planned.
    pub planned_at: DateTime<Utc>,
    /// Who planned the change.
    pub planner_name: String,
    /// Email of who planned the change.
    pub planner_email: String,
}

impl Identity {
    /// Creates an identity from a name and email.
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Splits `Name <email>` into its parts.
    ///
    /// Text without an `<email>` suffix is taken as the name.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Some((name, rest)) = text.split_once('<')
            && let Some(email) = rest.strip_suffix('>')
        {
            return Self::new(name.trim(), email.trim());
        }
        Self::new(text, "")
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.email.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} <{}>", self.name, self.email)
        }
    }
}

impl ChangeRow {
    /// Builds the row recorded when `change` is deployed now.
    #[must_use]
    pub fn deployed(
        change: &FullChange,
        project: &str,
        script_hash: Option<String>,
        committer: &Identity,
    ) -> Self {
        let planner = Identity::parse(&change.change.planner);
        Self {
            change_id: change.id.clone(),
            script_hash,
            change: change.name().to_string(),
            project: project.to_string(),
            note: change.change.note.clone(),
            committed_at: Utc::now(),
            committer_name: committer.name.clone(),
            committer_email: committer.email.clone(),
            planned_at: change.change.date,
            planner_name: planner.name,
            planner_email: planner.email,
        }
    }
}

impl EventKind {
    /// Returns the value stored in the `event` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::Revert => "revert",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deploy" => Ok(Self::Deploy),
            "revert" => Ok(Self::Revert),
            "fail" => Ok(Self::Fail),
            other => Err(RegistryError::CorruptRow {
                message: format!("unknown event kind `{other}`"),
            }),
        }
    }
}

impl EventRow {
    /// Builds an event for `change`, recorded now.
    #[must_use]
    pub fn new(event: EventKind, change: &FullChange, project: &str, committer: &Identity) -> Self {
        let planner = Identity::parse(&change.change.planner);
        Self {
            event,
            change_id: change.id.clone(),
            change: change.name().to_string(),
            project: project.to_string(),
            note: change.change.note.clone(),
            committed_at: Utc::now(),
            committer_name: committer.name.clone(),
            committer_email: committer.email.clone(),
            planned_at: change.change.date,
            planner_name: planner.name,
            planner_email: planner.email,
        }
    }

    /// Returns the identity that recorded this event.
    #[must_use]
    pub fn committer(&self) -> Identity {
        Identity::new(&self.committer_name, &self.committer_email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::example_plan;

    #[test]
    fn test_identity_parse() {
        let identity = Identity::parse("Ruslan Fadeev <github@kinrany.dev>");
        assert_eq!(identity, Identity::new("Ruslan Fadeev", "github@kinrany.dev"));
        assert_eq!(identity.to_string(), "Ruslan Fadeev <github@kinrany.dev>");
    }

    #[test]
    fn test_identity_without_email() {
        let identity = Identity::parse("  deploy-bot ");
        assert_eq!(identity, Identity::new("deploy-bot", ""));
        assert_eq!(identity.to_string(), "deploy-bot");
    }

    #[test]
    fn test_event_kind_round_trip() {
        for kind in [EventKind::Deploy, EventKind::Revert, EventKind::Fail] {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("merge".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_rows_split_planner() {
        let plan = example_plan();
        let change = plan.full_changes().next().unwrap();
        let committer = Identity::new("Operator", "ops@example.com");

        let row = ChangeRow::deployed(&change, plan.project(), None, &committer);
        assert_eq!(row.change_id, change.id);
        assert_eq!(row.planner_name, "Ruslan Fadeev");
        assert_eq!(row.planner_email, "github@kinrany.dev");
        assert_eq!(row.committer_email, "ops@example.com");

        let event = EventRow::new(EventKind::Fail, &change, plan.project(), &committer);
        assert_eq!(event.event, EventKind::Fail);
        assert_eq!(event.committer(), committer);
        assert_eq!(event.planned_at, change.change.date);
    }
}
