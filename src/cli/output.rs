//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::engine::{EngineAction, ExecutionReport};
use crate::plan::{ChangeHasher, FullChange, Plan, format_date};
use crate::reconciler::RegistryStatus;
use crate::registry::{EventKind, EventRow};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Plan change row for table display.
#[derive(Tabled)]
struct PlanChangeRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Change")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Planned")]
    planned: String,
    #[tabled(rename = "Planner")]
    planner: String,
    #[tabled(rename = "Note")]
    note: String,
}

/// Event row for table display.
#[derive(Tabled)]
struct EventTableRow {
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "Change")]
    change: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "By")]
    committer: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the plan's changes for display.
    #[must_use]
    pub fn format_plan(&self, plan: &Plan) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&PlanJson::from(plan)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &Plan) -> String {
        let mut output = String::new();
        let _ = write!(output, "\nProject: {}\n\n", plan.project().bold());

        if plan.is_empty() {
            let _ = writeln!(output, "{} The plan is empty.", "⚠".yellow());
            return output;
        }

        let rows: Vec<PlanChangeRow> = plan
            .full_changes()
            .enumerate()
            .map(|(i, change)| PlanChangeRow {
                index: i + 1,
                name: change.name().to_string(),
                id: ChangeHasher::short_id(&change.id).to_string(),
                planned: format_date(change.change.date).to_string(),
                planner: change.change.planner.clone(),
                note: Self::truncate(change.change.note.lines().next().unwrap_or(""), 40),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');
        let _ = write!(output, "\n{} change(s)\n", plan.len());
        output
    }

    /// Formats a change with its hashed record.
    #[must_use]
    pub fn format_change(&self, project: &str, change: &FullChange) -> String {
        let record = change.canonical_record(project);
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&ChangeJson {
                name: change.name(),
                id: &change.id,
                parent: change.parent.as_deref(),
                record: &record,
            })
            .unwrap_or_default(),
            OutputFormat::Text => record,
        }
    }

    /// Formats deployment status.
    #[must_use]
    pub fn format_status(&self, status: &RegistryStatus) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(status).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = write!(
                    output,
                    "\nProject: {} ({} registry)\n\n",
                    status.project.bold(),
                    status.backend
                );
                let _ = writeln!(output, "   Deployed: {} of {}", status.deployed, status.planned);

                match (&status.last_deployed, &status.last_deployed_id) {
                    (Some(name), Some(id)) => {
                        let _ = writeln!(
                            output,
                            "   Last deployed: {name} ({})",
                            ChangeHasher::short_id(id).dimmed()
                        );
                    }
                    _ => {
                        let _ = writeln!(output, "   Last deployed: none");
                    }
                }

                if status.is_up_to_date() {
                    let _ = write!(output, "\n{} Nothing to deploy - up to date.\n", "✓".green());
                } else {
                    let _ = write!(output, "\n{} pending:\n", status.pending.len().to_string().yellow());
                    for name in &status.pending {
                        let _ = writeln!(output, "   - {name}");
                    }
                }
                output
            }
        }
    }

    /// Formats the result of a deploy or revert.
    #[must_use]
    pub fn format_report(&self, report: &ExecutionReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => {
                if report.is_empty() {
                    return format!("{} {report}\n", "✓".green());
                }

                let (verb, marker) = match report.action {
                    EngineAction::Deploy => ("Deployed", "+".green()),
                    EngineAction::Revert => ("Reverted", "-".red()),
                };
                let mut output = format!("{} {verb} {}\n\n", "✓".green(), report.project.bold());
                for change in &report.changes {
                    let _ = writeln!(
                        output,
                        "   {marker} {} ({})",
                        change.name,
                        ChangeHasher::short_id(&change.id).dimmed()
                    );
                }
                output
            }
        }
    }

    /// Formats registry events, oldest first.
    #[must_use]
    pub fn format_events(&self, events: &[EventRow]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(events).unwrap_or_default(),
            OutputFormat::Text => {
                if events.is_empty() {
                    return String::from("No events recorded.\n");
                }

                let rows: Vec<EventTableRow> = events
                    .iter()
                    .map(|event| EventTableRow {
                        when: event.committed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                        event: Self::format_event_kind(event.event),
                        change: event.change.clone(),
                        id: ChangeHasher::short_id(&event.change_id).to_string(),
                        committer: event.committer().to_string(),
                    })
                    .collect();

                let mut output = Table::new(rows).to_string();
                output.push('\n');
                output
            }
        }
    }

    /// Formats a warning message.
    #[must_use]
    pub fn format_warning(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": "warning", "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{} {message}\n", "⚠".yellow()),
        }
    }

    /// Formats an event kind with color.
    fn format_event_kind(kind: EventKind) -> String {
        match kind {
            EventKind::Deploy => "deploy".green().to_string(),
            EventKind::Revert => "revert".yellow().to_string(),
            EventKind::Fail => "fail".red().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct PlanJson {
    project: String,
    changes: Vec<PlanChangeJson>,
}

#[derive(Serialize)]
struct PlanChangeJson {
    name: String,
    id: String,
    parent: Option<String>,
    planned_at: String,
    planner: String,
    note: String,
}

impl From<&Plan> for PlanJson {
    fn from(plan: &Plan) -> Self {
        Self {
            project: plan.project().to_string(),
            changes: plan
                .full_changes()
                .map(|full| PlanChangeJson {
                    name: full.name().to_string(),
                    planned_at: format_date(full.change.date).to_string(),
                    planner: full.change.planner.clone(),
                    note: full.change.note.clone(),
                    id: full.id,
                    parent: full.parent,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ChangeJson<'a> {
    name: &'a str,
    id: &'a str,
    parent: Option<&'a str>,
    record: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::example_plan;

    #[test]
    fn test_plan_json_lists_chain() {
        let plan = example_plan();
        let json = OutputFormatter::new(OutputFormat::Json).format_plan(&plan);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let changes = value["changes"].as_array().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1]["id"], "2959791f9fb4db4c322a9fdf121215d5e8a6a601");
        assert_eq!(changes[1]["parent"], changes[0]["id"]);
        assert!(changes[0]["parent"].is_null());
    }

    #[test]
    fn test_plan_text_lists_changes() {
        colored::control::set_override(false);
        let text = OutputFormatter::new(OutputFormat::Text).format_plan(&example_plan());
        assert!(text.contains("change_num2"));
        assert!(text.contains("2959791f"));
        assert!(text.contains("2 change(s)"));
    }

    #[test]
    fn test_change_text_is_record() {
        let plan = example_plan();
        let change = plan.change_named("change_num2").unwrap();
        let text = OutputFormatter::new(OutputFormat::Text).format_change(plan.project(), &change);
        assert_eq!(text, change.canonical_record(plan.project()));
    }

    #[test]
    fn test_empty_events() {
        let text = OutputFormatter::new(OutputFormat::Text).format_events(&[]);
        assert_eq!(text, "No events recorded.\n");
        assert_eq!(OutputFormatter::new(OutputFormat::Json).format_events(&[]), "[]");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("a much longer note", 10), "a much ...");
    }
}
