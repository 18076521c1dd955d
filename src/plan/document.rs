//! The plan document.
//!
//! A plan file starts with a syntax version pragma, followed by metadata
//! pragmas (`%key=value`), blank lines, and one line per change in deploy
//! order.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::ParseError;

use super::chain::{FullChange, FullChanges};
use super::change::Change;

/// The only supported plan syntax version.
pub const SYNTAX_VERSION: &str = "1.0.0";

/// Metadata key holding the project name.
const PROJECT_KEY: &str = "project";

/// Metadata key holding the syntax version.
const SYNTAX_VERSION_KEY: &str = "syntax-version";

/// An ordered plan of changes for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Project name.
    project: String,
    /// Metadata pragmas other than the project and syntax version.
    metadata: BTreeMap<String, String>,
    /// Changes in deploy order.
    changes: Vec<Change>,
}

impl Plan {
    /// Creates a plan from a project name and its changes.
    #[must_use]
    pub fn new(project: impl Into<String>, changes: Vec<Change>) -> Self {
        Self {
            project: project.into(),
            metadata: BTreeMap::new(),
            changes,
        }
    }

    /// Returns the project name.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Returns the metadata pragmas other than project and syntax version.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Returns the planned changes in deploy order.
    #[must_use]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Returns true if the plan has no changes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns the number of changes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.changes.len()
    }

    /// Parses a plan document.
    ///
    /// # Errors
    ///
    /// Returns an error if the syntax version is unsupported, if any change
    /// line is malformed, or if two changes share a name. The first error
    /// aborts parsing.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());

        let first = lines.next().map(str::trim);
        if first != Some(syntax_version_line().as_str()) {
            return Err(ParseError::UnsupportedSyntax {
                found: first.map(str::to_string),
            });
        }

        let mut project = String::new();
        let mut metadata = BTreeMap::new();
        let mut changes = Vec::new();
        let mut names = HashSet::new();

        for line in lines.map(str::trim) {
            if let Some(pragma) = line.strip_prefix('%') {
                let (key, value) = pragma.split_once('=').unwrap_or((pragma, ""));
                let (key, value) = (key.trim(), value.trim());
                match key {
                    PROJECT_KEY => value.clone_into(&mut project),
                    SYNTAX_VERSION_KEY => {}
                    _ => {
                        metadata.insert(key.to_string(), value.to_string());
                    }
                }
                continue;
            }

            let change = Change::parse_line(line)?;
            if !names.insert(change.name.clone()) {
                return Err(ParseError::DuplicateChange { name: change.name });
            }
            changes.push(change);
        }

        debug!("Parsed plan for project '{}' with {} changes", project, changes.len());

        Ok(Self {
            project,
            metadata,
            changes,
        })
    }

    /// Formats the plan as a plan document with a trailing newline.
    #[must_use]
    pub fn format(&self) -> String {
        let mut lines = vec![
            syntax_version_line(),
            format!("%{PROJECT_KEY}={}", self.project),
        ];
        lines.extend(self.metadata.iter().map(|(key, value)| {
            if value.is_empty() {
                format!("%{key}")
            } else {
                format!("%{key}={value}")
            }
        }));
        lines.push(String::new());
        lines.extend(self.changes.iter().map(Change::format_line));

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    /// Returns the changes with their chained ids, lazily.
    #[must_use]
    pub fn full_changes(&self) -> FullChanges<'_> {
        FullChanges::new(&self.project, &self.changes)
    }

    /// Finds a change by name, computing ids only up to the match.
    #[must_use]
    pub fn change_named(&self, name: &str) -> Option<FullChange> {
        self.full_changes().find(|change| change.name() == name)
    }
}

fn syntax_version_line() -> String {
    format!("%{SYNTAX_VERSION_KEY}={SYNTAX_VERSION}")
}

impl FromStr for Plan {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}
