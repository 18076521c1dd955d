//! A single planned change and its plan-file line codec.
//!
//! A change line looks like
//! `<name> <ISO8601-date> <planner> # <note>`, where newlines in the note
//! are written as the two characters `\n`.

use chrono::{DateTime, Utc};
use std::fmt::Display;

use crate::error::ParseError;

/// Format used for planned dates, truncated to whole seconds.
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One migration step declared in the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Change name, unique within a project.
    pub name: String,
    /// Free-form note, may contain newlines.
    pub note: String,
    /// When the change was planned.
    pub date: DateTime<Utc>,
    /// Who planned the change, usually `Name <email>`.
    pub planner: String,
}

impl Change {
    /// Parses a change line from a plan file.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or date is not followed by whitespace, or
    /// if the date is not a valid ISO-8601 instant.
    pub fn parse_line(line: &str) -> Result<Self, ParseError> {
        let Some((name, rest)) = line.split_once(char::is_whitespace) else {
            return Err(ParseError::MissingSpaceAfterName {
                line: line.to_string(),
            });
        };

        let Some((date, rest)) = rest.trim_start().split_once(char::is_whitespace) else {
            return Err(ParseError::MissingSpaceAfterDate {
                line: line.to_string(),
            });
        };

        let date = date
            .parse::<DateTime<Utc>>()
            .map_err(|e| ParseError::InvalidDate {
                line: line.to_string(),
                message: e.to_string(),
            })?;

        let (planner, note) = match rest.split_once('#') {
            Some((planner, note)) => (planner.trim(), unescape_note(note.trim())),
            None => (rest.trim(), String::new()),
        };

        Ok(Self {
            name: name.to_string(),
            note,
            date,
            planner: planner.to_string(),
        })
    }

    /// Formats the change as a plan-file line.
    ///
    /// Sub-second precision of the date is dropped.
    #[must_use]
    pub fn format_line(&self) -> String {
        format!(
            "{} {} {} # {}",
            self.name,
            format_date(self.date),
            self.planner,
            escape_note(&self.note),
        )
    }
}

/// Formats a planned date as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_date(date: DateTime<Utc>) -> impl Display {
    date.format(DATE_FORMAT)
}

fn escape_note(note: &str) -> String {
    note.replace('\n', "\\n")
}

// A note that literally contains `\n` comes back with a real newline.
fn unescape_note(note: &str) -> String {
    note.replace("\\n", "\n")
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn example() -> Change {
        Change {
            date: "2024-03-07T03:19:34Z".parse().unwrap(),
            name: "change_name".into(),
            note: "A description of the change".into(),
            planner: "Ruslan Fadeev <github@kinrany.dev>".into(),
        }
    }

    pub static EXAMPLE_LINE: &str = "change_name \
        2024-03-07T03:19:34Z \
        Ruslan Fadeev <github@kinrany.dev> \
        # A description of the change";

    #[test]
    fn test_parse_line() {
        let change = Change::parse_line(EXAMPLE_LINE).unwrap();
        assert_eq!(change, example());
    }

    #[test]
    fn test_format_line() {
        assert_eq!(example().format_line(), EXAMPLE_LINE);
    }

    #[test]
    fn test_format_plus_parse_line() {
        let change = Change::parse_line(&example().format_line()).unwrap();
        assert_eq!(change, example());
    }

    #[test]
    fn test_parse_line_without_note() {
        let change =
            Change::parse_line("name 2000-01-01T00:00:00Z Jane Doe <jane@example.com>  ").unwrap();

        assert_eq!(change.planner, "Jane Doe <jane@example.com>");
        assert_eq!(change.note, "");
    }

    #[test]
    fn test_parse_line_with_extra_spaces() {
        let change =
            Change::parse_line("name   2000-01-01T00:00:00Z   author   #   note  ").unwrap();

        assert_eq!(change.planner, "author");
        assert_eq!(change.note, "note");
    }

    #[test]
    fn test_parse_line_with_tabs() {
        let line = "change_name\t2024-03-07T03:19:34Z\tRuslan Fadeev <github@kinrany.dev> \
            # A description of the change";
        assert_eq!(Change::parse_line(line).unwrap(), example());
    }

    #[test]
    fn test_note_keeps_later_hashes() {
        let change = Change::parse_line("name 2000-01-01T00:00:00Z author # issue #12").unwrap();
        assert_eq!(change.note, "issue #12");
    }

    #[test]
    fn test_parse_line_with_newlines() {
        let change = Change::parse_line("name 2000-01-01T00:00:00Z author # a\\nb").unwrap();
        assert_eq!(change.note, "a\nb");
    }

    #[test]
    fn test_format_line_with_newlines() {
        let change = Change {
            note: "a\nb".into(),
            ..example()
        };

        let line = change.format_line();
        assert!(line.ends_with("# a\\nb"));
        assert_eq!(Change::parse_line(&line).unwrap(), change);
    }

    #[test]
    fn test_literal_backslash_n_becomes_newline() {
        let change = Change {
            note: "C:\\new".into(),
            ..example()
        };

        let reparsed = Change::parse_line(&change.format_line()).unwrap();
        assert_eq!(reparsed.note, "C:\new");
    }

    #[test]
    fn test_format_truncates_subseconds() {
        let change = Change::parse_line("name 2024-03-07T03:19:34.987Z author # n").unwrap();

        assert_eq!(
            change.format_line(),
            "name 2024-03-07T03:19:34Z author # n"
        );
    }

    #[test]
    fn test_missing_space_after_name() {
        let err = Change::parse_line("lonely_name").unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingSpaceAfterName {
                line: "lonely_name".into()
            }
        );
    }

    #[test]
    fn test_missing_space_after_date() {
        let err = Change::parse_line("name 2024-03-07T03:19:34Z").unwrap_err();
        assert!(matches!(err, ParseError::MissingSpaceAfterDate { line } if line.starts_with("name")));
    }

    #[test]
    fn test_invalid_date() {
        let err = Change::parse_line("name yesterday author # note").unwrap_err();
        assert!(matches!(err, ParseError::InvalidDate { .. }));
    }
}
