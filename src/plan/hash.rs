//! Change identity hashing.
//!
//! A change id is the SHA-1 of a canonical text record of the change,
//! framed like a git object (`change <len>\0<record>`). The record names the
//! parent change id, so ids form a chain: editing or reordering any change
//! alters the id of every change planned after it.

use sha1::{Digest, Sha1};
use std::fmt::Write;

use super::change::{Change, format_date};

/// Hasher for computing change ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChangeHasher;

impl ChangeHasher {
    /// Creates a new change hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Builds the canonical record that a change id is computed from.
    ///
    /// The note is written raw, with literal newlines, and the record has no
    /// trailing newline.
    #[must_use]
    pub fn canonical_record(&self, project: &str, change: &Change, parent: Option<&str>) -> String {
        let mut record = String::new();

        let _ = writeln!(record, "project {project}");
        let _ = writeln!(record, "change {}", change.name);
        if let Some(parent) = parent {
            let _ = writeln!(record, "parent {parent}");
        }
        let _ = writeln!(record, "planner {}", change.planner);
        let _ = writeln!(record, "date {}", format_date(change.date));
        record.push('\n');
        record.push_str(&change.note);

        record
    }

    /// Computes the id of a change given its project and parent id.
    ///
    /// Returns 40 lowercase hex characters.
    #[must_use]
    pub fn change_id(&self, project: &str, change: &Change, parent: Option<&str>) -> String {
        let record = self.canonical_record(project, change, parent);

        // The frame length counts UTF-8 bytes, not characters.
        let mut hasher = Sha1::new();
        hasher.update(format!("change {}\0", record.len()).as_bytes());
        hasher.update(record.as_bytes());

        hex::encode(hasher.finalize())
    }

    /// Computes the hash recorded for a deploy script.
    #[must_use]
    pub fn script_hash(&self, script: &str) -> String {
        hex::encode(Sha1::digest(script.as_bytes()))
    }

    /// Computes a short id (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_id(id: &str) -> &str {
        id.get(..8).unwrap_or(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::change::tests::example;

    const ROOT_ID: &str = "da41a550b0cba5bd3dffbf645032a98ae1136da5";

    static EXAMPLE_RECORD: &str = "project quitch\n\
        change change_name\n\
        planner Ruslan Fadeev <github@kinrany.dev>\n\
        date 2024-03-07T03:19:34Z\n\
        \n\
        A description of the change";

    #[test]
    fn test_canonical_record() {
        let hasher = ChangeHasher::new();
        assert_eq!(hasher.canonical_record("quitch", &example(), None), EXAMPLE_RECORD);
    }

    #[test]
    fn test_canonical_record_with_parent() {
        let hasher = ChangeHasher::new();
        let record = hasher.canonical_record("quitch", &example(), Some(ROOT_ID));

        assert!(record.contains(&format!("change change_name\nparent {ROOT_ID}\nplanner ")));
    }

    #[test]
    fn test_id_without_parent() {
        assert_eq!(ChangeHasher::new().change_id("quitch", &example(), None), ROOT_ID);
    }

    #[test]
    fn test_id_with_parent() {
        assert_eq!(
            ChangeHasher::new().change_id("quitch", &example(), Some(ROOT_ID)),
            "7b6b9ba12694a34a5445e1d847d36d2344d61bcb"
        );
    }

    #[test]
    fn test_id_with_unicode_note() {
        let mut change = example();
        change.note = "🤦🏼‍♂️".into();

        let record = ChangeHasher::new().canonical_record("quitch", &change, None);
        assert_ne!(record.len(), record.chars().count());

        assert_eq!(
            ChangeHasher::new().change_id("quitch", &change, None),
            "fb29c4f840ce9cd266d983a2c90d7ddf745c1711"
        );
    }

    #[test]
    fn test_id_deterministic() {
        let hasher = ChangeHasher::new();
        let first = hasher.change_id("quitch", &example(), Some(ROOT_ID));
        let second = hasher.change_id("quitch", &example(), Some(ROOT_ID));

        assert_eq!(first, second);
        assert_eq!(first.len(), 40);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_project_changes_id() {
        let hasher = ChangeHasher::new();
        assert_ne!(
            hasher.change_id("quitch", &example(), None),
            hasher.change_id("other", &example(), None)
        );
    }

    #[test]
    fn test_script_hash() {
        // sha1("")
        assert_eq!(
            ChangeHasher::new().script_hash(""),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }

    #[test]
    fn test_short_id() {
        assert_eq!(ChangeHasher::short_id(ROOT_ID), "da41a550");
        assert_eq!(ChangeHasher::short_id("abc"), "abc");
    }
}
