//! Materializing the change id chain.
//!
//! [`FullChanges`] walks a plan in order and threads each computed id into
//! the next change as its parent. Every id depends on the one before it,
//! so the walk is sequential and is produced lazily; callers that only need
//! a prefix can stop early.

use std::iter::FusedIterator;
use std::slice;

use super::change::Change;
use super::hash::ChangeHasher;

/// A planned change decorated with its id and its parent's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullChange {
    /// The planned change.
    pub change: Change,
    /// Id of this change.
    pub id: String,
    /// Id of the previous change, absent for the first change.
    pub parent: Option<String>,
}

impl FullChange {
    /// Returns the change name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.change.name
    }

    /// Returns the canonical record this change's id was computed from.
    #[must_use]
    pub fn canonical_record(&self, project: &str) -> String {
        ChangeHasher::new().canonical_record(project, &self.change, self.parent.as_deref())
    }
}

/// Lazy iterator over the changes of a plan with their ids.
#[derive(Debug, Clone)]
pub struct FullChanges<'a> {
    /// Project the ids are bound to.
    project: &'a str,
    /// Changes not yet visited.
    changes: slice::Iter<'a, Change>,
    /// Id of the last change produced.
    parent: Option<String>,
    /// Change hasher.
    hasher: ChangeHasher,
}

impl<'a> FullChanges<'a> {
    /// Starts a chain walk over `changes`, with no parent for the first one.
    #[must_use]
    pub fn new(project: &'a str, changes: &'a [Change]) -> Self {
        Self {
            project,
            changes: changes.iter(),
            parent: None,
            hasher: ChangeHasher::new(),
        }
    }
}

impl Iterator for FullChanges<'_> {
    type Item = FullChange;

    fn next(&mut self) -> Option<Self::Item> {
        let change = self.changes.next()?;
        let id = self
            .hasher
            .change_id(self.project, change, self.parent.as_deref());
        let parent = self.parent.replace(id.clone());

        Some(FullChange {
            change: change.clone(),
            id,
            parent,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.changes.size_hint()
    }
}

impl ExactSizeIterator for FullChanges<'_> {}

impl FusedIterator for FullChanges<'_> {}
