//! Plan module for quitch.
//!
//! This module handles everything derived from the plan file:
//! - Parsing and formatting the plan document and its change lines
//! - Computing chained change ids
//! - Walking the plan with ids attached

mod change;
mod chain;
mod document;
mod hash;

pub use change::{Change, format_date};
pub use chain::{FullChange, FullChanges};
pub use document::{Plan, SYNTAX_VERSION};
pub use hash::ChangeHasher;

#[cfg(test)]
pub(crate) use document::tests::example as example_plan;
