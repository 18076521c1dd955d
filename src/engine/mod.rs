//! Deploy and revert engine.
//!
//! This module picks the changes an operation touches and applies them to
//! the target, keeping the registry in step.

mod executor;
mod selection;

pub use executor::{ChangeEngine, EngineAction, ExecutionReport, ProcessedChange};
pub use selection::{deploy_selection, revert_target};
