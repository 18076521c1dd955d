//! Registry store trait definition.
//!
//! This module defines the interface the engine uses to read and mutate the
//! change registry.

use async_trait::async_trait;

use crate::error::Result;
use super::types::{ChangeRow, EventRow, Identity};

/// Trait for change registry backends.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Lists the deployed changes of a project.
    async fn changes(&self, project: &str) -> Result<Vec<ChangeRow>>;

    /// Makes sure the project is registered before changes are recorded.
    async fn register_project(&self, project: &str, creator: &Identity) -> Result<()>;

    /// Records a deployed change.
    async fn insert_change(&self, row: &ChangeRow) -> Result<()>;

    /// Removes a deployed change by id.
    async fn delete_change(&self, change_id: &str) -> Result<()>;

    /// Appends an event to the log.
    async fn add_event(&self, event: &EventRow) -> Result<()>;

    /// Lists the events of a project, oldest first.
    async fn events(&self, project: &str) -> Result<Vec<EventRow>>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}
