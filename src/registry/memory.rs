//! In-memory registry backend.
//!
//! Keeps rows for the lifetime of the process, so the engine can run
//! without a database.

use async_trait::async_trait;
use std::collections::BTreeSet;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

use super::store::Registry;
use super::types::{ChangeRow, EventRow, Identity};

/// In-memory change registry.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    /// Registered projects.
    projects: Mutex<BTreeSet<String>>,
    /// Deployed change rows.
    changes: Mutex<Vec<ChangeRow>>,
    /// Event log.
    events: Mutex<Vec<EventRow>>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that already records the given changes.
    #[must_use]
    pub fn with_changes(rows: Vec<ChangeRow>) -> Self {
        Self {
            changes: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Returns every change row, across projects.
    pub async fn all_changes(&self) -> Vec<ChangeRow> {
        self.changes.lock().await.clone()
    }

    /// Returns every event, across projects.
    pub async fn all_events(&self) -> Vec<EventRow> {
        self.events.lock().await.clone()
    }

    /// Returns true if the project has been registered.
    pub async fn has_project(&self, project: &str) -> bool {
        self.projects.lock().await.contains(project)
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn changes(&self, project: &str) -> Result<Vec<ChangeRow>> {
        Ok(self
            .changes
            .lock()
            .await
            .iter()
            .filter(|row| row.project == project)
            .cloned()
            .collect())
    }

    async fn register_project(&self, project: &str, _creator: &Identity) -> Result<()> {
        self.projects.lock().await.insert(project.to_string());
        Ok(())
    }

    async fn insert_change(&self, row: &ChangeRow) -> Result<()> {
        debug!("Recording change {} in memory", row.change);
        self.changes.lock().await.push(row.clone());
        Ok(())
    }

    async fn delete_change(&self, change_id: &str) -> Result<()> {
        self.changes
            .lock()
            .await
            .retain(|row| row.change_id != change_id);
        Ok(())
    }

    async fn add_event(&self, event: &EventRow) -> Result<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }

    async fn events(&self, project: &str) -> Result<Vec<EventRow>> {
        Ok(self
            .events
            .lock()
            .await
            .iter()
            .filter(|event| event.project == project)
            .cloned()
            .collect())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
