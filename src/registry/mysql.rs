//! MySQL registry backend.
//!
//! The registry lives in its own schema on the target server (`sqitch` by
//! default). The schema and its tables are created on first connect.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlPool;
use tracing::{debug, info};

use crate::error::{RegistryError, Result};
use crate::target::{MysqlTarget, connect_pool};

use super::store::Registry;
use super::types::{ChangeRow, EventRow, Identity};

/// Registry schema version written to `releases`.
const REGISTRY_RELEASE: f32 = 1.1;

/// Tables created in a fresh registry schema.
const REGISTRY_SCHEMA: &str = r"
CREATE TABLE releases (
    version         FLOAT         PRIMARY KEY,
    installed_at    DATETIME(6)   NOT NULL,
    installer_name  VARCHAR(255)  NOT NULL,
    installer_email VARCHAR(255)  NOT NULL
) ENGINE InnoDB, CHARACTER SET 'utf8mb4';

CREATE TABLE projects (
    project         VARCHAR(255)  PRIMARY KEY,
    uri             VARCHAR(255)  NULL UNIQUE,
    created_at      DATETIME(6)   NOT NULL,
    creator_name    VARCHAR(255)  NOT NULL,
    creator_email   VARCHAR(255)  NOT NULL
) ENGINE InnoDB, CHARACTER SET 'utf8mb4';

CREATE TABLE changes (
    change_id       VARCHAR(40)   PRIMARY KEY,
    script_hash     VARCHAR(40)   NULL,
    `change`        VARCHAR(255)  NOT NULL,
    project         VARCHAR(255)  NOT NULL REFERENCES projects(project) ON UPDATE CASCADE,
    note            TEXT          NOT NULL,
    committed_at    DATETIME(6)   NOT NULL,
    committer_name  VARCHAR(255)  NOT NULL,
    committer_email VARCHAR(255)  NOT NULL,
    planned_at      DATETIME(6)   NOT NULL,
    planner_name    VARCHAR(255)  NOT NULL,
    planner_email   VARCHAR(255)  NOT NULL,
    UNIQUE(project, script_hash)
) ENGINE InnoDB, CHARACTER SET 'utf8mb4';

CREATE TABLE events (
    event           ENUM ('deploy', 'revert', 'fail') NOT NULL,
    change_id       VARCHAR(40)   NOT NULL,
    `change`        VARCHAR(255)  NOT NULL,
    project         VARCHAR(255)  NOT NULL REFERENCES projects(project) ON UPDATE CASCADE,
    note            TEXT          NOT NULL,
    committed_at    DATETIME(6)   NOT NULL,
    committer_name  VARCHAR(255)  NOT NULL,
    committer_email VARCHAR(255)  NOT NULL,
    planned_at      DATETIME(6)   NOT NULL,
    planner_name    VARCHAR(255)  NOT NULL,
    planner_email   VARCHAR(255)  NOT NULL,
    PRIMARY KEY (change_id, committed_at)
) ENGINE InnoDB, CHARACTER SET 'utf8mb4';
";

/// Registry stored in a MySQL schema.
#[derive(Debug, Clone)]
pub struct MySqlRegistry {
    /// Pool connected to the registry schema.
    pool: MySqlPool,
    /// Registry schema name.
    name: String,
}

/// Raw `events` row; the event kind is decoded afterwards.
#[derive(sqlx::FromRow)]
struct EventRecord {
    event: String,
    change_id: String,
    change: String,
    project: String,
    note: String,
    committed_at: DateTime<Utc>,
    committer_name: String,
    committer_email: String,
    planned_at: DateTime<Utc>,
    planner_name: String,
    planner_email: String,
}

impl TryFrom<EventRecord> for EventRow {
    type Error = RegistryError;

    fn try_from(record: EventRecord) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            event: record.event.parse()?,
            change_id: record.change_id,
            change: record.change,
            project: record.project,
            note: record.note,
            committed_at: record.committed_at,
            committer_name: record.committer_name,
            committer_email: record.committer_email,
            planned_at: record.planned_at,
            planner_name: record.planner_name,
            planner_email: record.planner_email,
        })
    }
}

impl MySqlRegistry {
    /// Connects to the registry schema next to the target database.
    ///
    /// Creates the schema and its tables if the schema does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a valid identifier, or if the
    /// schema cannot be created or reached.
    pub async fn connect(
        target: &MysqlTarget,
        registry_name: &str,
        target_pool: &MySqlPool,
        installer: &Identity,
    ) -> Result<Self> {
        validate_registry_name(registry_name)?;

        let created = create_schema_if_missing(target_pool, registry_name).await?;
        let pool = connect_pool(&target.with_database(registry_name)).await?;
        let registry = Self {
            pool,
            name: registry_name.to_string(),
        };

        if created {
            registry.apply_schema(installer).await?;
        }

        Ok(registry)
    }

    /// Returns the registry schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn apply_schema(&self, installer: &Identity) -> Result<()> {
        info!("Creating registry tables in {}", self.name);

        sqlx::raw_sql(REGISTRY_SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| RegistryError::query("create registry tables", e))?;

        sqlx::query(
            "INSERT INTO releases (version, installed_at, installer_name, installer_email)
             VALUES (?, ?, ?, ?)",
        )
        .bind(REGISTRY_RELEASE)
        .bind(Utc::now())
        .bind(&installer.name)
        .bind(&installer.email)
        .execute(&self.pool)
        .await
        .map_err(|e| RegistryError::query("record registry release", e))?;

        Ok(())
    }
}

/// Rejects names that cannot be quoted as a MySQL identifier.
fn validate_registry_name(name: &str) -> std::result::Result<(), RegistryError> {
    if name.is_empty() || name.contains('`') {
        return Err(RegistryError::InvalidRegistryName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Creates the schema if needed; returns true if it was created.
async fn create_schema_if_missing(pool: &MySqlPool, name: &str) -> Result<bool> {
    let existing = sqlx::query(
        "SELECT schema_name FROM information_schema.schemata WHERE schema_name = ?",
    )
    .bind(name)
    .fetch_optional(pool)
    .await
    .map_err(|e| RegistryError::query("look up registry schema", e))?;

    if existing.is_some() {
        debug!("Registry schema {name} exists");
        return Ok(false);
    }

    info!("Creating schema {name}");
    sqlx::raw_sql(&format!("CREATE SCHEMA `{name}`"))
        .execute(pool)
        .await
        .map_err(|e| RegistryError::query("create registry schema", e))?;

    Ok(true)
}

#[async_trait]
impl Registry for MySqlRegistry {
    async fn changes(&self, project: &str) -> Result<Vec<ChangeRow>> {
        let rows = sqlx::query_as::<_, ChangeRow>(
            "SELECT change_id, script_hash, `change`, project, note, committed_at,
                    committer_name, committer_email, planned_at, planner_name, planner_email
             FROM changes
             WHERE project = ?
             ORDER BY committed_at",
        )
        .bind(project)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RegistryError::query("list changes", e))?;

        debug!("Registry holds {} changes for {project}", rows.len());
        Ok(rows)
    }

    async fn register_project(&self, project: &str, creator: &Identity) -> Result<()> {
        sqlx::query(
            "INSERT INTO projects (project, created_at, creator_name, creator_email)
             VALUES (?, ?, ?, ?)
             ON DUPLICATE KEY UPDATE project = project",
        )
        .bind(project)
        .bind(Utc::now())
        .bind(&creator.name)
        .bind(&creator.email)
        .execute(&self.pool)
        .await
        .map_err(|e| RegistryError::query("register project", e))?;
        Ok(())
    }

    async fn insert_change(&self, row: &ChangeRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO changes (change_id, script_hash, `change`, project, note, committed_at,
                                  committer_name, committer_email, planned_at, planner_name, planner_email)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.change_id)
        .bind(&row.script_hash)
        .bind(&row.change)
        .bind(&row.project)
        .bind(&row.note)
        .bind(row.committed_at)
        .bind(&row.committer_name)
        .bind(&row.committer_email)
        .bind(row.planned_at)
        .bind(&row.planner_name)
        .bind(&row.planner_email)
        .execute(&self.pool)
        .await
        .map_err(|e| RegistryError::query("insert change", e))?;
        Ok(())
    }

    async fn delete_change(&self, change_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM changes WHERE change_id = ?")
            .bind(change_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RegistryError::query("delete change", e))?;
        Ok(())
    }

    async fn add_event(&self, event: &EventRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO events (event, change_id, `change`, project, note, committed_at,
                                 committer_name, committer_email, planned_at, planner_name, planner_email)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(event.event.as_str())
        .bind(&event.change_id)
        .bind(&event.change)
        .bind(&event.project)
        .bind(&event.note)
        .bind(event.committed_at)
        .bind(&event.committer_name)
        .bind(&event.committer_email)
        .bind(event.planned_at)
        .bind(&event.planner_name)
        .bind(&event.planner_email)
        .execute(&self.pool)
        .await
        .map_err(|e| RegistryError::query("add event", e))?;
        Ok(())
    }

    async fn events(&self, project: &str) -> Result<Vec<EventRow>> {
        let records = sqlx::query_as::<_, EventRecord>(
            "SELECT CAST(event AS CHAR) AS event, change_id, `change`, project, note, committed_at,
                    committer_name, committer_email, planned_at, planner_name, planner_email
             FROM events
             WHERE project = ?
             ORDER BY committed_at",
        )
        .bind(project)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RegistryError::query("list events", e))?;

        Ok(records
            .into_iter()
            .map(EventRow::try_from)
            .collect::<std::result::Result<_, _>>()?)
    }

    fn backend_type(&self) -> &'static str {
        "mysql"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EventKind;

    #[test]
    fn test_registry_name_validation() {
        assert!(validate_registry_name("sqitch").is_ok());
        assert!(matches!(
            validate_registry_name("bad`name"),
            Err(RegistryError::InvalidRegistryName { .. })
        ));
        assert!(validate_registry_name("").is_err());
    }

    #[test]
    fn test_event_record_conversion() {
        let now = Utc::now();
        let record = EventRecord {
            event: "revert".into(),
            change_id: "abc".into(),
            change: "one".into(),
            project: "quitch".into(),
            note: String::new(),
            committed_at: now,
            committer_name: "Operator".into(),
            committer_email: "ops@example.com".into(),
            planned_at: now,
            planner_name: "Planner".into(),
            planner_email: "plan@example.com".into(),
        };
        let row = EventRow::try_from(record).unwrap();
        assert_eq!(row.event, EventKind::Revert);
        assert_eq!(row.change, "one");
    }

    #[test]
    fn test_schema_covers_registry_tables() {
        for table in ["releases", "projects", "changes", "events"] {
            assert!(REGISTRY_SCHEMA.contains(&format!("CREATE TABLE {table}")));
        }
    }
}
