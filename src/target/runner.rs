//! Running change scripts against the target database.

use async_trait::async_trait;
use sqlx::mysql::MySqlPool;
use tracing::debug;

use crate::error::{ConnectionError, QuitchError, Result};

use super::connection::connect_pool;
use super::url::MysqlTarget;

/// Trait for executing SQL scripts on the target.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Runs every statement of `sql`, in order, as one scoped unit.
    ///
    /// Stops at the first failing statement.
    async fn run_script(&self, sql: &str) -> Result<()>;
}

/// Script runner backed by a MySQL connection pool.
#[derive(Debug, Clone)]
pub struct MySqlScriptRunner {
    /// Pool for the target database.
    pool: MySqlPool,
}

impl MySqlScriptRunner {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Connects to the target database.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be reached.
    pub async fn connect(target: &MysqlTarget) -> Result<Self> {
        Ok(Self::new(connect_pool(target).await?))
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl ScriptRunner for MySqlScriptRunner {
    async fn run_script(&self, sql: &str) -> Result<()> {
        // The connection goes back to the pool when dropped, on every path.
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| ConnectionError::unreachable("target", e))?;

        debug!("Running script ({} bytes)", sql.len());
        sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(sql))
            .await
            .map_err(|e| QuitchError::internal(e.to_string()))?;

        Ok(())
    }
}
