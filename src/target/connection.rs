//! Opening MySQL connection pools.

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tracing::{debug, info};

use crate::error::{ConnectionError, Result};

use super::url::MysqlTarget;

/// Opens a single-connection pool to `target` and checks it answers.
///
/// # Errors
///
/// Returns an error if the server cannot be reached or rejects the login.
pub async fn connect_pool(target: &MysqlTarget) -> Result<MySqlPool> {
    info!("Connecting to {}", target.redacted());

    let mut options = MySqlConnectOptions::new()
        .host(&target.hostname)
        .port(target.port)
        .username(&target.username)
        .password(&target.password);
    if !target.db.is_empty() {
        options = options.database(&target.db);
    }

    let pool = MySqlPoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| ConnectionError::unreachable(target.redacted(), e))?;

    sqlx::query("select 1")
        .execute(&pool)
        .await
        .map_err(|e| ConnectionError::unreachable(target.redacted(), e))?;

    debug!("Connected to {}", target.db);
    Ok(pool)
}
