//! Target database access.
//!
//! This module provides:
//! - `mysql://` URL handling
//! - Connection pools
//! - Script execution on the target
//! - Script lookup under the project directory

mod connection;
mod runner;
mod scripts;
mod url;

pub use connection::connect_pool;
#[cfg(test)]
pub use runner::MockScriptRunner;
pub use runner::{MySqlScriptRunner, ScriptRunner};
pub use scripts::{ScriptKind, ScriptLocator};
pub use url::{DEFAULT_PORT, MysqlTarget};
