//! Locating change scripts on disk.

use std::fmt;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{EngineError, Result};

/// Which script of a change to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Applies the change.
    Deploy,
    /// Undoes the change.
    Revert,
}

impl ScriptKind {
    /// Returns the directory holding scripts of this kind.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Deploy => "deploy",
            Self::Revert => "revert",
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Resolves `<top_dir>/<kind>/<change>.sql` paths.
#[derive(Debug, Clone)]
pub struct ScriptLocator {
    top_dir: PathBuf,
}

impl ScriptLocator {
    /// Creates a locator rooted at the project's top directory.
    #[must_use]
    pub fn new(top_dir: impl Into<PathBuf>) -> Self {
        Self {
            top_dir: top_dir.into(),
        }
    }

    /// Returns the path of a change's script.
    #[must_use]
    pub fn path(&self, kind: ScriptKind, change: &str) -> PathBuf {
        self.top_dir
            .join(kind.dir_name())
            .join(format!("{change}.sql"))
    }

    /// Reads a change's script.
    ///
    /// # Errors
    ///
    /// Returns `ScriptNotFound` if the file does not exist, or an IO error.
    pub async fn read(&self, kind: ScriptKind, change: &str) -> Result<String> {
        let path = self.path(kind, change);
        debug!("Reading {kind} script {}", path.display());

        match tokio::fs::read_to_string(&path).await {
            Ok(sql) => Ok(sql),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(EngineError::ScriptNotFound { path }.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
