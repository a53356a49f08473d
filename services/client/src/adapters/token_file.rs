//! services/client/src/adapters/token_file.rs
//!
//! A `TokenStore` that keeps the bearer token in a single file, so a session
//! survives process restarts.

use coursedocs_core::ports::{PortError, PortResult, TokenStore};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores the token as the whole contents of one file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> PortError {
    PortError::Unexpected(format!("Failed to {} {}: {}", action, path.display(), err))
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> PortResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error("read", &self.path, err)),
        }
    }

    fn save(&self, token: &str) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error("create", parent, e))?;
        }
        fs::write(&self.path, token).map_err(|e| io_error("write", &self.path, e))
    }

    fn clear(&self) -> PortResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error("remove", &self.path, err)),
        }
    }
}
