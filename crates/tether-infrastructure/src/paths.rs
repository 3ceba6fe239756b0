//! Unified path management for tether configuration and offline data.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/tether/            # Config directory
//! └── config.toml              # Server, sync and endpoint configuration
//!
//! ~/.local/share/tether/       # Data directory
//! └── offline_store.json       # Key-value store (cache snapshot + queue)
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "tether";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot find home directory")]
    HomeDirNotFound,
}

/// Path resolution rooted either at the platform directories or, for tests,
/// at an explicit base directory.
#[derive(Debug, Clone, Default)]
pub struct TetherPaths {
    base_dir: Option<PathBuf>,
}

impl TetherPaths {
    /// With `None`, resolves platform directories (XDG on Linux).
    /// With `Some(dir)`, everything lives under `dir`.
    pub fn new(base_dir: Option<&Path>) -> Self {
        Self {
            base_dir: base_dir.map(Path::to_path_buf),
        }
    }

    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base_dir {
            Some(base) => Ok(base.join("config")),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base_dir {
            Some(base) => Ok(base.join("data")),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    pub fn store_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("offline_store.json"))
    }
}
