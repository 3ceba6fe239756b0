//! Configuration service implementation.
//!
//! Loads [`TetherConfig`] from `config.toml` and applies environment
//! overrides. A missing file is not an error: defaults apply.

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tether_core::config::TetherConfig;
use tether_core::error::Result;

use crate::paths::TetherPaths;

pub const ENV_SERVER_HOST: &str = "TETHER_SERVER_HOST";
pub const ENV_SERVER_PORT: &str = "TETHER_SERVER_PORT";
pub const ENV_AUTH_TOKEN: &str = "TETHER_AUTH_TOKEN";

/// Loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    config: Arc<RwLock<Option<TetherConfig>>>,
}

impl ConfigService {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a service for the default config location.
    pub fn from_paths(paths: &TetherPaths) -> Result<Self> {
        let path = paths.config_file().context("Failed to resolve config path")?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the configuration, loading it on first access.
    pub fn get_config(&self) -> Result<TetherConfig> {
        if let Ok(cached) = self.config.read()
            && let Some(config) = cached.as_ref()
        {
            return Ok(config.clone());
        }

        let mut config = load_config_file(&self.path)?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());

        if let Ok(mut cached) = self.config.write() {
            *cached = Some(config.clone());
        }
        Ok(config)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut cached) = self.config.write() {
            *cached = None;
        }
    }
}

/// Reads a TOML config file; a missing or empty file yields defaults.
pub fn load_config_file(path: &Path) -> Result<TetherConfig> {
    if !path.exists() {
        tracing::debug!("[ConfigService] No config at {:?}, using defaults", path);
        return Ok(TetherConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    if content.trim().is_empty() {
        return Ok(TetherConfig::default());
    }

    let config: TetherConfig = toml::from_str(&content)?;
    tracing::info!("[ConfigService] Loaded configuration from {:?}", path);
    Ok(config)
}

/// Applies `TETHER_*` overrides using `lookup` to read variables.
///
/// Unparseable values are ignored with a warning.
pub fn apply_env_overrides<F>(config: &mut TetherConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = lookup(ENV_SERVER_HOST) {
        config.server.host = host;
    }
    if let Some(port) = lookup(ENV_SERVER_PORT) {
        match port.parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(e) => tracing::warn!(
                "[ConfigService] Ignoring {}={:?}: {}",
                ENV_SERVER_PORT,
                port,
                e
            ),
        }
    }
    if let Some(token) = lookup(ENV_AUTH_TOKEN) {
        config.server.auth_token = Some(token);
    }
}
