//! Configuration Storage
//!
//! Reads the client configuration from disk.
//! Config location: ~/.silverweasel/config.json, %APPDATA%\Silverweasel on Windows

use std::path::{Path, PathBuf};
use tokio::fs;

use super::types::ClientConfig;
use crate::error::{Result, SilverError};

/// Get the configuration directory
pub fn config_dir() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join("Silverweasel"));
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".silverweasel"))
        .ok_or_else(|| SilverError::Config("Failed to determine config directory".to_string()))
}

pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// Storage at the default path
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: config_file()?,
        })
    }

    /// Create storage manager with custom path (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load configuration from disk. A missing file is an error; there is no
    /// usable default without credentials.
    pub async fn load(&self) -> Result<ClientConfig> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SilverError::Config(format!(
                    "Config file {} does not exist",
                    self.path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let config: ClientConfig = serde_json::from_str(&contents).map_err(|e| {
            SilverError::Config(format!("Invalid config file {}: {}", self.path.display(), e))
        })?;
        // Surface a bad timezone at load time rather than on first parse
        config.timezone()?;

        tracing::debug!("Loaded config for pod {} from {:?}", config.pod, self.path);
        Ok(config)
    }

    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
