//! Configuration Types

use std::time::Duration;

use chrono_tz::Tz;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use super::keychain::Keychain;
use crate::error::{Result, SilverError};
use crate::rpc::pod_endpoint;
use crate::session::Credentials;

/// Default timezone for parsing timestamps from the service
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Remote directory that holds export results
pub const DEFAULT_DOWNLOAD_DIR: &str = "/download";

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_sftp_port() -> u16 {
    22
}

fn default_sftp_timeout() -> u64 {
    30
}

fn default_download_dir() -> String {
    DEFAULT_DOWNLOAD_DIR.to_string()
}

/// Client configuration, as stored on disk
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Regional deployment number
    pub pod: u32,

    pub username: String,

    /// Inline password. Takes precedence over `keychain_id`.
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Keychain entry holding the password
    #[serde(default)]
    pub keychain_id: Option<String>,

    /// IANA timezone name used for timestamps
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Override for the pod-derived API URL
    #[serde(default)]
    pub api_endpoint: Option<String>,

    #[serde(default)]
    pub sftp: SftpConfig,
}

/// File-transfer connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SftpConfig {
    /// Override for the pod-derived host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default = "default_sftp_port")]
    pub port: u16,

    #[serde(default = "default_sftp_timeout")]
    pub timeout_secs: u64,

    /// Base for relative remote paths
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    /// Pinned host key, `SHA256:<base64>`. Unpinned keys are accepted with a warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_key_fingerprint: Option<String>,
}

impl Default for SftpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_sftp_port(),
            timeout_secs: default_sftp_timeout(),
            download_dir: default_download_dir(),
            host_key_fingerprint: None,
        }
    }
}

impl ClientConfig {
    pub fn new(pod: u32, username: impl Into<String>) -> Self {
        Self {
            pod,
            username: username.into(),
            password: None,
            keychain_id: None,
            timezone: default_timezone(),
            request_timeout_secs: default_request_timeout(),
            api_endpoint: None,
            sftp: SftpConfig::default(),
        }
    }

    pub fn with_password(mut self, password: SecretString) -> Self {
        self.password = Some(password);
        self
    }

    /// Resolve credentials, reading the keychain if no inline password is set
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(password) = &self.password {
            return Ok(Credentials::new(self.username.clone(), password.clone()));
        }
        let Some(id) = &self.keychain_id else {
            return Err(SilverError::Config(format!(
                "No password or keychain_id configured for {}",
                self.username
            )));
        };
        let secret = Keychain::new().get(id)?;
        Ok(Credentials::new(self.username.clone(), SecretString::new(secret.into())))
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| SilverError::Config(format!("Unknown timezone {:?}: {}", self.timezone, e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn api_endpoint(&self) -> String {
        self.api_endpoint
            .clone()
            .unwrap_or_else(|| pod_endpoint(self.pod))
    }

    /// Host of the file-transfer drop
    pub fn transfer_host(&self) -> String {
        self.sftp
            .host
            .clone()
            .unwrap_or_else(|| format!("transfer{}.ibmmarketingcloud.com", self.pod))
    }
}
