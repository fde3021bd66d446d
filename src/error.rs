//! Error types

use thiserror::Error;

use crate::rpc::Fault;

#[derive(Error, Debug)]
pub enum SilverError {
    #[error("Authentication failed: {0}")]
    Authentication(Fault),

    #[error("Remote call {method} failed: {fault}")]
    RemoteCall { method: String, fault: Fault },

    #[error("Job {job_id} is not complete (status: {status})")]
    NotReady { job_id: String, status: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Job {job_id} ended with status {status}")]
    JobFailed { job_id: String, status: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Keychain error: {0}")]
    Keychain(#[from] keyring::Error),
}

pub type Result<T> = std::result::Result<T, SilverError>;

impl From<reqwest::Error> for SilverError {
    fn from(err: reqwest::Error) -> Self {
        SilverError::Transport(err.to_string())
    }
}

impl From<russh::Error> for SilverError {
    fn from(err: russh::Error) -> Self {
        SilverError::Transport(format!("SSH: {}", err))
    }
}

impl From<quick_xml::Error> for SilverError {
    fn from(err: quick_xml::Error) -> Self {
        SilverError::Transport(format!("Malformed envelope: {}", err))
    }
}

impl From<serde_json::Error> for SilverError {
    fn from(err: serde_json::Error) -> Self {
        SilverError::Config(err.to_string())
    }
}

impl From<zip::result::ZipError> for SilverError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::FileNotFound => SilverError::NotFound(err.to_string()),
            zip::result::ZipError::Io(e) => SilverError::Io(e),
            other => SilverError::Archive(other.to_string()),
        }
    }
}

impl SilverError {
    /// Whether this error means the remote side has nothing at the requested location
    pub fn is_not_found(&self) -> bool {
        matches!(self, SilverError::NotFound(_))
    }
}
