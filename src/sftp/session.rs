//! SFTP Session
//!
//! [`RemoteFs`] over an SSH connection to the pod's transfer host.

use async_trait::async_trait;
use russh::client::Handle;
use russh::Disconnect;
use russh_sftp::client::error::Error as SftpErrorInner;
use russh_sftp::client::fs::File;
use russh_sftp::client::SftpSession as RusshSftpSession;
use tracing::{debug, info};

use super::fs::{RemoteFs, RemoteMetadata};
use super::path_utils::resolve_remote_path;
use crate::config::ClientConfig;
use crate::error::{Result, SilverError};
use crate::session::Credentials;
use crate::ssh::{HostKeyPolicy, SshClient};

pub struct SftpFs {
    handle: Handle<HostKeyPolicy>,
    sftp: RusshSftpSession,
    /// Base for relative paths
    cwd: String,
}

impl SftpFs {
    /// Connect to the configured transfer host with the API credentials
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let credentials = config.credentials()?;
        let client = SshClient::new(
            config.transfer_host(),
            config.sftp.port,
            std::time::Duration::from_secs(config.sftp.timeout_secs),
        )
        .with_fingerprint(config.sftp.host_key_fingerprint.clone());

        Self::open(client, &credentials, config.sftp.download_dir.clone()).await
    }

    pub async fn open(client: SshClient, credentials: &Credentials, cwd: String) -> Result<Self> {
        let handle = client.connect(credentials).await?;

        info!("Opening SFTP subsystem");
        let channel = handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;

        let sftp = RusshSftpSession::new(channel.into_stream())
            .await
            .map_err(|e| SilverError::Transport(format!("SFTP subsystem unavailable: {}", e)))?;
        info!("SFTP subsystem opened, working directory {}", cwd);

        Ok(Self { handle, sftp, cwd })
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn set_cwd(&mut self, path: String) {
        self.cwd = path;
    }

    fn resolve_path(&self, path: &str) -> String {
        resolve_remote_path(&self.cwd, path)
    }

    /// Close the SFTP session and the SSH connection
    pub async fn disconnect(self) -> Result<()> {
        if let Err(e) = self.sftp.close().await {
            debug!("SFTP close failed: {}", e);
        }
        self.handle
            .disconnect(Disconnect::ByApplication, "", "English")
            .await?;
        info!("SFTP connection closed");
        Ok(())
    }

    /// Map SFTP errors, keeping path context
    fn map_sftp_error(&self, err: SftpErrorInner, path: &str) -> SilverError {
        map_sftp_error(err.to_string(), path)
    }
}

fn map_sftp_error(err_str: String, path: &str) -> SilverError {
    if err_str.contains("No such file") || err_str.contains("not found") {
        SilverError::NotFound(path.to_string())
    } else {
        SilverError::Transport(format!("SFTP {}: {}", path, err_str))
    }
}

#[async_trait]
impl RemoteFs for SftpFs {
    type File = File;

    async fn open(&self, path: &str) -> Result<File> {
        let path = self.resolve_path(path);
        debug!("Opening remote file: {}", path);
        self.sftp
            .open(&path)
            .await
            .map_err(|e| self.map_sftp_error(e, &path))
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let path = self.resolve_path(path);
        debug!("Listing directory: {}", path);

        let read_dir = self
            .sftp
            .read_dir(&path)
            .await
            .map_err(|e| self.map_sftp_error(e, &path))?;

        let names: Vec<String> = read_dir
            .map(|entry| entry.file_name())
            .filter(|name| name != "." && name != "..")
            .collect();

        debug!("Listed {} entries in {}", names.len(), path);
        Ok(names)
    }

    async fn lstat(&self, path: &str) -> Result<RemoteMetadata> {
        let path = self.resolve_path(path);
        let metadata = self
            .sftp
            .symlink_metadata(&path)
            .await
            .map_err(|e| self.map_sftp_error(e, &path))?;

        Ok(RemoteMetadata {
            size: metadata.size,
            is_dir: metadata.is_dir(),
            modified: metadata.mtime.map(u64::from),
        })
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let path = self.resolve_path(path);
        info!("Removing remote file: {}", path);
        self.sftp
            .remove_file(&path)
            .await
            .map_err(|e| self.map_sftp_error(e, &path))
    }
}
