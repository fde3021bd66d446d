//! SSH Client implementation using russh

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use russh::client;
use russh::keys::{PublicKey, PublicKeyBase64};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Result, SilverError};
use crate::rpc::Fault;
use crate::session::Credentials;

/// SHA-256 host key fingerprint, `SHA256:<base64>` without padding
pub fn fingerprint(key: &PublicKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.public_key_bytes());
    let hash = hasher.finalize();
    format!("SHA256:{}", BASE64.encode(hash).trim_end_matches('='))
}

/// Compare fingerprints, tolerating a missing `SHA256:` prefix and padding
fn fingerprint_matches(expected: &str, actual: &str) -> bool {
    fn normalize(fp: &str) -> &str {
        let fp = fp.trim();
        fp.strip_prefix("SHA256:").unwrap_or(fp).trim_end_matches('=')
    }
    normalize(expected) == normalize(actual)
}

/// SSH connection to the file-transfer host, password-authenticated
pub struct SshClient {
    host: String,
    port: u16,
    timeout: Duration,
    expected_fingerprint: Option<String>,
}

impl SshClient {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            expected_fingerprint: None,
        }
    }

    /// Reject any host key that does not match `fingerprint`
    pub fn with_fingerprint(mut self, fingerprint: Option<String>) -> Self {
        self.expected_fingerprint = fingerprint;
        self
    }

    pub async fn connect(self, credentials: &Credentials) -> Result<client::Handle<HostKeyPolicy>> {
        info!("Connecting to SSH server at {}:{}", self.host, self.port);

        let ssh_config = client::Config {
            inactivity_timeout: Some(Duration::from_secs(300)),
            keepalive_interval: Some(Duration::from_secs(30)),
            keepalive_max: 3,
            ..Default::default()
        };

        let handler = HostKeyPolicy {
            host: self.host.clone(),
            port: self.port,
            expected: self.expected_fingerprint,
        };

        let mut handle = tokio::time::timeout(
            self.timeout,
            client::connect(
                Arc::new(ssh_config),
                (self.host.as_str(), self.port),
                handler,
            ),
        )
        .await
        .map_err(|_| {
            SilverError::Transport(format!(
                "Connection to {}:{} timed out",
                self.host, self.port
            ))
        })??;

        debug!("SSH handshake completed");

        let authenticated = handle
            .authenticate_password(&credentials.username, credentials.password())
            .await?;

        if !authenticated.success() {
            return Err(SilverError::Authentication(Fault::new(
                "",
                "SSH password authentication rejected",
            )));
        }

        info!("SSH authentication successful");
        Ok(handle)
    }
}

/// Host key check: pinned fingerprint when configured, otherwise accept and warn
pub struct HostKeyPolicy {
    host: String,
    port: u16,
    expected: Option<String>,
}

impl client::Handler for HostKeyPolicy {
    type Error = SilverError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let actual = fingerprint(server_public_key);

        match &self.expected {
            Some(expected) if fingerprint_matches(expected, &actual) => {
                info!("Host key verified for {}:{}", self.host, self.port);
                Ok(true)
            }
            Some(expected) => {
                warn!(
                    "HOST KEY MISMATCH for {}:{}! Expected {}, got {}",
                    self.host, self.port, expected, actual
                );
                Err(SilverError::Transport(format!(
                    "Host key verification failed for {}:{}: expected {}, got {}",
                    self.host, self.port, expected, actual
                )))
            }
            None => {
                warn!(
                    "Accepting unpinned host key for {}:{} (fingerprint: {})",
                    self.host, self.port, actual
                );
                Ok(true)
            }
        }
    }
}
