//! Keychain Integration
//!
//! Stores the API password in the system keychain via the `keyring` crate.

use keyring::Entry;

use crate::error::{Result, SilverError};

/// Service name for keychain entries
const SERVICE_NAME: &str = "com.silverweasel.api";

pub struct Keychain {
    service: String,
}

impl Keychain {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Create with custom service name (for testing)
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    // Account is prefixed with the OS user for a stable identity on macOS
    fn entry(&self, id: &str) -> Result<Entry> {
        Ok(Entry::new(&self.service, &account_name(id))?)
    }

    pub fn store(&self, id: &str, secret: &str) -> Result<()> {
        tracing::info!("Keychain store: service={}, id={}", self.service, id);
        self.entry(id)?.set_password(secret)?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<String> {
        tracing::debug!("Keychain get: service={}, id={}", self.service, id);
        match self.entry(id)?.get_password() {
            Ok(secret) => Ok(secret),
            Err(keyring::Error::NoEntry) => {
                tracing::warn!("Keychain get: no entry for id={}", id);
                Err(SilverError::Config(format!("No keychain entry for {}", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        match self.entry(id)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for Keychain {
    fn default() -> Self {
        Self::new()
    }
}

fn account_name(id: &str) -> String {
    format!("{}@{}", whoami::username(), id)
}
