//! Configuration Management Module
//!
//! Client settings loaded from disk, with the password optionally kept in the
//! system keychain.

pub mod keychain;
pub mod storage;
pub mod types;

pub use keychain::Keychain;
pub use storage::{config_dir, config_file, ConfigStorage};
pub use types::{ClientConfig, SftpConfig, DEFAULT_DOWNLOAD_DIR, DEFAULT_TIMEZONE};
