//! SSH transport for the file-transfer drop

pub mod client;

pub use client::{fingerprint, HostKeyPolicy, SshClient};
