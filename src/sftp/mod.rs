//! SFTP file retrieval module
//!
//! Reads, lists and deletes job results on the pod's file drop.

pub mod fs;
pub mod handle;
#[cfg(test)]
pub(crate) mod mock;
pub mod path_utils;
pub mod session;
pub mod transfer;

pub use fs::{RemoteFs, RemoteMetadata};
pub use handle::{ArchiveMemberStream, PlainStream, ResultReader};
pub use session::SftpFs;
pub use transfer::TransferClient;
