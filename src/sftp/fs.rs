//! Remote filesystem seam

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncSeek};

use crate::error::Result;

/// Metadata from `lstat`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteMetadata {
    pub size: Option<u64>,
    pub is_dir: bool,
    /// Seconds since the epoch
    pub modified: Option<u64>,
}

/// Read-only view of the file drop plus deletion.
///
/// Missing paths fail with [`SilverError::NotFound`](crate::SilverError::NotFound).
/// Dropping a [`RemoteFs::File`] closes the remote descriptor.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    type File: AsyncRead + AsyncSeek + Unpin + Send + 'static;

    async fn open(&self, path: &str) -> Result<Self::File>;

    /// Entry names in `path`, without `.` and `..`
    async fn list_dir(&self, path: &str) -> Result<Vec<String>>;

    async fn lstat(&self, path: &str) -> Result<RemoteMetadata>;

    async fn remove(&self, path: &str) -> Result<()>;
}
