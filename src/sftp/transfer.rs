//! Job result retrieval over the file drop

use tracing::{debug, info};

use super::fs::RemoteFs;
use super::handle::{ArchiveMemberStream, PlainStream, ResultReader};
use super::path_utils::is_archive_path;
use super::session::SftpFs;
use crate::config::ClientConfig;
use crate::error::{Result, SilverError};
use crate::job::JobResult;

pub struct TransferClient<F: RemoteFs = SftpFs> {
    fs: F,
}

impl TransferClient<SftpFs> {
    /// Connect to the configured pod's transfer host
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(SftpFs::connect(config).await?))
    }

    pub async fn disconnect(self) -> Result<()> {
        self.fs.disconnect().await
    }
}

impl<F: RemoteFs> TransferClient<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        self.fs.list_dir(path).await
    }

    /// Whether `path` exists. A missing path is `false`, not an error.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        match self.fs.lstat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn remove(&self, path: &str) -> Result<()> {
        self.fs.remove(path).await
    }

    /// Delete a job's result file.
    ///
    /// Fails with [`SilverError::NotFound`] before deleting anything if the job
    /// is not complete or its result is already gone.
    pub async fn remove_job_result<J: JobResult>(&self, job: &mut J) -> Result<()> {
        if !job.is_complete().await? {
            return Err(SilverError::NotFound(format!(
                "Job {} has no result to remove: not complete",
                job.job_id()
            )));
        }
        let path = job.result_path()?.to_string();
        if !self.exists(&path).await? {
            return Err(SilverError::NotFound(path));
        }

        info!("Removing result of job {}: {}", job.job_id(), path);
        self.fs.remove(&path).await
    }

    /// Open a job's result for reading.
    ///
    /// Archive results expose one member: `member` if given, otherwise the
    /// archive's only entry.
    pub async fn open_job_result<J: JobResult>(
        &self,
        job: &mut J,
        member: Option<&str>,
    ) -> Result<ResultReader<F::File>> {
        if !job.is_complete().await? {
            return Err(SilverError::NotReady {
                job_id: job.job_id().to_string(),
                status: "not complete".into(),
            });
        }
        let path = job.result_path()?.to_string();

        debug!("Opening result of job {}: {}", job.job_id(), path);
        let file = self.fs.open(&path).await?;

        if is_archive_path(&path) {
            let stream = ArchiveMemberStream::open(file, &path, member).await?;
            Ok(ResultReader::ArchiveMember(stream))
        } else {
            Ok(ResultReader::Plain(PlainStream::new(path, file)))
        }
    }
}
