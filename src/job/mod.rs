//! Export jobs
//!
//! A job is submitted by one of the export calls on [`SilverClient`] and runs
//! on the server. Status is never cached: every [`ExportJob::status`] is a live
//! `GetJobStatus` round-trip. The result path comes from the submission
//! response but is only handed out once the job has been seen COMPLETE.

mod poll;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::SilverClient;
use crate::error::{Result, SilverError};
use crate::rpc::{scalar_text, RpcChannel, SoapChannel};

pub use poll::{calculate_backoff, PollConfig};

/// Job state label. Only `Complete` gates access to results; the other
/// labels are informational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Waiting,
    Running,
    Complete,
    Canceled,
    Error,
    Other(String),
}

impl JobStatus {
    pub fn parse(label: &str) -> Self {
        match label {
            "WAITING" => JobStatus::Waiting,
            "RUNNING" => JobStatus::Running,
            "COMPLETE" => JobStatus::Complete,
            "CANCELED" => JobStatus::Canceled,
            "ERROR" => JobStatus::Error,
            other => JobStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Waiting => "WAITING",
            JobStatus::Running => "RUNNING",
            JobStatus::Complete => "COMPLETE",
            JobStatus::Canceled => "CANCELED",
            JobStatus::Error => "ERROR",
            JobStatus::Other(label) => label,
        }
    }

    pub fn is_complete(&self) -> bool {
        *self == JobStatus::Complete
    }

    /// Finished without producing a result
    pub fn is_failed(&self) -> bool {
        matches!(self, JobStatus::Canceled | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the file layer needs from a job
#[async_trait]
pub trait JobResult: Send {
    fn job_id(&self) -> &str;

    /// Live completion check
    async fn is_complete(&mut self) -> Result<bool>;

    /// Remote path of the result; only valid once the job was seen complete
    fn result_path(&self) -> Result<&str>;
}

pub struct ExportJob<C: RpcChannel = SoapChannel> {
    client: SilverClient<C>,
    job_id: String,
    submission: Value,
    last_status: Option<JobStatus>,
}

impl<C: RpcChannel> ExportJob<C> {
    /// Wrap a submission response. `method` names the submitting call for errors.
    pub(crate) fn from_submission(
        client: SilverClient<C>,
        method: &str,
        submission: Value,
    ) -> Result<Self> {
        let job_id = submission
            .get("JOB_ID")
            .and_then(scalar_text)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                SilverError::InvalidResponse(format!("{} response carried no JOB_ID", method))
            })?;
        info!("{} submitted job {}", method, job_id);

        Ok(Self {
            client,
            job_id,
            submission,
            last_status: None,
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// The raw submission response
    pub fn submission(&self) -> &Value {
        &self.submission
    }

    /// Status from the most recent poll, if any
    pub fn last_status(&self) -> Option<&JobStatus> {
        self.last_status.as_ref()
    }

    /// Fetch the current status from the server
    pub async fn status(&mut self) -> Result<JobStatus> {
        let payload = self.client.job_status(&self.job_id).await?;
        let label = payload
            .get("JOB_STATUS")
            .and_then(scalar_text)
            .ok_or_else(|| {
                SilverError::InvalidResponse(format!(
                    "GetJobStatus for job {} carried no JOB_STATUS",
                    self.job_id
                ))
            })?;
        let status = JobStatus::parse(&label);
        debug!("Job {} is {}", self.job_id, status);
        self.last_status = Some(status.clone());
        Ok(status)
    }

    pub async fn is_complete(&mut self) -> Result<bool> {
        Ok(self.status().await?.is_complete())
    }

    /// Remote path of the job's output.
    ///
    /// Fails with [`SilverError::NotReady`] unless the last poll saw COMPLETE.
    pub fn result_path(&self) -> Result<&str> {
        match &self.last_status {
            Some(JobStatus::Complete) => {}
            other => {
                return Err(SilverError::NotReady {
                    job_id: self.job_id.clone(),
                    status: other
                        .as_ref()
                        .map_or_else(|| "not polled".to_string(), |s| s.to_string()),
                });
            }
        }
        self.submission
            .get("FILE_PATH")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| SilverError::NotFound(format!("Job {} has no FILE_PATH", self.job_id)))
    }

    /// Poll until the job completes, backing off between polls.
    ///
    /// Not part of the job's own state machine; callers with their own
    /// scheduling should poll [`is_complete`](Self::is_complete) directly.
    pub async fn wait_until_complete(&mut self, config: &PollConfig) -> Result<&str> {
        for attempt in 0..config.max_attempts {
            let status = self.status().await?;
            if status.is_complete() {
                return self.result_path();
            }
            if status.is_failed() {
                return Err(SilverError::JobFailed {
                    job_id: self.job_id.clone(),
                    status: status.to_string(),
                });
            }
            if attempt + 1 < config.max_attempts {
                let delay = calculate_backoff(attempt, config);
                debug!("Job {} is {}, polling again in {:?}", self.job_id, status, delay);
                tokio::time::sleep(delay).await;
            }
        }

        Err(SilverError::NotReady {
            job_id: self.job_id.clone(),
            status: self
                .last_status
                .as_ref()
                .map_or_else(|| "not polled".to_string(), |s| s.to_string()),
        })
    }
}

#[async_trait]
impl<C: RpcChannel> JobResult for ExportJob<C> {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    async fn is_complete(&mut self) -> Result<bool> {
        ExportJob::is_complete(self).await
    }

    fn result_path(&self) -> Result<&str> {
        ExportJob::result_path(self)
    }
}

impl<C: RpcChannel> fmt::Debug for ExportJob<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportJob")
            .field("job_id", &self.job_id)
            .field("last_status", &self.last_status)
            .finish()
    }
}
