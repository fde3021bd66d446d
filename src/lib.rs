//! Silverweasel - client for the marketing-cloud SOAP API and its SFTP file drop
//!
//! [`SilverClient`] logs in, issues API calls and re-authenticates once when
//! the session expires. Export calls return an [`ExportJob`] to poll; once it
//! is complete, [`TransferClient`] opens or deletes its result on the file
//! drop, unwrapping zip archives transparently.
//!
//! ```no_run
//! use silverweasel::{ConfigStorage, PollConfig, SilverClient, TransferClient};
//!
//! # async fn run() -> silverweasel::Result<()> {
//! let config = ConfigStorage::new()?.load().await?;
//! let client = SilverClient::connect(&config).await?;
//!
//! let mut job = client.export_list("12345").await?;
//! job.wait_until_complete(&PollConfig::default()).await?;
//!
//! let transfer = TransferClient::connect(&config).await?;
//! let mut reader = transfer.open_job_result(&mut job, None).await?;
//! let csv = reader.read_text().await?;
//! reader.close().await?;
//! transfer.remove_job_result(&mut job).await?;
//! # let _ = csv;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod datetime;
pub mod error;
pub mod job;
pub mod logging;
pub mod rpc;
pub mod session;
pub mod sftp;
pub mod ssh;

pub use api::{ExportFormat, ExportKind, ListEntry, ListType, RawExportTarget, SilverClient};
pub use config::{ClientConfig, ConfigStorage, Keychain};
pub use error::{Result, SilverError};
pub use job::{ExportJob, JobResult, JobStatus, PollConfig};
pub use logging::init_logging;
pub use rpc::{CallOutcome, Fault, RpcChannel, RpcResponse, SoapChannel};
pub use session::{Credentials, SessionManager, SessionState};
pub use sftp::{RemoteFs, ResultReader, SftpFs, TransferClient};
