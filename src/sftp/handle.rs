//! Scoped read handles for job results
//!
//! A result is either a plain remote file or one member of a remote zip
//! archive. Both are exposed as [`ResultReader`], which implements
//! [`AsyncRead`].
//!
//! The zip reader is synchronous, so an archive member is decoded on a
//! blocking worker that owns the remote file (through [`SyncIoBridge`]), the
//! archive and the member stream. Chunks reach the caller over a bounded
//! channel. When the worker finishes it drops the member, then the archive,
//! then the remote file.

use std::io::{self, Read, Seek};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::debug;
use zip::ZipArchive;

use crate::error::{Result, SilverError};

const CHUNK_SIZE: usize = 32 * 1024;
const CHANNEL_DEPTH: usize = 4;

/// Plain remote file
pub struct PlainStream<F> {
    path: String,
    file: F,
}

impl<F> PlainStream<F> {
    pub(crate) fn new(path: String, file: F) -> Self {
        Self { path, file }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<F: AsyncRead + Unpin> AsyncRead for PlainStream<F> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().file).poll_read(cx, buf)
    }
}

/// Decoded bytes of one archive member
pub struct ArchiveMemberStream {
    path: String,
    member: String,
    reader: StreamReader<BoxStream<'static, io::Result<Bytes>>, Bytes>,
    worker: JoinHandle<()>,
}

impl ArchiveMemberStream {
    /// Open `file` as a zip archive and start streaming one member.
    ///
    /// With no `member`, an archive holding exactly one entry selects it;
    /// otherwise the named member must exist. On failure the archive and
    /// `file` are released before the error is returned.
    pub(crate) async fn open<F>(file: F, path: &str, member: Option<&str>) -> Result<Self>
    where
        F: tokio::io::AsyncRead + tokio::io::AsyncSeek + Unpin + Send + 'static,
    {
        let bridge = SyncIoBridge::new(file);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (chunk_tx, chunk_rx) = mpsc::channel(CHANNEL_DEPTH);

        let archive_path = path.to_string();
        let requested = member.map(str::to_string);
        let worker = tokio::task::spawn_blocking(move || {
            run_worker(bridge, &archive_path, requested.as_deref(), ready_tx, chunk_tx)
        });

        let member = match ready_rx.await {
            Ok(Ok(member)) => member,
            Ok(Err(e)) => {
                let _ = worker.await;
                return Err(e);
            }
            Err(_) => {
                let _ = worker.await;
                return Err(SilverError::Archive(format!(
                    "Archive worker for {} stopped unexpectedly",
                    path
                )));
            }
        };
        debug!("Streaming member {} of {}", member, path);

        let chunks = stream::unfold(chunk_rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        })
        .boxed();

        Ok(Self {
            path: path.to_string(),
            member,
            reader: StreamReader::new(chunks),
            worker,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    /// Stop decoding and wait until the worker has released the archive and
    /// the remote file
    pub async fn close(self) -> Result<()> {
        let Self { reader, worker, .. } = self;
        drop(reader);
        worker
            .await
            .map_err(|e| SilverError::Archive(format!("Archive worker failed: {}", e)))
    }
}

impl AsyncRead for ArchiveMemberStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().reader).poll_read(cx, buf)
    }
}

fn run_worker<R: Read + Seek>(
    reader: R,
    archive_path: &str,
    member: Option<&str>,
    ready: oneshot::Sender<Result<String>>,
    chunks: mpsc::Sender<io::Result<Bytes>>,
) {
    let mut ready = Some(ready);
    // Everything stream_member acquired is dropped by the time it returns
    let outcome = stream_member(reader, archive_path, member, &mut ready, &chunks);

    if let Err(e) = outcome {
        match ready.take() {
            Some(ready) => {
                let _ = ready.send(Err(e));
            }
            None => {
                let _ = chunks.blocking_send(Err(into_io_error(e)));
            }
        }
    }
}

fn stream_member<R: Read + Seek>(
    reader: R,
    archive_path: &str,
    member: Option<&str>,
    ready: &mut Option<oneshot::Sender<Result<String>>>,
    chunks: &mpsc::Sender<io::Result<Bytes>>,
) -> Result<()> {
    let mut archive = ZipArchive::new(reader)
        .map_err(|e| SilverError::Archive(format!("{}: {}", archive_path, e)))?;
    let name = resolve_member(&archive, archive_path, member)?;
    let mut entry = archive.by_name(&name)?;

    if let Some(ready) = ready.take() {
        if ready.send(Ok(name)).is_err() {
            return Ok(());
        }
    }

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = entry.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        if chunks
            .blocking_send(Ok(Bytes::copy_from_slice(&buf[..n])))
            .is_err()
        {
            // Reader dropped
            return Ok(());
        }
    }
}

fn resolve_member<R: Read + Seek>(
    archive: &ZipArchive<R>,
    archive_path: &str,
    member: Option<&str>,
) -> Result<String> {
    match member {
        Some(name) => {
            if archive.file_names().any(|n| n == name) {
                Ok(name.to_string())
            } else {
                Err(SilverError::NotFound(format!(
                    "Member {} not found in archive {}",
                    name, archive_path
                )))
            }
        }
        None if archive.len() == 1 => archive
            .file_names()
            .next()
            .map(str::to_string)
            .ok_or_else(|| SilverError::NotFound(format!("Archive {} is empty", archive_path))),
        None => Err(SilverError::NotFound(format!(
            "Archive {} has {} members; a member name is required",
            archive_path,
            archive.len()
        ))),
    }
}

fn into_io_error(err: SilverError) -> io::Error {
    match err {
        SilverError::Io(e) => e,
        other => io::Error::other(other.to_string()),
    }
}

/// Scoped read handle over a job result
pub enum ResultReader<F> {
    Plain(PlainStream<F>),
    ArchiveMember(ArchiveMemberStream),
}

impl<F> ResultReader<F> {
    /// Remote path the handle reads from
    pub fn path(&self) -> &str {
        match self {
            ResultReader::Plain(plain) => plain.path(),
            ResultReader::ArchiveMember(archive) => archive.path(),
        }
    }

    /// Selected archive member, if this is an archive
    pub fn member(&self) -> Option<&str> {
        match self {
            ResultReader::Plain(_) => None,
            ResultReader::ArchiveMember(archive) => Some(archive.member()),
        }
    }

    /// Release the handle. For archives this waits until the remote file is closed.
    pub async fn close(self) -> Result<()> {
        match self {
            ResultReader::Plain(plain) => {
                drop(plain);
                Ok(())
            }
            ResultReader::ArchiveMember(archive) => archive.close().await,
        }
    }
}

impl<F: AsyncRead + Unpin> ResultReader<F> {
    /// Read the rest of the stream as UTF-8 text
    pub async fn read_text(&mut self) -> Result<String> {
        let mut text = String::new();
        self.read_to_string(&mut text).await?;
        Ok(text)
    }
}

impl<F: AsyncRead + Unpin> AsyncRead for ResultReader<F> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ResultReader::Plain(plain) => Pin::new(plain).poll_read(cx, buf),
            ResultReader::ArchiveMember(archive) => Pin::new(archive).poll_read(cx, buf),
        }
    }
}
