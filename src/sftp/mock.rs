//! In-memory file drop for unit tests

use std::collections::BTreeMap;
use std::io::{self, Cursor, SeekFrom, Write};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};
use zip::write::SimpleFileOptions;

use super::fs::{RemoteFs, RemoteMetadata};
use crate::error::{Result, SilverError};
use crate::job::JobResult;

/// Zip archive holding `members`, in order
pub(crate) fn zip_bytes(members: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Files keyed by absolute path. Clones share state; every open and every
/// close (on drop) is counted.
#[derive(Clone, Default)]
pub(crate) struct MockFs {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    removed: Arc<Mutex<Vec<String>>>,
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.lock().insert(path.to_string(), contents.into());
        self
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().clone()
    }

    fn absolute(path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/download/{}", path)
        }
    }
}

pub(crate) struct MockFile {
    data: Cursor<Vec<u8>>,
    closes: Arc<AtomicUsize>,
}

impl Drop for MockFile {
    fn drop(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl AsyncRead for MockFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().data).poll_read(cx, buf)
    }
}

impl AsyncSeek for MockFile {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        Pin::new(&mut self.get_mut().data).start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Pin::new(&mut self.get_mut().data).poll_complete(cx)
    }
}

#[async_trait]
impl RemoteFs for MockFs {
    type File = MockFile;

    async fn open(&self, path: &str) -> Result<MockFile> {
        let path = Self::absolute(path);
        let data = self
            .files
            .lock()
            .get(&path)
            .cloned()
            .ok_or(SilverError::NotFound(path))?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(MockFile {
            data: Cursor::new(data),
            closes: Arc::clone(&self.closes),
        })
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let dir = Self::absolute(path);
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        Ok(self
            .files
            .lock()
            .keys()
            .filter_map(|p| p.strip_prefix(&prefix))
            .filter(|name| !name.contains('/'))
            .map(str::to_string)
            .collect())
    }

    async fn lstat(&self, path: &str) -> Result<RemoteMetadata> {
        let path = Self::absolute(path);
        match self.files.lock().get(&path) {
            Some(data) => Ok(RemoteMetadata {
                size: Some(data.len() as u64),
                is_dir: false,
                modified: None,
            }),
            None => Err(SilverError::NotFound(path)),
        }
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let path = Self::absolute(path);
        if self.files.lock().remove(&path).is_none() {
            return Err(SilverError::NotFound(path));
        }
        self.removed.lock().push(path);
        Ok(())
    }
}

/// Job stand-in with a fixed completion flag
pub(crate) struct StubJob {
    pub complete: bool,
    pub path: String,
    pub polls: usize,
}

impl StubJob {
    pub fn new(complete: bool, path: &str) -> Self {
        Self {
            complete,
            path: path.to_string(),
            polls: 0,
        }
    }
}

#[async_trait]
impl JobResult for StubJob {
    fn job_id(&self) -> &str {
        "stub"
    }

    async fn is_complete(&mut self) -> Result<bool> {
        self.polls += 1;
        Ok(self.complete)
    }

    fn result_path(&self) -> Result<&str> {
        if self.polls > 0 && self.complete {
            Ok(&self.path)
        } else {
            Err(SilverError::NotReady {
                job_id: "stub".to_string(),
                status: "RUNNING".to_string(),
            })
        }
    }
}
