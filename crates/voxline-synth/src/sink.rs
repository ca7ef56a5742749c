//! Scoped audio sinks.
//!
//! A sink is the append-only destination for the binary audio frames of
//! one session. The session driver owns it for the session's whole
//! lifetime and finalizes it on every exit path — success, protocol
//! failure, transport death, deadline — so partial output is always a
//! valid (if truncated) artifact, never a stale one from a prior run.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Append-only destination for synthesized audio.
///
/// Frames are appended strictly in arrival order; implementations must
/// not reorder, merge across ordering boundaries, or skip frames.
/// `finalize` is called exactly once per session by the driver and must
/// tolerate a redundant call.
#[async_trait]
pub trait AudioSink: Send {
    /// Append one audio frame.
    async fn append(&mut self, frame: &[u8]) -> std::io::Result<()>;

    /// Flush buffered bytes and close the artifact.
    async fn finalize(&mut self) -> std::io::Result<()>;
}

// ── File sink ──────────────────────────────────────────────────────

/// Sink writing frames to a file.
///
/// Creation truncates the target, so a failure before any frame arrives
/// leaves a valid empty artifact. The [`File`] inside closes on drop as
/// a backstop, but only [`finalize`](AudioSink::finalize) syncs the
/// data to disk.
pub struct FileSink {
    file: Option<File>,
    path: PathBuf,
    bytes_written: u64,
}

impl FileSink {
    /// Create (or truncate) the target file.
    pub async fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await?;
        debug!(path = %path.display(), "audio sink opened");
        Ok(Self { file: Some(file), path, bytes_written: 0 })
    }

    /// The target path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total bytes appended so far.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

#[async_trait]
impl AudioSink for FileSink {
    async fn append(&mut self, frame: &[u8]) -> std::io::Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(std::io::Error::other("audio sink already finalized"));
        };
        file.write_all(frame).await?;
        self.bytes_written += frame.len() as u64;
        Ok(())
    }

    async fn finalize(&mut self) -> std::io::Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        file.flush().await?;
        file.sync_all().await?;
        debug!(path = %self.path.display(), bytes = self.bytes_written, "audio sink finalized");
        Ok(())
    }
}

// ── Memory sink ────────────────────────────────────────────────────

/// Sink accumulating frames in memory.
///
/// Used by callers that post-process the audio before it touches disk,
/// and by tests that assert on the exact byte sequence a session
/// produced.
#[derive(Debug, Default)]
pub struct MemorySink {
    data: Vec<u8>,
    finalize_count: usize,
}

impl MemorySink {
    /// An empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The bytes appended so far, in arrival order.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the sink and return its contents.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// How many times `finalize` was invoked.
    #[must_use]
    pub const fn finalize_count(&self) -> usize {
        self.finalize_count
    }
}

#[async_trait]
impl AudioSink for MemorySink {
    async fn append(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.data.extend_from_slice(frame);
        Ok(())
    }

    async fn finalize(&mut self) -> std::io::Result<()> {
        self.finalize_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_truncates_a_stale_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp3");
        tokio::fs::write(&path, b"stale audio from a prior run").await.unwrap();

        let mut sink = FileSink::create(&path).await.unwrap();
        sink.finalize().await.unwrap();

        let content = tokio::fs::read(&path).await.unwrap();
        assert!(content.is_empty(), "truncation must yield a valid empty artifact");
    }

    #[tokio::test]
    async fn frames_are_appended_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp3");

        let mut sink = FileSink::create(&path).await.unwrap();
        sink.append(b"b1").await.unwrap();
        sink.append(b"b2").await.unwrap();
        sink.append(b"b3").await.unwrap();
        assert_eq!(sink.bytes_written(), 6);
        sink.finalize().await.unwrap();

        let content = tokio::fs::read(&path).await.unwrap();
        assert_eq!(content, b"b1b2b3");
    }

    #[tokio::test]
    async fn redundant_finalize_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::create(dir.path().join("out.mp3")).await.unwrap();
        sink.finalize().await.unwrap();
        sink.finalize().await.unwrap();
    }

    #[tokio::test]
    async fn append_after_finalize_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileSink::create(dir.path().join("out.mp3")).await.unwrap();
        sink.finalize().await.unwrap();
        assert!(sink.append(b"late").await.is_err());
    }

    #[tokio::test]
    async fn memory_sink_records_bytes_and_finalizes() {
        let mut sink = MemorySink::new();
        sink.append(b"ab").await.unwrap();
        sink.append(b"cd").await.unwrap();
        sink.finalize().await.unwrap();
        assert_eq!(sink.as_bytes(), b"abcd");
        assert_eq!(sink.finalize_count(), 1);
    }
}
