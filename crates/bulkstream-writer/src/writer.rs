//! Streaming bulk writer — the chunk lifecycle.
//!
//! A chunk opens on the first write after a commit (or on the very first
//! write) and stays open until its buffered size exceeds the configured
//! maximum. The write that finds it over the limit commits it, then opens
//! the next chunk with its own block. A chunk can therefore exceed the
//! maximum by at most one block, and a single oversized block still goes
//! out whole.
//!
//! Every call goes through one lock. Callers are expected to drive the
//! writer from a single sequential loop; the lock only keeps accidental
//! concurrent calls from interleaving chunks.

use bytes::Bytes;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;

use bulkstream_core::bulk::{BulkResponse, BULK_PATH, FLUSH_PATH};
use bulkstream_core::CommitReport;

use crate::error::{body_excerpt, WriteError};
use crate::pipe::{ChunkPipe, DebugSink};

pub use bulkstream_core::config::DEFAULT_MAX_CHUNK_SIZE;

/// Cumulative counters since the writer was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub blocks: u64,
    pub bytes: u64,
    pub commits: u64,
    pub failed_items: u64,
}

pub struct StreamingBulkWriter {
    client: reqwest::Client,
    endpoint: String,
    max_chunk_size: usize,
    state: Mutex<WriterState>,
}

struct WriterState {
    /// The open chunk, if any. Taken out of here when it starts committing.
    pipe: Option<ChunkPipe>,
    /// Parked here between chunks; the open pipe's worker owns it otherwise.
    debug: Option<DebugSink>,
    stats: WriterStats,
}

impl StreamingBulkWriter {
    /// Writer targeting `endpoint`, the base URL of the bulk API.
    pub fn new(endpoint: impl AsRef<str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.as_ref().trim_end_matches('/').to_string(),
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            state: Mutex::new(WriterState {
                pipe: None,
                debug: None,
                stats: WriterStats::default(),
            }),
        }
    }

    /// Buffered bytes after which the open chunk is committed.
    pub fn max_chunk_size(mut self, max: usize) -> Self {
        self.max_chunk_size = max;
        self
    }

    /// Mirror every byte sent into `sink`, with a marker line after each commit.
    pub fn debug_sink<W>(mut self, sink: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        self.state.get_mut().debug = Some(Box::new(sink));
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxies, TLS).
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn stats(&self) -> WriterStats {
        self.state.lock().await.stats
    }

    /// Add one block to the stream.
    ///
    /// Returns `Some(report)` when this call committed the previous chunk.
    /// Otherwise the block is only scheduled for transfer and the call
    /// returns without waiting on the network.
    pub async fn write(&self, block: Bytes) -> Result<Option<CommitReport>, WriteError> {
        let mut state = self.state.lock().await;

        if block.is_empty() {
            tracing::debug!("empty block ignored");
            return Ok(None);
        }

        let mut report = None;
        if state
            .pipe
            .as_ref()
            .is_some_and(|pipe| pipe.size() > self.max_chunk_size)
        {
            if let Some(pipe) = state.pipe.take() {
                report = Some(self.commit(pipe, &mut state).await?);
            }
        }

        let WriterState { pipe, debug, stats } = &mut *state;
        let pipe = pipe.get_or_insert_with(|| {
            tracing::debug!(endpoint = %self.endpoint, "opening chunk");
            ChunkPipe::open(&self.client, self.url(BULK_PATH), debug.take())
        });

        let len = block.len() as u64;
        pipe.push(block)?;
        stats.blocks += 1;
        stats.bytes += len;

        Ok(report)
    }

    /// Commit whatever is buffered, then ask the store to flush so the data
    /// is visible to later reads.
    ///
    /// With no open chunk this is a no-op: no requests, `Ok(None)`.
    pub async fn close(&self) -> Result<Option<CommitReport>, WriteError> {
        let mut state = self.state.lock().await;

        let Some(pipe) = state.pipe.take() else {
            return Ok(None);
        };
        let report = self.commit(pipe, &mut state).await?;
        self.flush().await?;

        Ok(Some(report))
    }

    async fn commit(
        &self,
        pipe: ChunkPipe,
        state: &mut WriterState,
    ) -> Result<CommitReport, WriteError> {
        let bytes = pipe.size() as u64;
        let blocks = pipe.blocks();

        let finished = pipe.finish().await;
        state.debug = finished.debug;
        let response = finished.response?;

        let endpoint = self.url(BULK_PATH);
        let status = response.status();
        if !status.is_success() {
            let body = body_excerpt(response).await;
            return Err(WriteError::Status {
                endpoint,
                status,
                body,
            });
        }

        let raw = response.bytes().await.map_err(WriteError::Transport)?;
        let decoded: BulkResponse = serde_json::from_slice(&raw).map_err(WriteError::Decode)?;
        let report = CommitReport::from_response(decoded, bytes);

        state.stats.commits += 1;
        state.stats.failed_items += report.failures.len() as u64;

        for failure in &report.failures {
            tracing::warn!(%failure, "bulk item rejected");
        }
        tracing::info!(
            bytes,
            blocks,
            items = report.items,
            failed = report.failures.len(),
            took_ms = report.took_ms,
            "chunk committed"
        );

        Ok(report)
    }

    async fn flush(&self) -> Result<(), WriteError> {
        let endpoint = self.url(FLUSH_PATH);
        let response = self
            .client
            .post(&endpoint)
            .send()
            .await
            .map_err(WriteError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = body_excerpt(response).await;
            return Err(WriteError::Status {
                endpoint,
                status,
                body,
            });
        }

        tracing::debug!(%endpoint, "flushed");
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }
}
