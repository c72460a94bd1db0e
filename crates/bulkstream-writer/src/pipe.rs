//! Chunk pipe — one in-flight `_bulk` request and the worker feeding it.
//!
//! Opening a pipe starts the HTTP transfer straight away. The request body
//! is the readable end of a bounded channel, so the remote store consumes
//! bytes while the caller is still producing them. Blocks reach the
//! writable end through a per-chunk transfer worker: `push` only queues the
//! block, the worker forwards queued blocks in order and mirrors them to
//! the debug sink.
//!
//! `finish` is the join barrier. It closes the queue, waits for the worker
//! to drain it, and only then does the body channel close, which is the
//! end-of-stream signal for the request.

use bytes::Bytes;
use futures::stream;
use reqwest::header::CONTENT_TYPE;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use bulkstream_core::bulk::{COMMIT_MARKER, NDJSON_CONTENT_TYPE};

use crate::error::WriteError;

/// Receives a copy of every byte sent, plus a marker after each commit.
pub type DebugSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Blocks buffered between the transfer worker and the HTTP body.
const BODY_DEPTH: usize = 32;

pub(crate) struct ChunkPipe {
    queue: mpsc::UnboundedSender<Bytes>,
    worker: JoinHandle<Drained>,
    request: JoinHandle<reqwest::Result<reqwest::Response>>,
    size: usize,
    blocks: usize,
}

/// What the transfer worker hands back once its queue is drained.
struct Drained {
    debug: Option<DebugSink>,
    /// False if the request stopped reading before every block was sent.
    complete: bool,
}

/// Outcome of `finish`. The debug sink comes back even when the request
/// failed so the writer can keep mirroring later chunks.
pub(crate) struct Finished {
    pub debug: Option<DebugSink>,
    pub response: Result<reqwest::Response, WriteError>,
}

impl ChunkPipe {
    pub(crate) fn open(client: &reqwest::Client, url: String, debug: Option<DebugSink>) -> Self {
        let (body_tx, body_rx) = mpsc::channel::<Bytes>(BODY_DEPTH);
        let (queue, queue_rx) = mpsc::unbounded_channel::<Bytes>();

        let body = stream::unfold(body_rx, |mut rx| async move {
            rx.recv()
                .await
                .map(|block| (Ok::<_, std::io::Error>(block), rx))
        });

        let request = client
            .post(url)
            .header(CONTENT_TYPE, NDJSON_CONTENT_TYPE)
            .body(reqwest::Body::wrap_stream(body))
            .send();

        Self {
            queue,
            worker: tokio::spawn(transfer(queue_rx, body_tx, debug)),
            request: tokio::spawn(request),
            size: 0,
            blocks: 0,
        }
    }

    /// Bytes accepted into this chunk so far.
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn blocks(&self) -> usize {
        self.blocks
    }

    /// Schedule `block` for transfer. Does not wait for the bytes to move.
    pub(crate) fn push(&mut self, block: Bytes) -> Result<(), WriteError> {
        let len = block.len();
        // The worker only stops reading once the queue is closed, so a
        // send failure means it died.
        self.queue.send(block).map_err(|_| WriteError::StreamClosed)?;
        self.size += len;
        self.blocks += 1;
        Ok(())
    }

    /// Close the chunk: drain the worker, end the body, await the response.
    pub(crate) async fn finish(self) -> Finished {
        let ChunkPipe {
            queue,
            worker,
            request,
            ..
        } = self;
        drop(queue);

        let drained = match worker.await {
            Ok(drained) => drained,
            Err(e) => {
                request.abort();
                return Finished {
                    debug: None,
                    response: Err(WriteError::TaskFailed(e)),
                };
            }
        };

        let mut debug = drained.debug;
        if let Some(sink) = debug.as_mut() {
            if let Err(e) = mark_commit(sink).await {
                tracing::warn!(error = %e, "debug sink write failed, mirroring disabled");
                debug = None;
            }
        }

        let response = match request.await {
            Ok(Ok(response)) if truncated(response.status(), drained.complete) => {
                Err(WriteError::StreamClosed)
            }
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(WriteError::Transport(e)),
            Err(e) => Err(WriteError::TaskFailed(e)),
        };

        Finished { debug, response }
    }
}

/// Transfer worker: forwards queued blocks to the request body in order.
async fn transfer(
    mut queue: mpsc::UnboundedReceiver<Bytes>,
    body: mpsc::Sender<Bytes>,
    mut debug: Option<DebugSink>,
) -> Drained {
    let mut complete = true;

    while let Some(block) = queue.recv().await {
        if !complete {
            continue;
        }
        if body.send(block.clone()).await.is_err() {
            // Request side is gone; its error surfaces when the chunk commits.
            complete = false;
            continue;
        }
        if let Some(sink) = debug.as_mut() {
            if let Err(e) = sink.write_all(&block).await {
                tracing::warn!(error = %e, "debug sink write failed, mirroring disabled");
                debug = None;
            }
        }
    }

    Drained { debug, complete }
}

/// A success answer to a body that was cut short cannot be trusted. Any
/// other status is kept so the caller sees why the store stopped reading.
fn truncated(status: reqwest::StatusCode, complete: bool) -> bool {
    !complete && status.is_success()
}

async fn mark_commit(sink: &mut DebugSink) -> std::io::Result<()> {
    sink.write_all(COMMIT_MARKER).await?;
    sink.flush().await
}

#[cfg(test)]
impl ChunkPipe {
    /// Stop the transfer worker and wait until it is gone.
    pub(crate) async fn stop_worker(&self) {
        self.worker.abort();
        while !self.worker.is_finished() {
            tokio::task::yield_now().await;
        }
    }
}
