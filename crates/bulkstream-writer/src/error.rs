//! Error types for the writer, the producer, and index administration.
//!
//! Item-level rejections are not here: they come back inside a
//! [`CommitReport`](bulkstream_core::CommitReport).

use reqwest::StatusCode;

/// Longest response body excerpt kept in a status error.
const BODY_EXCERPT: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("failed to decode bulk response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("request stream closed before the chunk was fully sent")]
    StreamClosed,
    #[error("chunk task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

#[derive(Debug, thiserror::Error)]
pub enum ProduceError {
    #[error("failed to encode bulk action: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure of the pull-write loop in [`drive`](crate::drive).
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error(transparent)]
    Produce(#[from] ProduceError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Read what is left of a failed response, truncated for error messages.
pub(crate) async fn body_excerpt(response: reqwest::Response) -> String {
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > BODY_EXCERPT {
        let mut end = BODY_EXCERPT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push('…');
    }
    body
}
