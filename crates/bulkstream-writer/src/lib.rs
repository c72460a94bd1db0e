//! bulkstream-writer — streams bulk actions into a remote `_bulk` endpoint
//! in size-bounded chunks, one HTTP request per chunk, without holding the
//! whole payload in memory.

pub mod admin;
pub mod error;
pub mod pipe;
pub mod producer;
pub mod writer;

pub use admin::IndexAdmin;
pub use error::{AdminError, DriveError, ProduceError, WriteError};
pub use pipe::DebugSink;
pub use producer::{drive, DocumentGenerator, DriveSummary, Producer, VecProducer};
pub use writer::{StreamingBulkWriter, WriterStats, DEFAULT_MAX_CHUNK_SIZE};

pub use bulkstream_core::{CommitReport, ItemFailure};
