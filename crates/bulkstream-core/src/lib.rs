//! bulkstream-core — configuration and the bulk API wire format.
//! The writer and the CLI both depend on this one.

pub mod bulk;
pub mod config;

pub use bulk::{Action, ActionMeta, BulkResponse, CommitReport, ErrorDetail, ItemFailure};
pub use config::{BulkstreamConfig, ConfigError};
