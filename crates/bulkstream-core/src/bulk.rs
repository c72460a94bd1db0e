//! Bulk API wire format — action lines, the `_bulk` response body, and
//! the per-commit report built from it.
//!
//! A request body is newline-delimited JSON: one action line, followed by
//! a document line for every action except `delete`. Each line ends with
//! `\n`, including the last one.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Path of the bulk write endpoint, relative to the target URL.
pub const BULK_PATH: &str = "/_bulk";

/// Path of the durability flush endpoint, relative to the target URL.
pub const FLUSH_PATH: &str = "/_flush";

/// Content type of a bulk request body.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Line appended to the debug mirror after every committed chunk.
pub const COMMIT_MARKER: &[u8] = b"== COMMIT ==\n";

// ── Action lines ─────────────────────────────────────────────────────────────

/// Addressing metadata carried by an action line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMeta {
    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// One bulk action header. Serializes as `{"index":{"_index":..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Index(ActionMeta),
    Create(ActionMeta),
    Update(ActionMeta),
    Delete(ActionMeta),
}

impl Action {
    pub fn meta(&self) -> &ActionMeta {
        match self {
            Action::Index(m) | Action::Create(m) | Action::Update(m) | Action::Delete(m) => m,
        }
    }

    /// Operation name as it appears on the wire.
    pub fn op(&self) -> &'static str {
        match self {
            Action::Index(_) => "index",
            Action::Create(_) => "create",
            Action::Update(_) => "update",
            Action::Delete(_) => "delete",
        }
    }

    /// Whether a document line follows this action line.
    pub fn has_source(&self) -> bool {
        !matches!(self, Action::Delete(_))
    }

    /// Serialize the action and its document as one block, two lines with
    /// trailing newlines. `doc` is ignored for `delete`.
    pub fn encode<D: Serialize>(&self, doc: &D) -> Result<Vec<u8>, serde_json::Error> {
        let mut out = serde_json::to_vec(self)?;
        out.push(b'\n');
        if self.has_source() {
            serde_json::to_writer(&mut out, doc)?;
            out.push(b'\n');
        }
        Ok(out)
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// Decoded body of a `_bulk` response.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    /// True when at least one item was rejected.
    pub errors: bool,
    /// One entry per action, keyed by operation name.
    #[serde(default)]
    pub items: Vec<BTreeMap<String, BulkItem>>,
}

/// Outcome of a single action inside a bulk response.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItem {
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    #[serde(rename = "_type", default)]
    pub doc_type: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

impl BulkItem {
    /// An error object or an explicit non-2xx status. A missing status on
    /// its own is not a failure.
    pub fn failed(&self) -> bool {
        self.error.is_some() || self.status.is_some_and(|s| !(200..=299).contains(&s))
    }
}

/// Item-level error as reported by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reason: String,
}

// ── Commit report ────────────────────────────────────────────────────────────

/// One rejected action within an otherwise accepted chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Zero-based position of the action within its chunk.
    pub position: usize,
    pub op: String,
    pub index: Option<String>,
    pub id: Option<String>,
    pub status: Option<u16>,
    pub error: Option<ErrorDetail>,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}/{}]",
            self.op,
            self.index.as_deref().unwrap_or("-"),
            self.id.as_deref().unwrap_or("-"),
        )?;
        if let Some(status) = self.status {
            write!(f, " status {status}")?;
        }
        if let Some(err) = &self.error {
            write!(f, ": {}: {}", err.kind, err.reason)?;
        }
        Ok(())
    }
}

/// What the remote store said about one committed chunk.
///
/// Item-level failures are data, not errors: the chunk was accepted and the
/// caller decides what to do with the rejected items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Body bytes sent for this chunk.
    pub bytes: u64,
    /// Number of actions the store reported on.
    pub items: usize,
    pub took_ms: u64,
    pub failures: Vec<ItemFailure>,
}

impl CommitReport {
    pub fn from_response(response: BulkResponse, bytes: u64) -> Self {
        let failures = if response.errors {
            response
                .items
                .iter()
                .enumerate()
                .flat_map(|(position, entry)| {
                    entry
                        .iter()
                        .filter(|(_, item)| item.failed())
                        .map(move |(op, item)| ItemFailure {
                            position,
                            op: op.clone(),
                            index: item.index.clone(),
                            id: item.id.clone(),
                            status: item.status,
                            error: item.error.clone(),
                        })
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            bytes,
            items: response.items.len(),
            took_ms: response.took,
            failures,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
