//! Producers — pull-style sources of pre-serialized bulk actions — and
//! the driver loop that feeds one into a writer.

use std::collections::VecDeque;
use std::time::SystemTime;

use bytes::Bytes;
use rand::RngCore;

use bulkstream_core::bulk::{Action, ActionMeta};
use bulkstream_core::ItemFailure;

use crate::error::{DriveError, ProduceError};
use crate::writer::StreamingBulkWriter;

/// A finite, non-restartable sequence of blocks.
///
/// Each block is one complete bulk action (action line plus document line,
/// newline terminated). `Ok(None)` signals exhaustion.
pub trait Producer {
    fn next_block(&mut self) -> Result<Option<Bytes>, ProduceError>;
}

// ── Synthetic documents ──────────────────────────────────────────────────────

/// Random bytes behind each generated field value.
const FIELD_BYTES: usize = 32;

/// Generates `docs` index actions with ids `1..=docs`. Each document has an
/// `@timestamp` and `fields` random hex fields named `field_<i>`.
#[derive(Debug, Clone)]
pub struct DocumentGenerator {
    index: String,
    doc_type: Option<String>,
    fields: usize,
    docs: u32,
    current: u32,
}

impl DocumentGenerator {
    pub fn new(index: impl Into<String>, doc_type: Option<&str>, fields: usize, docs: u32) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.map(str::to_string),
            fields,
            docs,
            current: 0,
        }
    }

    /// Blocks produced so far.
    pub fn produced(&self) -> u32 {
        self.current
    }

    fn document(&self) -> serde_json::Value {
        let mut rng = rand::thread_rng();
        let mut doc = serde_json::Map::with_capacity(self.fields + 1);
        doc.insert(
            "@timestamp".to_string(),
            humantime::format_rfc3339_millis(SystemTime::now())
                .to_string()
                .into(),
        );
        for i in 0..self.fields {
            let mut raw = [0u8; FIELD_BYTES];
            rng.fill_bytes(&mut raw);
            doc.insert(format!("field_{i}"), hex::encode(raw).into());
        }
        serde_json::Value::Object(doc)
    }
}

impl Producer for DocumentGenerator {
    fn next_block(&mut self) -> Result<Option<Bytes>, ProduceError> {
        if self.current >= self.docs {
            return Ok(None);
        }
        self.current += 1;

        let action = Action::Index(ActionMeta {
            index: Some(self.index.clone()),
            doc_type: self.doc_type.clone(),
            id: Some(self.current.to_string()),
        });
        let block = action.encode(&self.document())?;
        Ok(Some(Bytes::from(block)))
    }
}

// ── Fixed blocks ─────────────────────────────────────────────────────────────

/// Replays a prepared list of blocks.
#[derive(Debug, Clone, Default)]
pub struct VecProducer {
    blocks: VecDeque<Bytes>,
}

impl From<Vec<Bytes>> for VecProducer {
    fn from(blocks: Vec<Bytes>) -> Self {
        Self {
            blocks: blocks.into(),
        }
    }
}

impl Producer for VecProducer {
    fn next_block(&mut self) -> Result<Option<Bytes>, ProduceError> {
        Ok(self.blocks.pop_front())
    }
}

// ── Driver ───────────────────────────────────────────────────────────────────

/// Totals for one `drive` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveSummary {
    pub blocks: u64,
    pub bytes: u64,
    pub commits: u64,
    /// Every item rejection reported across all commits, in commit order.
    pub failures: Vec<ItemFailure>,
}

/// Pull blocks from `producer` into `writer` until exhaustion, then close
/// the writer. `on_block` sees the running block count after every write.
///
/// Transport and decode failures stop the run; item-level rejections are
/// collected into the summary and the run continues.
pub async fn drive<P, F>(
    producer: &mut P,
    writer: &StreamingBulkWriter,
    mut on_block: F,
) -> Result<DriveSummary, DriveError>
where
    P: Producer + ?Sized,
    F: FnMut(u64),
{
    let mut summary = DriveSummary::default();

    while let Some(block) = producer.next_block()? {
        summary.bytes += block.len() as u64;
        if let Some(report) = writer.write(block).await? {
            summary.commits += 1;
            summary.failures.extend(report.failures);
        }
        summary.blocks += 1;
        on_block(summary.blocks);
    }

    if let Some(report) = writer.close().await? {
        summary.commits += 1;
        summary.failures.extend(report.failures);
    }

    Ok(summary)
}
