//! `run` — drop the index, stream generated documents, verify the count.

use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use bulkstream_core::BulkstreamConfig;
use bulkstream_writer::{drive, DocumentGenerator, IndexAdmin, StreamingBulkWriter};

/// Minimum time between progress line redraws.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

/// Item failures printed before the rest are summarized.
const MAX_LISTED_FAILURES: usize = 20;

/// `count | rate | elapsed` line, redrawn in place.
struct Progress {
    begin: Instant,
    last: Option<Instant>,
}

impl Progress {
    fn new() -> Self {
        Self {
            begin: Instant::now(),
            last: None,
        }
    }

    fn tick(&mut self, current: u64, force: bool) {
        let now = Instant::now();
        if !force && self.last.is_some_and(|t| now.duration_since(t) < PROGRESS_INTERVAL) {
            return;
        }
        self.last = Some(now);

        let dur = now.duration_since(self.begin).as_secs_f64();
        let sec = dur as u64;
        let rate = if dur > 0.0 { (current as f64 / dur) as u64 } else { 0 };
        print!("{current:>10} | {rate:>6} req/s | {:02}:{:02}\r", sec / 60, sec % 60);
        let _ = std::io::stdout().flush();
    }
}

pub async fn cmd_run(config: &BulkstreamConfig) -> Result<()> {
    let client = reqwest::Client::new();
    let index = config.target.index.as_str();

    let admin = IndexAdmin::new(client.clone(), &config.target.url);
    if admin
        .delete_if_exists(index)
        .await
        .with_context(|| format!("failed to drop index {index}"))?
    {
        tracing::info!(index, "dropped existing index");
        println!("Dropped existing index {index}.");
    }

    let mut writer = StreamingBulkWriter::new(&config.target.url)
        .client(client)
        .max_chunk_size(config.writer.max_chunk_size);
    if let Some(path) = &config.writer.debug_out {
        let file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("failed to create {}", path.display()))?;
        writer = writer.debug_sink(file);
    }

    let mut generator = DocumentGenerator::new(
        index,
        config.doc_type(),
        config.generator.fields,
        config.generator.docs,
    );

    let mut progress = Progress::new();
    let summary = drive(&mut generator, &writer, |n| progress.tick(n, false))
        .await
        .context("bulk stream failed")?;
    progress.tick(summary.blocks, true);
    println!();
    tracing::info!(
        documents = summary.blocks,
        bytes = summary.bytes,
        commits = summary.commits,
        rejected = summary.failures.len(),
        "bulk stream finished"
    );

    println!("═══════════════════════════════════════");
    println!("  Bulk Stream Summary");
    println!("═══════════════════════════════════════");
    println!("  Documents : {}", summary.blocks);
    println!("  Bytes     : {} ({:.1} KB)", summary.bytes, summary.bytes as f64 / 1024.0);
    println!("  Commits   : {}", summary.commits);
    println!("  Rejected  : {}", summary.failures.len());

    if !summary.failures.is_empty() {
        println!("\n  Rejected items:");
        for failure in summary.failures.iter().take(MAX_LISTED_FAILURES) {
            println!("  ✗ {failure}");
        }
        if summary.failures.len() > MAX_LISTED_FAILURES {
            println!("  … and {} more", summary.failures.len() - MAX_LISTED_FAILURES);
        }
    }

    let expected = u64::from(config.generator.docs);
    let count = admin
        .count(index)
        .await
        .with_context(|| format!("failed to count documents in {index}"))?;
    if count != expected {
        tracing::warn!(index, expected, found = count, "document count mismatch");
        println!("\nExpected {expected} documents in index, found {count}");
    }

    Ok(())
}
