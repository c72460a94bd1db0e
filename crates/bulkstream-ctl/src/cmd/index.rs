//! Index lifecycle commands.

use anyhow::{bail, Context, Result};

use bulkstream_core::BulkstreamConfig;
use bulkstream_writer::IndexAdmin;

fn target(config: &BulkstreamConfig) -> Result<(IndexAdmin, &str)> {
    if config.target.index.is_empty() {
        bail!("missing index (--index or BULKSTREAM_TARGET__INDEX)");
    }
    let admin = IndexAdmin::new(reqwest::Client::new(), &config.target.url);
    Ok((admin, config.target.index.as_str()))
}

pub async fn cmd_count(config: &BulkstreamConfig) -> Result<()> {
    let (admin, index) = target(config)?;
    let count = admin
        .count(index)
        .await
        .with_context(|| format!("failed to count documents in {index}"))?;
    println!("{count}");
    Ok(())
}

pub async fn cmd_drop(config: &BulkstreamConfig) -> Result<()> {
    let (admin, index) = target(config)?;
    let dropped = admin
        .delete_if_exists(index)
        .await
        .with_context(|| format!("failed to drop index {index}"))?;
    if dropped {
        tracing::info!(index, "dropped index");
        println!("Dropped index {index}.");
    } else {
        println!("Index {index} does not exist.");
    }
    Ok(())
}
